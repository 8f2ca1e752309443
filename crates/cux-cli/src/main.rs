mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Parse CLI and dispatch; commands report their own exit code so an
    // interrupted export can exit 130 after a clean checkpoint.
    let code = match CliCommand::run_from_args().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("cux error: {:#}", err);
            1
        }
    };
    std::process::exit(code);
}
