//! Logging init: stderr for the operator, plus a log file under the XDG
//! state dir so long exports leave an audit trail. Falls back to
//! stderr-only when the state dir is unwritable.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Writes every log line to stderr and, when available, to the log file.
struct Tee {
    file: Option<fs::File>,
}

impl io::Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().lock().write_all(buf)?;
        if let Some(f) = &mut self.file {
            // Best effort; a full disk must not take the console down.
            let _ = f.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().lock().flush()?;
        if let Some(f) = &mut self.file {
            let _ = f.flush();
        }
        Ok(())
    }
}

struct TeeMakeWriter {
    file: Option<fs::File>,
}

impl<'a> MakeWriter<'a> for TeeMakeWriter {
    type Writer = Tee;

    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            file: self.file.as_ref().and_then(|f| f.try_clone().ok()),
        }
    }
}

fn log_file() -> Result<fs::File> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cux")?;
    let log_dir = xdg_dirs.get_state_home();
    fs::create_dir_all(&log_dir)?;
    let path: PathBuf = log_dir.join("cux.log");
    Ok(fs::OpenOptions::new().create(true).append(true).open(path)?)
}

/// Initialize logging with the given default level directive (e.g.
/// `"info"`, `"debug"`); `RUST_LOG` wins when set. The log file is
/// optional and its absence is not an error.
pub fn init_logging(level: &str) {
    let file = log_file().ok();
    let had_file = file.is_some();
    let writer: BoxMakeWriter = BoxMakeWriter::new(TeeMakeWriter { file });

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},cux_core=debug,cux_cli=debug", level)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    if !had_file {
        tracing::warn!("could not open log file under state dir; logging to stderr only");
    }
}
