//! `cux dedupe` – remove duplicate rows from an exported CSV.

use anyhow::Result;
use cux_core::dedupe::{dedupe, DedupeOptions};

use crate::cli::DedupeArgs;

pub fn run_dedupe(args: DedupeArgs) -> Result<i32> {
    let mut opts = DedupeOptions::new(args.input);
    opts.output = args.output_file;
    opts.keys = args.keys;
    opts.keep_first = !args.keep_last;
    opts.dry_run = args.dry_run;

    // The pass logs its own summary; nothing further to report here.
    dedupe(&opts)?;
    Ok(0)
}
