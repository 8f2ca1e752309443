mod dedupe;
mod export;

pub use dedupe::run_dedupe;
pub use export::run_export;
