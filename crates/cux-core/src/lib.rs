pub mod config;
pub mod logging;

pub mod checkpoint;
pub mod dedupe;
pub mod directory;
pub mod export;
pub mod project;
pub mod retry;
pub mod storage;
