//! Export orchestrator: streams projected rows to the CSV sink,
//! checkpoints periodically, and always ends with a count rather than a
//! crash when the remote side gives up.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::checkpoint::Checkpoint;
use crate::directory::{Pager, UserDirectory, PAGE_COOLDOWN};
use crate::project;
use crate::retry::{RetryObserver, RetryPolicy};

/// Cooperative cancellation shared with a signal handler. Checked
/// between pages; in-flight remote calls are never aborted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One export run's parameters.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// CSV output path; truncated at start.
    pub output: PathBuf,
    /// Resolved column list (explicit or discovered).
    pub attributes: Vec<String>,
    /// Requested page size; clamped to the service maximum by the pager.
    pub page_size: i32,
    /// Stop after this many records exported in this run (0 = unlimited).
    pub max_records: u64,
    /// Resume pagination from this token.
    pub starting_token: Option<String>,
    /// Count carried over from a loaded checkpoint, so resumed runs keep
    /// a monotonically growing total instead of restarting at zero.
    pub start_count: u64,
    /// Checkpoint every N pages...
    pub checkpoint_pages: u32,
    /// ...or every M newly exported records, whichever comes first.
    pub checkpoint_records: u64,
    /// Flat delay between successful page fetches.
    pub cooldown: Duration,
}

impl ExportOptions {
    pub fn new(output: PathBuf, attributes: Vec<String>) -> Self {
        Self {
            output,
            attributes,
            page_size: crate::directory::PAGE_SIZE_MAX,
            max_records: 0,
            starting_token: None,
            start_count: 0,
            checkpoint_pages: 10,
            checkpoint_records: 500,
            cooldown: PAGE_COOLDOWN,
        }
    }
}

/// Why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Listing exhausted normally.
    Complete,
    /// `max_records` cap reached.
    MaxRecords,
    /// Page fetch failed past the retry budget (or fatally); a
    /// checkpoint was saved if a token was available.
    FetchFailed,
    /// Cancelled by the user; checkpointed like a fetch failure.
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    /// Cumulative count, including any checkpointed prior count.
    pub total_exported: u64,
    /// Pages fetched in this run.
    pub pages: u32,
    pub reason: EndReason,
}

/// Run the export. Only output-file I/O errors surface as `Err`; remote
/// failures and cancellation end the run gracefully with a partial count.
pub async fn export_users<D: UserDirectory>(
    directory: &D,
    policy: &RetryPolicy,
    observer: &dyn RetryObserver,
    cancel: &CancelFlag,
    opts: &ExportOptions,
) -> Result<ExportOutcome> {
    tracing::info!(
        columns = opts.attributes.len(),
        "exporting attributes: {}{}",
        opts.attributes.iter().take(5).cloned().collect::<Vec<_>>().join(", "),
        if opts.attributes.len() > 5 { ", ..." } else { "" }
    );

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_path(&opts.output)
        .with_context(|| format!("create output file {}", opts.output.display()))?;
    writer
        .write_record(&opts.attributes)
        .context("write CSV header")?;

    let mut pager = Pager::new(directory, *policy, opts.page_size, opts.starting_token.clone())
        .with_cooldown(opts.cooldown);
    let mut exported = 0u64;
    let mut pages = 0u32;
    let mut last_checkpoint = opts.start_count;

    let outcome = loop {
        if cancel.is_cancelled() {
            tracing::info!("operation interrupted by user");
            save_checkpoint_if_token(&pager, opts, opts.start_count + exported);
            break end(opts.start_count + exported, pages, EndReason::Interrupted);
        }

        let page = match pager.next_page(observer).await {
            Ok(Some(page)) => page,
            Ok(None) => {
                tracing::info!("end of user pool listing reached");
                break end(opts.start_count + exported, pages, EndReason::Complete);
            }
            Err(e) => {
                tracing::error!("error fetching users: {}", e);
                save_checkpoint_if_token(&pager, opts, opts.start_count + exported);
                break end(opts.start_count + exported, pages, EndReason::FetchFailed);
            }
        };

        if page.records.is_empty() {
            tracing::warn!("no users returned in this page; this may indicate an issue");
        }

        let mut capped = false;
        for record in &page.records {
            let row = project::project(record, &opts.attributes);
            writer.write_record(&row).context("write CSV row")?;
            exported += 1;
            if opts.max_records > 0 && exported >= opts.max_records {
                tracing::info!("maximum records limit ({}) reached", opts.max_records);
                capped = true;
                break;
            }
        }
        if capped {
            break end(opts.start_count + exported, pages + 1, EndReason::MaxRecords);
        }

        pages += 1;
        tracing::info!(
            "processed page {} | total exported records: {}",
            pages,
            opts.start_count + exported
        );

        let total = opts.start_count + exported;
        if total - last_checkpoint >= opts.checkpoint_records
            || (opts.checkpoint_pages > 0 && pages % opts.checkpoint_pages == 0)
        {
            if save_checkpoint_if_token(&pager, opts, total) {
                last_checkpoint = total;
            }
        }
    };

    writer.flush().context("flush CSV output")?;

    if outcome.reason == EndReason::Complete {
        // A stale token would otherwise resume a finished export.
        if let Err(e) = Checkpoint::remove(&opts.output) {
            tracing::warn!("could not remove checkpoint: {}", e);
        }
    }

    Ok(outcome)
}

fn end(total_exported: u64, pages: u32, reason: EndReason) -> ExportOutcome {
    ExportOutcome {
        total_exported,
        pages,
        reason,
    }
}

/// Save a checkpoint when a continuation token exists. Checkpoint write
/// failures degrade to a warning; losing a resume point must not kill an
/// otherwise healthy export.
fn save_checkpoint_if_token<D: UserDirectory>(
    pager: &Pager<'_, D>,
    opts: &ExportOptions,
    total: u64,
) -> bool {
    let Some(token) = pager.token() else {
        return false;
    };
    match Checkpoint::new(token, total).save(&opts.output) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("could not save checkpoint: {}", e);
            false
        }
    }
}
