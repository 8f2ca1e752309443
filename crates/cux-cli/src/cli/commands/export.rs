//! `cux export` – run one export against a Cognito User Pool.

use std::time::{Duration, Instant};

use anyhow::Result;
use cux_core::checkpoint::{Checkpoint, CheckpointError};
use cux_core::config::CuxConfig;
use cux_core::directory::{aws_sdk_config, CognitoDirectory, ListMode};
use cux_core::export::{export_users, CancelFlag, EndReason, ExportOptions};
use cux_core::project;
use cux_core::retry::TracingObserver;
use cux_core::storage::{upload_export, S3Store};

use crate::cli::{ExportArgs, EXIT_INTERRUPTED};

pub async fn run_export(cfg: &CuxConfig, args: ExportArgs) -> Result<i32> {
    let mut policy = cfg.retry_policy();
    if let Some(n) = args.max_retries {
        policy.max_retries = n;
    }
    if let Some(secs) = args.base_delay {
        policy.base_delay = Duration::from_secs_f64(secs.max(0.0));
    }

    // An explicit --starting-token wins over --resume.
    let mut starting_token = args.starting_token.clone();
    let mut start_count = 0u64;
    if args.resume && starting_token.is_none() {
        match Checkpoint::load(&args.file_name) {
            Ok(cp) => {
                tracing::info!(
                    "resuming export from checkpoint: {} records exported at {}",
                    cp.total_exported,
                    cp.timestamp
                );
                starting_token = Some(cp.pagination_token);
                start_count = cp.total_exported;
            }
            Err(CheckpointError::NotFound { .. }) => {
                tracing::warn!("no checkpoint found; starting from the beginning");
            }
            Err(CheckpointError::Corrupt { .. }) => {
                tracing::warn!("checkpoint is unreadable; starting from the beginning");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mode = match args.group_name.clone() {
        Some(group_name) => ListMode::Group { group_name },
        None => ListMode::All {
            filter: args.filter_expression.clone(),
        },
    };
    let sdk = aws_sdk_config(&args.region, args.profile.as_deref()).await;
    let directory = CognitoDirectory::new(&sdk, &args.user_pool_id, mode);

    let observer = TracingObserver;
    let attributes = if args.export_all {
        project::discover_attributes(&directory, &policy, &observer, args.page_size).await
    } else {
        args.export_attributes.clone()
    };

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping after the current page");
                cancel.cancel();
            }
        });
    }

    let mut opts = ExportOptions::new(args.file_name.clone(), attributes);
    opts.page_size = args.page_size;
    opts.max_records = args.num_records;
    opts.starting_token = starting_token;
    opts.start_count = start_count;
    opts.checkpoint_pages = cfg.checkpoint_pages;
    opts.checkpoint_records = cfg.checkpoint_records;
    opts.cooldown = Duration::from_millis(cfg.cooldown_ms);

    let started = Instant::now();
    let outcome = export_users(&directory, &policy, &observer, &cancel, &opts).await?;
    let elapsed = started.elapsed();

    tracing::info!("export completed");
    tracing::info!("total records: {}", outcome.total_exported);
    tracing::info!("output file: {}", args.file_name.display());
    tracing::info!("duration: {:.2} seconds", elapsed.as_secs_f64());
    let this_run = outcome.total_exported - start_count;
    if this_run > 0 {
        tracing::info!(
            "average time per record: {:.4} seconds",
            elapsed.as_secs_f64() / this_run as f64
        );
    }

    if outcome.reason == EndReason::FetchFailed {
        tracing::error!("export ended early; rerun with --resume to continue");
        return Ok(1);
    }

    if let Some(bucket) = &args.s3_bucket {
        let store = S3Store::new(&sdk);
        if let Err(e) = upload_export(
            &store,
            &policy,
            &observer,
            &args.file_name,
            bucket,
            args.s3_key.as_deref(),
            args.compress,
        )
        .await
        {
            // The export itself is done; a failed upload is reported,
            // not escalated.
            tracing::error!("failed to upload to S3: {:#}", e);
        }
    }

    Ok(match outcome.reason {
        EndReason::Interrupted => EXIT_INTERRUPTED,
        _ => 0,
    })
}
