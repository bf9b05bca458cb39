//! Runs a batch of uploads concurrently.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use zww_transfer::FileHandle;
use zww_uploader::{
    ProgressCallback, ProgressEvent, TransferOutcome, UploadOptions, Uploader, UploaderConfig,
};

/// Uploads every file in `paths`. Returns `true` if none failed.
pub async fn run(config: UploaderConfig, paths: Vec<PathBuf>, dedup: bool) -> anyhow::Result<bool> {
    let cancel = CancellationToken::new();
    let uploader = Uploader::new(&config)?;

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("SIGINT received, cancelling uploads");
            signal_cancel.cancel();
        }
    });

    let mut all_ok = true;
    let mut uploads = JoinSet::new();

    for path in paths {
        let file = match FileHandle::from_path(&path).await {
            Ok(f) => f,
            Err(e) => {
                println!("{}", describe_unreadable(&path, &e));
                all_ok = false;
                continue;
            }
        };

        let uploader = uploader.clone();
        let options = UploadOptions::default()
            .dedup(dedup)
            .on_progress(progress_printer(file.name.clone()))
            .cancel_token(cancel.clone());

        uploads.spawn(async move {
            let outcome = uploader.upload_file(&file, options).await;
            (file.name, outcome)
        });
    }

    while let Some(joined) = uploads.join_next().await {
        match joined {
            Ok((name, outcome)) => {
                all_ok &= !outcome.is_failed();
                println!("{}", describe(&name, &outcome));
            }
            Err(e) => {
                tracing::error!(error = %e, "upload task panicked");
                all_ok = false;
            }
        }
    }

    Ok(all_ok)
}

/// Prints a progress line each time an upload crosses a 10% step.
fn progress_printer(name: String) -> ProgressCallback {
    let last_step = AtomicU8::new(0);
    Arc::new(move |event: ProgressEvent| {
        if let Some(step) = next_step(&last_step, event.percent_complete) {
            eprintln!("{name}: {step}%");
        }
    })
}

/// Advances `last_step` and returns the step to print, if a new one was
/// reached. A `0` event (retry) rewinds.
fn next_step(last_step: &AtomicU8, percent: u8) -> Option<u8> {
    let step = percent / 10 * 10;
    if percent == 0 {
        last_step.store(0, Ordering::Relaxed);
        return None;
    }
    let previous = last_step.load(Ordering::Relaxed);
    if step > previous {
        last_step.store(step, Ordering::Relaxed);
        Some(step)
    } else {
        None
    }
}

fn describe(name: &str, outcome: &TransferOutcome) -> String {
    match outcome {
        TransferOutcome::Success(url) => format!("uploaded  {name} -> {url}"),
        TransferOutcome::Skipped(url) => format!("skipped   {name} -> {url} (already stored)"),
        TransferOutcome::Failed(e) => format!("failed    {name}: {e}"),
    }
}

fn describe_unreadable(path: &std::path::Path, error: &zww_transfer::ReadError) -> String {
    format!("failed    {}: {error}", path.display())
}
