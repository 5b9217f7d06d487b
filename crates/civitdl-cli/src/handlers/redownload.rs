//! `db redownload` handler.

use anyhow::Result;
use civitdl_core::DownloadConfig;
use civitdl_download::RunProgress;

use crate::bootstrap::CliContext;
use crate::commands::DownloadArgs;
use crate::error::CliError;

/// Fetch one stored version again. Fails when the download fails.
pub async fn execute(ctx: &CliContext, version_id: u64) -> Result<()> {
    let config = DownloadConfig {
        concurrency: 1,
        user_limit: 0,
        ..ctx.settings().download_config(&DownloadArgs::default())
    };

    let size = ctx
        .store()
        .get_version(version_id)
        .await
        .map(|entry| entry.file.size_bytes())
        .unwrap_or(0);

    let pipeline = ctx.pipeline(config)?;
    let report = pipeline
        .redownload(version_id, RunProgress::new(size))
        .await
        .map_err(CliError::from)?;
    println!("{}", report.summary);

    if let Some(fatal) = report.fatal {
        return Err(CliError::Aborted(fatal.to_string()).into());
    }
    if report.summary.all_failed() {
        return Err(CliError::AllFailed(report.summary.failed).into());
    }
    Ok(())
}
