//! Download command handler.

use anyhow::Result;
use civitdl_download::RunProgress;

use crate::bootstrap::CliContext;
use crate::commands::DownloadArgs;
use crate::error::CliError;
use crate::presentation::format_size;
use crate::utils::input;

/// Plan, confirm, then drain the jobs through the worker pool.
///
/// With `--meta-only` only the sidecar JSONs are written.
pub async fn execute(ctx: &CliContext, args: &DownloadArgs) -> Result<()> {
    let config = ctx.settings().download_config(args);
    let source = ctx.settings().candidate_source(args);
    let meta_only = config.meta_only;
    let pipeline = ctx.pipeline(config)?;

    if meta_only {
        let written = pipeline
            .write_metadata_only(source)
            .await
            .map_err(CliError::from)?;
        println!("Wrote {written} metadata file(s).");
        return Ok(());
    }

    let plan = pipeline.plan(source).await.map_err(CliError::from)?;
    if let Some(e) = &plan.aborted {
        eprintln!("Warning: catalog traversal stopped early ({e}); continuing with what was found.");
    }
    if plan.jobs.is_empty() {
        println!("Nothing to download.");
        return Ok(());
    }

    println!(
        "{} file(s) to download, {} total.",
        plan.jobs.len(),
        format_size(plan.total_bytes)
    );
    if !input::confirm_unless(args.yes, "Proceed with download?")? {
        println!("Download cancelled.");
        return Ok(());
    }

    let report = pipeline
        .run(plan.jobs, RunProgress::new(plan.total_bytes))
        .await;
    println!("{}", report.summary);

    if let Some(fatal) = report.fatal {
        return Err(CliError::Aborted(fatal.to_string()).into());
    }
    Ok(())
}
