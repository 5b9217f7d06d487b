//! `db view` handler.

use anyhow::{Context, Result};

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext, version_id: u64) -> Result<()> {
    let entry = match ctx.store().get_version(version_id).await {
        Ok(entry) => entry,
        Err(e) if e.is_not_found() => {
            return Err(CliError::Arguments(format!("no entry for version {version_id}")).into());
        }
        Err(e) => return Err(CliError::from(e).into()),
    };
    let json = serde_json::to_string_pretty(&entry).context("serializing entry")?;
    println!("{json}");
    Ok(())
}
