//! CLI entry point - the composition root.
//!
//! Loads `.env`, parses flags, resolves settings, starts logging and
//! dispatches to a handler. Every error exits with status 1.

use clap::Parser;
use clap::error::ErrorKind;

use civitdl_cli::config::API_KEY_ENV;
use civitdl_cli::{
    Cli, CliError, Commands, DbCommand, FileConfig, Settings, bootstrap, handlers, logging,
};

async fn run(cli: Cli) -> anyhow::Result<()> {
    let file = FileConfig::discover(cli.config.as_deref())?;
    let settings = Settings::resolve(&cli, file, std::env::var(API_KEY_ENV).ok());
    logging::init(&settings.log_level, settings.log_format, settings.log_api)?;

    tracing::debug!(
        save_root = %settings.save_root.display(),
        database = %settings.database_path.display(),
        "settings resolved"
    );
    let ctx = bootstrap(settings).await?;

    match cli.command {
        Commands::Download(args) => handlers::download::execute(&ctx, &args).await,
        Commands::Db { command } => match command {
            DbCommand::Verify { check_hash, yes } => {
                handlers::verify::execute(&ctx, check_hash, yes).await
            }
            DbCommand::Redownload { version_id } => {
                handlers::redownload::execute(&ctx, version_id).await
            }
            DbCommand::List { status, model_id } => {
                handlers::list::execute(&ctx, status, model_id).await
            }
            DbCommand::View { version_id } => handlers::view::execute(&ctx, version_id).await,
            DbCommand::Delete(args) => handlers::delete::execute(&ctx, &args).await,
        },
        Commands::Delete(args) => handlers::delete::execute(&ctx, &args).await,
        Commands::Clean { dry_run } => handlers::clean::execute(&ctx, dry_run).await,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}
