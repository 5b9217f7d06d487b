//! Main commands enum and primary subcommands.

use clap::{Args, Subcommand};

use civitdl_core::EntryStatus;

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download models matching a catalog query, model id or version id
    Download(DownloadArgs),

    /// Inspect and maintain the download database
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },

    /// Delete entries from the database, and their files
    Delete(DeleteArgs),

    /// Remove leftover temporary files from interrupted runs
    Clean {
        /// Only list the files that would be removed
        #[arg(long)]
        dry_run: bool,
    },
}

/// Flags for `download`.
///
/// List flags accept comma-separated values. Unset flags fall back to the
/// config file.
#[derive(Args, Debug, Default, Clone)]
pub struct DownloadArgs {
    /// Parallel download workers
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Catalog tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Free-text catalog search
    #[arg(short = 'q', long)]
    pub query: Option<String>,

    /// Model types, e.g. Checkpoint,LORA
    #[arg(long, value_delimiter = ',')]
    pub model_types: Vec<String>,

    /// Base models, e.g. "SD 1.5,SDXL 1.0"
    #[arg(long, value_delimiter = ',')]
    pub base_models: Vec<String>,

    /// Only models by this creator
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// Include NSFW models
    #[arg(long)]
    pub nsfw: bool,

    /// Maximum files to queue; 0 means unbounded
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,

    /// Maximum catalog pages; 0 means unbounded
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// "Highest Rated", "Most Downloaded" or "Newest"
    #[arg(long)]
    pub sort: Option<String>,

    /// AllTime, Year, Month, Week or Day
    #[arg(long)]
    pub period: Option<String>,

    /// Download one model instead of searching
    #[arg(long, conflicts_with = "model_version_id")]
    pub model_id: Option<u64>,

    /// Download one model version instead of searching
    #[arg(long)]
    pub model_version_id: Option<u64>,

    /// With --model-id, take every version instead of the latest
    #[arg(long, requires = "model_id")]
    pub all_versions: bool,

    /// Only primary files
    #[arg(long)]
    pub primary_only: bool,

    /// Only pruned checkpoints
    #[arg(long)]
    pub pruned: bool,

    /// Only fp16 checkpoints
    #[arg(long)]
    pub fp16: bool,

    /// Skip versions whose base model contains any of these
    #[arg(long, value_delimiter = ',')]
    pub ignore_base_models: Vec<String>,

    /// Skip files whose name contains any of these
    #[arg(long, value_delimiter = ',')]
    pub ignore_filename_strings: Vec<String>,

    /// Write version metadata JSON next to each file
    #[arg(long)]
    pub metadata: bool,

    /// Write model info JSON
    #[arg(long)]
    pub model_info: bool,

    /// Save the version's preview images
    #[arg(long)]
    pub version_images: bool,

    /// Save preview images of every version of the model
    #[arg(long)]
    pub model_images: bool,

    /// Only write metadata JSONs; no downloads, no database writes
    #[arg(long)]
    pub meta_only: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// `db` subcommands.
#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Check downloaded entries against the files on disk
    Verify {
        /// Also recompute and compare file hashes
        #[arg(long)]
        check_hash: bool,
        /// Apply status changes without asking
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Download one stored version again
    Redownload {
        /// Model version id
        version_id: u64,
    },

    /// List stored entries
    List {
        /// pending, downloaded or error
        #[arg(long)]
        status: Option<EntryStatus>,
        /// Only entries of this model
        #[arg(long)]
        model_id: Option<u64>,
    },

    /// Print one entry as JSON
    View {
        /// Model version id
        version_id: u64,
    },

    /// Same as the top-level `delete`
    Delete(DeleteArgs),
}

/// Selection and behavior for `delete`.
#[derive(Args, Debug, Default, Clone)]
pub struct DeleteArgs {
    /// Version to delete; repeatable
    #[arg(long = "version-id")]
    pub version_ids: Vec<u64>,

    /// Every version of this model
    #[arg(long)]
    pub model_id: Option<u64>,

    /// Every entry with this status
    #[arg(long)]
    pub status: Option<EntryStatus>,

    /// List matches without deleting
    #[arg(long)]
    pub dry_run: bool,

    /// Remove database entries but leave files on disk
    #[arg(long)]
    pub keep_files: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'f', long)]
    pub force: bool,
}

impl DeleteArgs {
    /// Whether any selector was given.
    pub fn has_selection(&self) -> bool {
        !self.version_ids.is_empty() || self.model_id.is_some() || self.status.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Cli;
    use clap::Parser;

    #[test]
    fn test_download_lists_split_on_commas() {
        let cli = Cli::parse_from([
            "civitdl",
            "download",
            "--model-types",
            "Checkpoint,LORA",
            "--ignore-filename-strings",
            "inpaint",
            "--limit",
            "5",
            "-y",
        ]);
        let Commands::Download(args) = cli.command else {
            panic!("expected download");
        };
        assert_eq!(args.model_types, vec!["Checkpoint", "LORA"]);
        assert_eq!(args.ignore_filename_strings, vec!["inpaint"]);
        assert_eq!(args.limit, Some(5));
        assert!(args.yes);
    }

    #[test]
    fn test_model_and_version_ids_conflict() {
        let result = Cli::try_parse_from([
            "civitdl",
            "download",
            "--model-id",
            "1",
            "--model-version-id",
            "2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_selection() {
        let cli = Cli::parse_from([
            "civitdl",
            "db",
            "delete",
            "--version-id",
            "100",
            "--version-id",
            "101",
            "--status",
            "error",
            "--keep-files",
        ]);
        let Commands::Db {
            command: DbCommand::Delete(args),
        } = cli.command
        else {
            panic!("expected db delete");
        };
        assert_eq!(args.version_ids, vec![100, 101]);
        assert_eq!(args.status, Some(EntryStatus::Error));
        assert!(args.keep_files);
        assert!(args.has_selection());
        assert!(!DeleteArgs::default().has_selection());
    }
}
