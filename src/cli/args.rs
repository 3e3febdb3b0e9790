//! CLI argument definitions using clap derive

use clap::{ArgAction, ArgGroup, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// depot - artifact repository storage core
///
/// Resolves group membership, promotes content between stores and reports
/// on tracked content sessions.
#[derive(Parser, Debug)]
#[command(name = "depot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DEPOT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Promote content using a request JSON file
    Promote(PromoteArgs),

    /// Resume a promotion from its result JSON file
    Resume(ResultArgs),

    /// Roll back a promotion from its result JSON file
    Rollback(ResultArgs),

    /// Add a store to a group, or remove it again
    Group(GroupArgs),

    /// Show the resolved members of a group
    Members(MembersArgs),

    /// Regenerate a merged listing in a group from its members
    Merge(MergeArgs),

    /// Record, report and clear content tracking
    Track(TrackArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the promote command
#[derive(Parser, Debug)]
pub struct PromoteArgs {
    /// PromoteRequest JSON file (`-` for stdin)
    pub request: PathBuf,

    /// Write the result JSON here as well as to stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for resume and rollback
#[derive(Parser, Debug)]
pub struct ResultArgs {
    /// PromoteResult JSON file (`-` for stdin)
    pub result: PathBuf,

    /// Write the new result JSON here as well as to stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the group command
#[derive(Parser, Debug)]
pub struct GroupArgs {
    #[command(subcommand)]
    pub action: GroupAction,
}

/// Group membership subcommands
#[derive(Subcommand, Debug)]
pub enum GroupAction {
    /// Append a store to a group's members
    Add {
        /// Store to add
        store: String,
        /// Target group
        group: String,
        /// Report without changing configuration
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove a store from a group's members
    Remove {
        /// Store to remove
        store: String,
        /// Target group
        group: String,
    },
}

/// Arguments for the members command
#[derive(Parser, Debug)]
pub struct MembersArgs {
    /// Group key (e.g. maven:group:public)
    pub group: String,

    /// Include disabled stores
    #[arg(short, long)]
    pub all: bool,

    /// Only members the filter chain allows for this path
    #[arg(long)]
    pub path: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the merge command
#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Group key
    pub group: String,

    /// Path of the listing to merge
    pub path: String,
}

/// Arguments for the track command
#[derive(Parser, Debug)]
pub struct TrackArgs {
    #[command(subcommand)]
    pub action: TrackAction,
}

/// Tracking subcommands
#[derive(Subcommand, Debug)]
pub enum TrackAction {
    /// Record an upload or download against a tracking id
    #[command(group(ArgGroup::new("effect").required(true).args(["upload", "download"])))]
    Record {
        /// Tracking id
        id: String,
        /// Store the content lives in
        store: String,
        /// Content path
        path: String,
        /// Record an upload
        #[arg(long)]
        upload: bool,
        /// Record a download
        #[arg(long)]
        download: bool,
    },

    /// Print the tracking report as JSON
    Report {
        /// Tracking id
        id: String,
        /// Base URL for content links (default: from config)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Delete a tracking record
    Clear {
        /// Tracking id
        id: String,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_promote() {
        let cli = Cli::parse_from(["depot", "promote", "req.json", "-o", "out.json"]);
        match cli.command {
            Commands::Promote(args) => {
                assert_eq!(args.request, PathBuf::from("req.json"));
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected Promote command"),
        }
    }

    #[test]
    fn cli_parses_members() {
        let cli = Cli::parse_from(["depot", "members", "maven:group:public", "--all", "--format", "json"]);
        match cli.command {
            Commands::Members(args) => {
                assert_eq!(args.group, "maven:group:public");
                assert!(args.all);
                assert!(matches!(args.format, OutputFormat::Json));
            }
            _ => panic!("expected Members command"),
        }
    }

    #[test]
    fn track_record_needs_effect() {
        assert!(Cli::try_parse_from(["depot", "track", "record", "id", "maven:hosted:a", "x.jar"]).is_err());
        assert!(Cli::try_parse_from([
            "depot", "track", "record", "id", "maven:hosted:a", "x.jar", "--upload", "--download"
        ])
        .is_err());

        let cli = Cli::parse_from(["depot", "track", "record", "id", "maven:hosted:a", "x.jar", "--download"]);
        match cli.command {
            Commands::Track(TrackArgs {
                action: TrackAction::Record { download, upload, .. },
            }) => {
                assert!(download);
                assert!(!upload);
            }
            _ => panic!("expected Track Record command"),
        }
    }

    #[test]
    fn cli_parses_verbose_count() {
        let cli = Cli::parse_from(["depot", "-vv", "config", "path"]);
        assert_eq!(cli.verbose, 2);
    }
}
