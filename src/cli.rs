//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use mediafetch::ContentSelection;

/// Discover and download media content from web pages.
///
/// Mediafetch asks a site plugin what content lives at a URL, fetches its
/// resources concurrently (continuing partial responses with range requests)
/// and merges them into one file per content item.
#[derive(Parser, Debug)]
#[command(name = "mediafetch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the content found at a URL
    Download(DownloadArgs),

    /// Print the content found at a URL as JSON without downloading it
    Inspect {
        /// Page or file URL
        url: String,
    },

    /// List the available plugins and the domains they handle
    Plugins,
}

/// Arguments of the `download` subcommand.
#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// Page or file URL
    pub url: String,

    /// Directory merged files are written to (must exist)
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Directory resources are staged in while downloading
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Download every variant instead of the best quality one
    #[arg(long, conflicts_with_all = ["quality", "mime_type"])]
    pub all: bool,

    /// Only download variants with this quality
    #[arg(long)]
    pub quality: Option<f64>,

    /// Only download variants with this mime type
    #[arg(long = "type", value_name = "MIME")]
    pub mime_type: Option<String>,

    /// Replace existing files in the output directory
    #[arg(long)]
    pub overwrite: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl DownloadArgs {
    /// Content selection requested by the flags.
    #[must_use]
    pub fn selection(&self) -> ContentSelection {
        if self.all {
            ContentSelection::All
        } else if self.quality.is_some() || self.mime_type.is_some() {
            ContentSelection::Matching {
                quality: self.quality,
                mime_type: self.mime_type.clone(),
            }
        } else {
            ContentSelection::Best
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn download_args(argv: &[&str]) -> DownloadArgs {
        let args = Args::try_parse_from(argv).unwrap();
        match args.command {
            Command::Download(download) => download,
            other => panic!("expected download command, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_download_defaults() {
        let download = download_args(&["mediafetch", "download", "https://example.com/a"]);
        assert_eq!(download.url, "https://example.com/a");
        assert!(download.output_dir.is_none());
        assert!(!download.overwrite);
        assert!(!download.no_progress);
        assert_eq!(download.selection(), ContentSelection::Best);
    }

    #[test]
    fn test_cli_download_all_options() {
        let download = download_args(&[
            "mediafetch",
            "download",
            "https://example.com/a",
            "-o",
            "/out",
            "--staging-dir",
            "/stage",
            "--quality",
            "2.5",
            "--type",
            "video/mp4",
            "--overwrite",
            "--no-progress",
        ]);
        assert_eq!(download.output_dir, Some(PathBuf::from("/out")));
        assert_eq!(download.staging_dir, Some(PathBuf::from("/stage")));
        assert!(download.overwrite);
        assert!(download.no_progress);
        assert_eq!(
            download.selection(),
            ContentSelection::Matching {
                quality: Some(2.5),
                mime_type: Some("video/mp4".to_string()),
            }
        );
    }

    #[test]
    fn test_cli_all_selects_everything() {
        let download = download_args(&["mediafetch", "download", "--all", "https://example.com/a"]);
        assert_eq!(download.selection(), ContentSelection::All);
    }

    #[test]
    fn test_cli_all_conflicts_with_filters() {
        let err = Args::try_parse_from([
            "mediafetch",
            "download",
            "--all",
            "--quality",
            "1",
            "https://example.com/a",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_global_verbosity_flags() {
        let args = Args::try_parse_from(["mediafetch", "plugins", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert!(matches!(args.command, Command::Plugins));

        let args = Args::try_parse_from(["mediafetch", "-q", "inspect", "https://example.com"]).unwrap();
        assert!(args.quiet);
        assert!(matches!(args.command, Command::Inspect { .. }));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let err = Args::try_parse_from(["mediafetch"]).unwrap_err();
        assert!(matches!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                | clap::error::ErrorKind::MissingSubcommand
        ));
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["mediafetch", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
