//! Command-line interface for the scaffold installer.
//!
//! Each command lives in its own module with its own argument structure and
//! execution logic:
//! - `new` - resolve, download and extract a project skeleton, then apply
//!   the post-install transforms
//! - `check` - evaluate the requirement checklist against an existing
//!   project
//! - `about` - describe the installer
//!
//! # Global Options
//!
//! All commands support:
//! - `--verbose` - debug-level logging
//! - `--quiet` - errors only
//! - `--no-progress` - disable the download progress bar
//!
//! # Example
//!
//! ```bash
//! # Create a project from the latest stable release
//! scaffold new blog
//!
//! # Pin a version line; the newest matching release wins
//! scaffold new blog 3.4
//!
//! # Re-check an existing project
//! scaffold check blog
//! ```

mod about;
mod check;
mod new;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Top-level CLI parser.
#[derive(Parser)]
#[command(name = "scaffold", version, about = "Creates new projects from versioned skeleton releases")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output for debugging and detailed information.
    ///
    /// Equivalent to setting `RUST_LOG=debug`. Mutually exclusive with
    /// `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors, for automation.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable the download progress bar.
    ///
    /// Useful for CI pipelines and terminals without ANSI support.
    #[arg(long, global = true)]
    no_progress: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create a new project from a skeleton release.
    ///
    /// Resolves the requested version against the remote catalog, downloads
    /// the matching archive, extracts it into the target directory and
    /// applies the post-install transforms.
    New(new::NewCommand),

    /// Check an existing project against the requirement checklist.
    Check(check::CheckCommand),

    /// Show information about this installer.
    About(about::AboutCommand),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.verbose, self.quiet);

        match self.command {
            Commands::New(cmd) => cmd.execute(self.quiet, self.no_progress).await,
            Commands::Check(cmd) => cmd.execute(),
            Commands::About(cmd) => {
                cmd.execute();
                Ok(())
            }
        }
    }
}

/// Initialize tracing from the verbosity flags.
///
/// An explicit `RUST_LOG` always wins over the flags.
fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "off"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_parses_directory_and_optional_version() {
        let cli = Cli::try_parse_from(["scaffold", "new", "blog", "3.4"]).expect("parse");
        assert!(matches!(cli.command, Commands::New(_)));

        let cli = Cli::try_parse_from(["scaffold", "new", "blog"]).expect("parse");
        assert!(matches!(cli.command, Commands::New(_)));
    }

    #[test]
    fn new_requires_a_directory() {
        assert!(Cli::try_parse_from(["scaffold", "new"]).is_err());
    }

    #[test]
    fn verbose_and_quiet_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["scaffold", "--verbose", "--quiet", "about"]).is_err());
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli =
            Cli::try_parse_from(["scaffold", "new", "blog", "--no-progress"]).expect("parse");
        assert!(cli.no_progress);
    }
}
