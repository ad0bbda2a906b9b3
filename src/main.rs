//! Scaffold CLI entry point.
//!
//! Handles command-line argument parsing, error display and exit codes:
//! - success -> 0
//! - user-aborted download -> 1 (rendered as a cancellation by the command)
//! - any other failure -> 1, with a user-friendly error on stderr

use anyhow::Result;
use clap::Parser;
use scaffold_cli::cli::Cli;
use scaffold_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
