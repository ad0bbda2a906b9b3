//! The `about` command: describe the installer.

use clap::Args;
use colored::Colorize;

/// Show information about this installer.
#[derive(Args)]
pub struct AboutCommand {}

impl AboutCommand {
    /// Execute the command.
    pub fn execute(self) {
        println!(
            "\n {}\n {}\n",
            format!("Scaffold Installer ({})", env!("CARGO_PKG_VERSION")).green().bold(),
            "==========================".green()
        );
        println!(
            " The installer creates new projects from versioned skeleton releases.\n\
             \n\
             It resolves a version request against the remote release catalog,\n\
             downloads and extracts the matching archive, and prepares the new\n\
             project (secret generation, .gitignore seeding, requirement checks).\n"
        );
        println!(" Create a project with: {}\n", "scaffold new <directory> [version]".yellow());
    }
}
