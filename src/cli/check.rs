//! The `check` command: evaluate the requirement checklist.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::postinstall;

/// Check an existing project against the requirement checklist.
#[derive(Args)]
pub struct CheckCommand {
    /// Project directory to check (defaults to the current directory).
    #[arg(default_value = ".")]
    directory: PathBuf,
}

impl CheckCommand {
    /// Execute the command. Exits with code 1 when any requirement fails.
    pub fn execute(self) -> Result<()> {
        let report = postinstall::check_requirements(&self.directory);

        println!(
            "\n Requirement check for {}:\n",
            self.directory.display().to_string().yellow()
        );

        for requirement in &report.requirements {
            let mark = if requirement.fulfilled {
                "OK".green()
            } else {
                "FAIL".red()
            };
            println!(" [{mark}] {}", requirement.label);
            if !requirement.fulfilled {
                println!("        > {}", requirement.help);
            }
        }
        println!();

        if report.all_fulfilled() {
            println!(" {}", "Your project meets all requirements.".green());
            Ok(())
        } else {
            println!(" {}", "Your project does not meet the requirements above.".red());
            std::process::exit(1);
        }
    }
}
