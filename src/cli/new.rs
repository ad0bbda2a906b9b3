//! The `new` command: create a project from a skeleton release.
//!
//! Drives the whole acquisition pipeline for one project: version
//! resolution, preflight, download with progress, staged extraction, and
//! the post-install transforms. Cancellation via Ctrl-C is honored
//! cooperatively between download chunks and reported as a cancellation,
//! not an error (exit code 1).

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::cache;
use crate::catalog::VersionCatalog;
use crate::config::GlobalConfig;
use crate::constants::{
    CATALOG_CACHE_TTL, CATALOG_URL, INSTALLER_VERSION_CACHE_KEY, INSTALLER_VERSION_URL,
};
use crate::core::{ErrorContext, ScaffoldError};
use crate::fetcher::{self, ArchiveFetcher, CancelToken, Workflow};
use crate::pipeline::{AcquisitionOutcome, AcquisitionPipeline, PipelineSettings, PreflightMode};
use crate::postinstall::{self, RequirementReport};
use crate::resolver::{VersionRequest, VersionResolver};
use crate::utils::progress::DownloadProgress;

/// Create a new project from a skeleton release.
#[derive(Args)]
pub struct NewCommand {
    /// Directory where the new project will be created.
    directory: PathBuf,

    /// The version to install (defaults to the latest stable release).
    ///
    /// Accepts a full version (`3.4.1`) or a prefix (`3`, `3.4`); a prefix
    /// installs the newest release at or above it.
    #[arg(default_value = "latest")]
    version: String,
}

impl NewCommand {
    /// Execute the command.
    pub async fn execute(self, quiet: bool, no_progress: bool) -> Result<()> {
        let request: VersionRequest = self.version.parse().map_err(|e: ScaffoldError| {
            anyhow::Error::new(
                ErrorContext::new(e).with_suggestion("Use a version like 3, 3.4 or 3.4.1"),
            )
        })?;

        let project_dir = if self.directory.is_absolute() {
            self.directory.clone()
        } else {
            std::env::current_dir()?.join(&self.directory)
        };
        let project_name = project_dir
            .file_name()
            .map_or_else(|| "project".to_string(), |n| n.to_string_lossy().into_owned());
        let invoked_as = std::env::args().next().unwrap_or_else(|| "scaffold".to_string());

        let config = GlobalConfig::load()?;
        let client = fetcher::build_client(config.effective_proxy().as_deref())?;
        let store = cache::open_default(CATALOG_CACHE_TTL, config.cache_dir.as_deref());

        let resolver = VersionResolver::new(VersionCatalog::new(
            client.clone(),
            store,
            CATALOG_URL,
        ));
        let archive_fetcher = ArchiveFetcher::new(
            client.clone(),
            Workflow::NewProject {
                requested: self.version.clone(),
            },
        );

        let settings = PipelineSettings {
            target_dir: project_dir.clone(),
            preflight: PreflightMode::Strict,
            invoked_as: invoked_as.clone(),
        };
        let mut pipeline = AcquisitionPipeline::new(resolver, archive_fetcher, settings);

        // Ctrl-C flips the shared flag; the fetch loop polls it between
        // chunks, so no write is ever torn.
        let cancel = CancelToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });
        }

        if !quiet {
            if matches!(request, VersionRequest::Numeric { .. }) {
                println!("\n Checking available versions...");
            }
            println!("\n Downloading project skeleton...\n");
        }

        let progress = DownloadProgress::new(!no_progress && !quiet);
        let outcome = pipeline.install(&request, &progress, &cancel).await;
        progress.finish();

        let version = pipeline
            .resolved_release()
            .map_or_else(|| self.version.clone(), |r| r.version.clone());

        match outcome {
            AcquisitionOutcome::Success { target_dir } => {
                if !quiet {
                    println!(" Preparing project...\n");
                }

                postinstall::remove_distribution_files(&target_dir);
                postinstall::dump_readme(&target_dir, &project_name);
                postinstall::update_secret(&target_dir);
                postinstall::seed_gitignore(&client, &target_dir, &version).await;
                let report = postinstall::check_requirements(&target_dir);

                if !quiet {
                    display_result(&project_name, &version, &report, &invoked_as);
                    notify_installer_update(&client, config.cache_dir.as_deref()).await;
                }
                Ok(())
            }
            AcquisitionOutcome::Aborted => {
                eprintln!();
                eprintln!(
                    "{}",
                    "Aborting download and cleaning up temporary directories.".red()
                );
                std::process::exit(1);
            }
            AcquisitionOutcome::Failed { error } => Err(self.contextualize(error, &invoked_as)),
        }
    }

    /// Attach run-specific suggestions before the error reaches `main`.
    fn contextualize(&self, error: ScaffoldError, invoked_as: &str) -> anyhow::Error {
        match &error {
            ScaffoldError::VersionNotFound { .. } => anyhow::Error::new(
                ErrorContext::new(error.clone()).with_suggestion(format!(
                    "Execute the following command to install the latest stable release:\n{} new {}",
                    invoked_as,
                    self.directory.display()
                )),
            ),
            ScaffoldError::CorruptArchive { .. } | ScaffoldError::EmptyArchive { .. } => {
                anyhow::Error::new(ErrorContext::new(error.clone()).with_suggestion(format!(
                    "To solve this issue, try executing this command again:\n{} new {} {}",
                    invoked_as,
                    self.directory.display(),
                    self.version
                )))
            }
            _ => anyhow::Error::new(error),
        }
    }
}

/// Render the installation result with next-step pointers.
fn display_result(
    project_name: &str,
    version: &str,
    report: &RequirementReport,
    invoked_as: &str,
) {
    let check_mark = if cfg!(windows) { "OK" } else { "✔" };
    let cross_mark = if cfg!(windows) { "FAILED" } else { "✕" };

    if report.all_fulfilled() {
        println!(
            " {}  Scaffold {} was {}. Now you can:\n",
            check_mark.green(),
            version,
            "successfully installed".green()
        );
    } else {
        println!(
            " {}  Scaffold {} was {} but your system doesn't meet its\n     \
             technical requirements! Fix the following issues before running\n     \
             your application:\n",
            cross_mark.yellow(),
            version,
            "successfully installed".green()
        );

        for failure in report.failures() {
            println!(" * {}", failure.label);
            println!("   > {}\n", failure.help);
        }

        println!(
            " After fixing these issues, re-check the requirements by executing:\n\n   \
             {}\n",
            format!("{invoked_as} check {project_name}").yellow()
        );
    }

    println!(
        "    * Change your current directory to {}\n",
        project_name.yellow()
    );
    println!(
        "    * Configure your application in the {} file.\n",
        "config/settings.yml".yellow()
    );
    println!("    * Read the documentation at https://docs.scaffold.dev\n");
}

/// Print a hint when a newer installer has been published. Best-effort:
/// every failure path is a silent skip.
async fn notify_installer_update(client: &reqwest::Client, cache_dir: Option<&std::path::Path>) {
    let store = cache::open_default(CATALOG_CACHE_TTL, cache_dir);

    let latest = match store.get(INSTALLER_VERSION_CACHE_KEY) {
        Some(cached) => String::from_utf8_lossy(&cached).trim().to_string(),
        None => {
            let Ok(response) = client.get(INSTALLER_VERSION_URL).send().await else {
                return;
            };
            if !response.status().is_success() {
                return;
            }
            let Ok(body) = response.text().await else {
                return;
            };
            let _ = store.put(INSTALLER_VERSION_CACHE_KEY, body.as_bytes());
            body.trim().to_string()
        }
    };

    let (Ok(latest), Ok(current)) = (
        semver::Version::parse(&latest),
        semver::Version::parse(env!("CARGO_PKG_VERSION")),
    ) else {
        return;
    };

    if latest > current {
        println!(
            "\n {} Your installer version ({current}) is outdated.\n Download the latest version ({latest}) from https://get.scaffold.dev\n",
            " WARNING ".on_red()
        );
    }
}
