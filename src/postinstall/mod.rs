//! Post-install transforms applied to a freshly extracted project.
//!
//! Every transform here is idempotent and - with the exception of the
//! requirement report, which only *observes* - best-effort: a missing
//! template, an unwritable settings file or a failed delete degrades to a
//! logged skip. None of these may ever abort the pipeline; the project is
//! already installed by the time they run.
//!
//! The fixed sequence is:
//! 1. drop distribution files that make no sense in a fresh project
//!    (`LICENSE`, `UPGRADE*.md`, `CHANGELOG*.md`);
//! 2. dump a minimal `README.md`;
//! 3. replace the skeleton's placeholder secret with a generated one;
//! 4. seed `.gitignore` from the version-matched template when absent;
//! 5. evaluate the requirement checklist and collect failures.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::constants::{GITIGNORE_URL_TEMPLATE, PROJECT_MARKER, SECRET_PLACEHOLDER};

/// One entry of the requirement checklist.
///
/// Only the pass/fail contract matters to the pipeline; the CLI renders
/// unfulfilled requirements with their help text.
#[derive(Debug, Clone)]
pub struct Requirement {
    /// What was checked
    pub label: String,
    /// Whether the check passed
    pub fulfilled: bool,
    /// How to fix an unfulfilled requirement
    pub help: String,
}

/// Outcome of running the checklist against a project directory.
#[derive(Debug, Clone, Default)]
pub struct RequirementReport {
    /// Every evaluated requirement, in order
    pub requirements: Vec<Requirement>,
}

impl RequirementReport {
    /// The requirements that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter().filter(|r| !r.fulfilled)
    }

    /// Whether every requirement passed.
    #[must_use]
    pub fn all_fulfilled(&self) -> bool {
        self.requirements.iter().all(|r| r.fulfilled)
    }
}

/// Evaluate the requirement checklist for `project_dir`.
///
/// An absent project directory is itself a failure; beyond that the checks
/// are intentionally shallow - they gate nothing, they inform the user.
#[must_use]
pub fn check_requirements(project_dir: &Path) -> RequirementReport {
    let mut requirements = Vec::new();

    requirements.push(Requirement {
        label: "project directory exists".to_string(),
        fulfilled: project_dir.is_dir(),
        help: format!("Create or reinstall the project at {}", project_dir.display()),
    });

    requirements.push(Requirement {
        label: format!("settings file ({PROJECT_MARKER}) is present"),
        fulfilled: project_dir.join(PROJECT_MARKER).is_file(),
        help: "Reinstall the project; the skeleton ships this file".to_string(),
    });

    requirements.push(Requirement {
        label: "project directory is writable".to_string(),
        fulfilled: project_dir.is_dir() && tempfile::tempfile_in(project_dir).is_ok(),
        help: format!("Check the permissions of {}", project_dir.display()),
    });

    RequirementReport { requirements }
}

/// Generate a random secret for the project's `secret` option.
///
/// SHA-256 over two fresh v4 UUIDs, hex encoded.
#[must_use]
pub fn generate_random_secret() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    hex::encode(hasher.finalize())
}

/// Replace the placeholder secret in the project settings file.
///
/// Idempotent: once the placeholder is gone this is a no-op. An unreadable
/// or unwritable settings file is a warning, never an error.
pub fn update_secret(project_dir: &Path) {
    let settings_path = project_dir.join(PROJECT_MARKER);

    let contents = match std::fs::read_to_string(&settings_path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!(path = %settings_path.display(), error = %e, "skipping secret generation");
            return;
        }
    };

    if !contents.contains(SECRET_PLACEHOLDER) {
        return;
    }

    let updated = contents.replace(SECRET_PLACEHOLDER, &generate_random_secret());
    if let Err(e) = std::fs::write(&settings_path, updated) {
        warn!(
            path = %settings_path.display(),
            error = %e,
            "the secret configuration option could not be updated"
        );
    }
}

/// Write a minimal `README.md` for the new project.
///
/// Overwrites the skeleton's own README: the project belongs to the user
/// now. Failure to write is a skip.
pub fn dump_readme(project_dir: &Path, project_name: &str) {
    let created = chrono::Local::now().format("%B %e, %Y");
    let contents = format!(
        "{name}\n{underline}\n\nA project created on {created}.\n",
        name = project_name,
        underline = "=".repeat(project_name.len()),
    );

    if let Err(e) = std::fs::write(project_dir.join("README.md"), contents) {
        debug!(error = %e, "skipping README generation");
    }
}

/// Remove distribution files that don't belong in a fresh project.
///
/// Failures are swallowed entirely; this is housekeeping.
pub fn remove_distribution_files(project_dir: &Path) {
    let Ok(entries) = std::fs::read_dir(project_dir) else {
        return;
    };

    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let removable = name == "LICENSE"
            || (name.starts_with("UPGRADE") && name.ends_with(".md"))
            || (name.starts_with("CHANGELOG") && name.ends_with(".md"));

        if removable {
            let _ = std::fs::remove_file(entry.path());
        }
    }
}

/// Seed `.gitignore` from the version-matched remote template.
///
/// Only runs when the project has no `.gitignore` yet; any failure - the
/// template missing upstream, a network hiccup, an unwritable project -
/// degrades to a skip, because this is an enhancement, not something
/// mandatory for the project.
pub async fn seed_gitignore(client: &reqwest::Client, project_dir: &Path, version: &str) {
    let path = project_dir.join(".gitignore");
    if path.is_file() {
        return;
    }

    let url = GITIGNORE_URL_TEMPLATE.replace("{version}", version);
    let body = match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(url, error = %e, "skipping .gitignore seeding");
                return;
            }
        },
        Ok(response) => {
            debug!(url, status = %response.status(), "skipping .gitignore seeding");
            return;
        }
        Err(e) => {
            debug!(url, error = %e, "skipping .gitignore seeding");
            return;
        }
    };

    if let Err(e) = std::fs::write(&path, body) {
        debug!(path = %path.display(), error = %e, "skipping .gitignore seeding");
    }
}
