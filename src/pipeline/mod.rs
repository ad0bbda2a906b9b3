//! The acquisition pipeline: resolve, preflight, download, extract, clean up.
//!
//! The pipeline is an explicit state machine rather than a chain of mutating
//! calls - when something fails there is never any ambiguity about which
//! stage partially ran:
//!
//! ```text
//! VersionResolved -> PreflightChecked -> Downloaded -> Extracted -> Cleaned
//! ```
//!
//! Each state is a precondition gate for the next. The terminal success
//! state is [`PipelineState::Cleaned`] with the target directory populated;
//! the terminal failure outcomes are [`AcquisitionOutcome::Aborted`]
//! (user-initiated, non-fatal) and [`AcquisitionOutcome::Failed`].
//!
//! # Temporary artifacts
//!
//! Every stage's temporary files live under one ephemeral, randomly named
//! hidden directory created at pipeline start: the downloaded archive, and
//! the staging directory extraction writes into. The cleanup transition -
//! reached on **every** exit path - is a single recursive delete of that
//! root, which is what guarantees no orphaned temp data regardless of which
//! stage failed. Cleanup is idempotent: an already-removed root is fine.
//!
//! # Staging
//!
//! Extraction never touches the target directly. It unpacks into a staging
//! directory inside the temp root and the result is committed into the
//! target only after the extractor reports success, so a failed extraction
//! leaves the target absent or exactly as it was.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::catalog::CatalogSource;
use crate::constants::PROJECT_MARKER;
use crate::core::{ErrorKind, ScaffoldError};
use crate::extractor;
use crate::fetcher::{ArchiveSource, CancelToken, ProgressSink};
use crate::resolver::{ResolvedRelease, VersionRequest, VersionResolver};

/// Pipeline progress through the acquisition state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing has happened yet.
    Created,
    /// The request mapped onto one concrete release.
    VersionResolved,
    /// The target and its parent passed validation.
    PreflightChecked,
    /// The archive landed in the temp root.
    Downloaded,
    /// The extracted tree was committed into the target.
    Extracted,
    /// The temp root is gone; on the success path this is terminal.
    Cleaned,
}

/// How preflight treats an existing, non-empty target directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreflightMode {
    /// Any existing non-empty target fails.
    #[default]
    Strict,
    /// An existing non-empty target is tolerated while the completion
    /// marker is absent - another tool may have partially populated it.
    TolerateIncomplete,
}

/// Explicit pipeline configuration.
///
/// Everything the pipeline needs is a plain field here - target directory
/// and how the tool was invoked - never an ambient lookup.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory the project is installed into
    pub target_dir: PathBuf,
    /// Existing-target policy
    pub preflight: PreflightMode,
    /// How the binary was invoked, for reproducing commands in messages
    pub invoked_as: String,
}

/// Terminal result of an acquisition run.
#[derive(Debug)]
pub enum AcquisitionOutcome {
    /// The target directory is populated and the temp root is gone.
    Success {
        /// The populated target directory
        target_dir: PathBuf,
    },
    /// The user cancelled; cleanup ran. Not a failure.
    Aborted,
    /// A stage failed; cleanup ran and the typed error is preserved.
    Failed {
        /// The error that stopped the pipeline
        error: ScaffoldError,
    },
}

impl AcquisitionOutcome {
    /// The classification of a failed outcome, if this is one.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed { error } => Some(error.kind()),
            _ => None,
        }
    }
}

/// Transient per-run state: the temp root and the paths inside it.
///
/// Created at pipeline start, discarded (and its directory deleted) at
/// pipeline end regardless of outcome.
struct AcquisitionJob {
    temp_root: PathBuf,
    archive_path: PathBuf,
    staging_dir: PathBuf,
}

impl AcquisitionJob {
    /// Create the hidden temp root as a sibling of the target directory.
    fn create(target_dir: &Path, download_url: &str) -> Result<Self, ScaffoldError> {
        let parent = parent_of(target_dir);
        let temp_root = parent.join(format!(".scaffold-{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&temp_root)?;

        let extension = if download_url.ends_with(".zip") { "zip" } else { "tar.gz" };
        let archive_path = temp_root.join(format!("skeleton.{extension}"));
        let staging_dir = temp_root.join("staging");

        debug!(temp_root = %temp_root.display(), "created acquisition workspace");

        Ok(Self {
            temp_root,
            archive_path,
            staging_dir,
        })
    }

    /// Remove the whole temp root. Idempotent: a missing root is success.
    fn clean_up(&self) {
        match std::fs::remove_dir_all(&self.temp_root) {
            Ok(()) => debug!(temp_root = %self.temp_root.display(), "removed acquisition workspace"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                temp_root = %self.temp_root.display(),
                error = %e,
                "failed to remove acquisition workspace"
            ),
        }
    }
}

/// The parent a target is created inside; a bare name means the current
/// directory.
fn parent_of(target_dir: &Path) -> &Path {
    match target_dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn is_empty_dir(dir: &Path) -> Result<bool, ScaffoldError> {
    Ok(std::fs::read_dir(dir)?.next().is_none())
}

/// Whether we can create files inside `dir`, probed with a real write.
fn dir_is_writable(dir: &Path) -> bool {
    tempfile::tempfile_in(dir).is_ok()
}

/// Orchestrates resolver, fetcher and extractor into one run.
pub struct AcquisitionPipeline<C, F> {
    resolver: VersionResolver<C>,
    fetcher: F,
    settings: PipelineSettings,
    state: PipelineState,
    resolved: Option<ResolvedRelease>,
}

impl<C: CatalogSource, F: ArchiveSource> AcquisitionPipeline<C, F> {
    /// Assemble a pipeline from its collaborators and settings.
    pub const fn new(
        resolver: VersionResolver<C>,
        fetcher: F,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            settings,
            state: PipelineState::Created,
            resolved: None,
        }
    }

    /// Current position in the state machine.
    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    /// The release the last run resolved to, if resolution happened.
    #[must_use]
    pub const fn resolved_release(&self) -> Option<&ResolvedRelease> {
        self.resolved.as_ref()
    }

    /// Resolve a request to one concrete release.
    ///
    /// # Errors
    ///
    /// [`ScaffoldError::VersionNotFound`] and catalog errors propagate.
    pub async fn resolve(
        &mut self,
        request: &VersionRequest,
    ) -> Result<ResolvedRelease, ScaffoldError> {
        let release = self.resolver.resolve(request).await?;
        self.state = PipelineState::VersionResolved;
        self.resolved = Some(release.clone());
        Ok(release)
    }

    /// Run the full pipeline for a request: preflight, resolve, acquire.
    ///
    /// Preflight is evaluated once before resolution - a doomed target must
    /// not cost a catalog fetch, let alone a download - and again inside
    /// [`acquire`](Self::acquire) as the formal gate of the state machine.
    pub async fn install(
        &mut self,
        request: &VersionRequest,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> AcquisitionOutcome {
        if let Err(error) = self.preflight() {
            return AcquisitionOutcome::Failed { error };
        }

        let release = match self.resolve(request).await {
            Ok(release) => release,
            Err(ScaffoldError::Aborted) => return AcquisitionOutcome::Aborted,
            Err(error) => return AcquisitionOutcome::Failed { error },
        };

        self.acquire(&release, progress, cancel).await
    }

    /// Acquire an already-resolved release into the target directory.
    ///
    /// Runs preflight, download, extraction and cleanup; cleanup runs on
    /// every exit path. [`ScaffoldError::Aborted`] from any stage (or an
    /// externally raised `cancel`) becomes [`AcquisitionOutcome::Aborted`].
    pub async fn acquire(
        &mut self,
        release: &ResolvedRelease,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> AcquisitionOutcome {
        if self.state == PipelineState::Created {
            self.state = PipelineState::VersionResolved;
        }
        if self.resolved.is_none() {
            self.resolved = Some(release.clone());
        }

        if let Err(error) = self.preflight() {
            return AcquisitionOutcome::Failed { error };
        }
        self.state = PipelineState::PreflightChecked;

        let job = match AcquisitionJob::create(&self.settings.target_dir, &release.download_url) {
            Ok(job) => job,
            Err(error) => return AcquisitionOutcome::Failed { error },
        };

        let result = self.run_stages(release, &job, progress, cancel).await;

        // The single cleanup root: one recursive delete on every exit path.
        job.clean_up();

        match result {
            Ok(()) => {
                self.state = PipelineState::Cleaned;
                AcquisitionOutcome::Success {
                    target_dir: self.settings.target_dir.clone(),
                }
            }
            Err(ScaffoldError::Aborted) => AcquisitionOutcome::Aborted,
            Err(error) => AcquisitionOutcome::Failed { error },
        }
    }

    async fn run_stages(
        &mut self,
        release: &ResolvedRelease,
        job: &AcquisitionJob,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<(), ScaffoldError> {
        if cancel.is_cancelled() {
            return Err(ScaffoldError::Aborted);
        }

        self.fetcher
            .fetch(&release.download_url, &job.archive_path, progress, cancel)
            .await?;
        self.state = PipelineState::Downloaded;

        if cancel.is_cancelled() {
            return Err(ScaffoldError::Aborted);
        }

        let archive_path = job.archive_path.clone();
        let staging_dir = job.staging_dir.clone();
        let wrote_anything =
            tokio::task::spawn_blocking(move || extractor::extract(&archive_path, &staging_dir))
                .await
                .map_err(|e| ScaffoldError::ExtractionFailed { reason: e.to_string() })??;

        if !wrote_anything {
            // A false result with no thrown error is still a failure.
            return Err(ScaffoldError::ExtractionFailed {
                reason: "extraction produced no files".to_string(),
            });
        }

        self.commit_staging(&job.staging_dir)?;
        self.state = PipelineState::Extracted;

        Ok(())
    }

    /// Validate the target directory and its parent before any network
    /// activity.
    fn preflight(&self) -> Result<(), ScaffoldError> {
        let target = &self.settings.target_dir;

        if target.is_dir() && !is_empty_dir(target)? {
            let incomplete = !target.join(PROJECT_MARKER).is_file();
            let tolerated =
                self.settings.preflight == PreflightMode::TolerateIncomplete && incomplete;
            if !tolerated {
                return Err(ScaffoldError::PreflightFailed {
                    reason: format!(
                        "There is already a project in this directory ({})",
                        target.display()
                    ),
                });
            }
        }

        let parent = parent_of(target);
        if !parent.is_dir() || !dir_is_writable(parent) {
            return Err(ScaffoldError::PreflightFailed {
                reason: format!(
                    "Not enough permissions to write to the {} directory",
                    parent.display()
                ),
            });
        }

        Ok(())
    }

    /// Commit the staged tree into the target directory.
    ///
    /// A missing target is renamed into place atomically. A tolerated
    /// pre-existing target receives the staged entries one by one, new
    /// content replacing same-named old.
    fn commit_staging(&self, staging_dir: &Path) -> Result<(), ScaffoldError> {
        let target = &self.settings.target_dir;

        if !target.exists() {
            match std::fs::rename(staging_dir, target) {
                Ok(()) => return Ok(()),
                // Cross-device fallback: fall through to per-entry moves
                Err(_) => std::fs::create_dir_all(target)?,
            }
        }

        for entry in std::fs::read_dir(staging_dir)? {
            let entry = entry?;
            let destination = target.join(entry.file_name());
            if destination.exists() {
                if destination.is_dir() {
                    std::fs::remove_dir_all(&destination)?;
                } else {
                    std::fs::remove_file(&destination)?;
                }
            }
            std::fs::rename(entry.path(), &destination)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ReleaseIndex, parse_index};
    use crate::fetcher::NullProgress;
    use crate::resolver::release_url;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tar::Builder;

    struct CountingCatalog {
        calls: AtomicUsize,
        index: ReleaseIndex,
    }

    impl CountingCatalog {
        fn with_default_index() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                index: parse_index(
                    br#"{"3.x": {"3.4": {"3.4.0": "3.4.0", "3.4.1": "3.4.1"}}}"#,
                )
                .expect("fixture parses"),
            }
        }
    }

    impl CatalogSource for &CountingCatalog {
        async fn fetch(&self) -> Result<ReleaseIndex, ScaffoldError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.index.clone())
        }
    }

    /// Serves a fixed byte payload as the "downloaded" archive.
    struct StubFetcher {
        calls: AtomicUsize,
        payload: Vec<u8>,
        abort: bool,
    }

    impl StubFetcher {
        fn serving(payload: Vec<u8>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                payload,
                abort: false,
            }
        }

        fn aborting() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                payload: Vec::new(),
                abort: true,
            }
        }
    }

    impl ArchiveSource for &StubFetcher {
        async fn fetch(
            &self,
            _url: &str,
            dest: &Path,
            _progress: &dyn ProgressSink,
            _cancel: &CancelToken,
        ) -> Result<(), ScaffoldError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.abort {
                return Err(ScaffoldError::Aborted);
            }
            std::fs::write(dest, &self.payload)?;
            Ok(())
        }
    }

    fn skeleton_tar_gz() -> Vec<u8> {
        let mut payload = Vec::new();
        {
            let encoder = GzEncoder::new(&mut payload, Compression::default());
            let mut builder = Builder::new(encoder);
            for (name, content) in [
                ("skeleton-3.4.1/README.md", b"skeleton readme".as_slice()),
                (
                    "skeleton-3.4.1/config/settings.yml",
                    b"secret: ThisSecretIsNotSoSecretChangeIt\n".as_slice(),
                ),
            ] {
                let mut header = tar::Header::new_gnu();
                header.set_size(content.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append_data(&mut header, name, content).expect("append");
            }
            builder.finish().expect("finish");
        }
        payload
    }

    fn settings(target: &Path) -> PipelineSettings {
        PipelineSettings {
            target_dir: target.to_path_buf(),
            preflight: PreflightMode::Strict,
            invoked_as: "scaffold".to_string(),
        }
    }

    fn pipeline<'a>(
        catalog: &'a CountingCatalog,
        fetcher: &'a StubFetcher,
        target: &Path,
    ) -> AcquisitionPipeline<&'a CountingCatalog, &'a StubFetcher> {
        AcquisitionPipeline::new(VersionResolver::new(catalog), fetcher, settings(target))
    }

    fn no_hidden_leftovers(parent: &Path) {
        let leftovers: Vec<_> = std::fs::read_dir(parent)
            .expect("read parent")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".scaffold-"))
            .collect();
        assert!(leftovers.is_empty(), "temp roots left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn full_install_populates_the_target() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("blog");
        let catalog = CountingCatalog::with_default_index();
        let fetcher = StubFetcher::serving(skeleton_tar_gz());
        let mut pipeline = pipeline(&catalog, &fetcher, &target);

        let outcome = pipeline
            .install(
                &"3.4".parse().expect("request"),
                &NullProgress,
                &CancelToken::new(),
            )
            .await;

        assert!(matches!(outcome, AcquisitionOutcome::Success { .. }));
        assert_eq!(pipeline.state(), PipelineState::Cleaned);
        assert_eq!(
            pipeline.resolved_release().map(|r| r.version.as_str()),
            Some("3.4.1")
        );
        // Root directory of the archive was stripped
        assert!(target.join("README.md").is_file());
        assert!(target.join("config/settings.yml").is_file());
        no_hidden_leftovers(dir.path());
    }

    #[tokio::test]
    async fn preflight_failure_happens_before_any_network_call() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("blog");
        std::fs::create_dir_all(&target).expect("mkdir");
        std::fs::write(target.join("existing.txt"), b"occupied").expect("write");

        let catalog = CountingCatalog::with_default_index();
        let fetcher = StubFetcher::serving(skeleton_tar_gz());
        let mut pipeline = pipeline(&catalog, &fetcher, &target);

        let outcome = pipeline
            .install(
                &"3.4".parse().expect("request"),
                &NullProgress,
                &CancelToken::new(),
            )
            .await;

        assert_eq!(outcome.error_kind(), Some(ErrorKind::PreflightFailed));
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0, "catalog must not be fetched");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0, "nothing must be downloaded");
        // The pre-existing content is untouched
        assert!(target.join("existing.txt").is_file());
    }

    #[tokio::test]
    async fn zero_byte_download_fails_with_empty_archive_and_no_target() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("blog");
        let catalog = CountingCatalog::with_default_index();
        let fetcher = StubFetcher::serving(Vec::new());
        let mut pipeline = pipeline(&catalog, &fetcher, &target);

        let outcome = pipeline
            .install(
                &"3.4".parse().expect("request"),
                &NullProgress,
                &CancelToken::new(),
            )
            .await;

        assert_eq!(outcome.error_kind(), Some(ErrorKind::EmptyArchive));
        assert!(!target.exists(), "target must never be created");
        no_hidden_leftovers(dir.path());
    }

    #[tokio::test]
    async fn unknown_version_fails_with_version_not_found() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("blog");
        let catalog = CountingCatalog::with_default_index();
        let fetcher = StubFetcher::serving(skeleton_tar_gz());
        let mut pipeline = pipeline(&catalog, &fetcher, &target);

        let outcome = pipeline
            .install(
                &"9.0".parse().expect("request"),
                &NullProgress,
                &CancelToken::new(),
            )
            .await;

        assert_eq!(outcome.error_kind(), Some(ErrorKind::VersionNotFound));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn aborted_fetch_becomes_the_aborted_outcome_with_cleanup() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("blog");
        let catalog = CountingCatalog::with_default_index();
        let fetcher = StubFetcher::aborting();
        let mut pipeline = pipeline(&catalog, &fetcher, &target);

        let outcome = pipeline
            .install(
                &"3.4".parse().expect("request"),
                &NullProgress,
                &CancelToken::new(),
            )
            .await;

        assert!(matches!(outcome, AcquisitionOutcome::Aborted));
        assert!(!target.exists());
        no_hidden_leftovers(dir.path());
    }

    #[tokio::test]
    async fn external_cancellation_aborts_before_download() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("blog");
        let catalog = CountingCatalog::with_default_index();
        let fetcher = StubFetcher::serving(skeleton_tar_gz());
        let mut pipeline = pipeline(&catalog, &fetcher, &target);

        let cancel = CancelToken::new();
        cancel.cancel();

        let release = ResolvedRelease {
            major_minor: "3.4".to_string(),
            version: "3.4.1".to_string(),
            download_url: release_url("3.4.1"),
        };
        let outcome = pipeline.acquire(&release, &NullProgress, &cancel).await;

        assert!(matches!(outcome, AcquisitionOutcome::Aborted));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        no_hidden_leftovers(dir.path());
    }

    #[tokio::test]
    async fn latest_request_never_fetches_the_catalog() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("blog");
        let catalog = CountingCatalog::with_default_index();
        let fetcher = StubFetcher::serving(skeleton_tar_gz());
        let mut pipeline = pipeline(&catalog, &fetcher, &target);

        let outcome = pipeline
            .install(&VersionRequest::Latest, &NullProgress, &CancelToken::new())
            .await;

        assert!(matches!(outcome, AcquisitionOutcome::Success { .. }));
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tolerant_mode_installs_into_a_partially_populated_target() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("blog");
        std::fs::create_dir_all(&target).expect("mkdir");
        std::fs::write(target.join("notes.txt"), b"left by another tool").expect("write");

        let catalog = CountingCatalog::with_default_index();
        let fetcher = StubFetcher::serving(skeleton_tar_gz());
        let mut settings = settings(&target);
        settings.preflight = PreflightMode::TolerateIncomplete;
        let mut pipeline =
            AcquisitionPipeline::new(VersionResolver::new(&catalog), &fetcher, settings);

        let outcome = pipeline
            .install(
                &"3.4".parse().expect("request"),
                &NullProgress,
                &CancelToken::new(),
            )
            .await;

        assert!(matches!(outcome, AcquisitionOutcome::Success { .. }));
        assert!(target.join("notes.txt").is_file(), "existing content survives");
        assert!(target.join("README.md").is_file());
    }

    #[tokio::test]
    async fn tolerant_mode_still_rejects_a_completed_project() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("blog");
        std::fs::create_dir_all(target.join("config")).expect("mkdir");
        std::fs::write(target.join(PROJECT_MARKER), b"secret: x").expect("write");

        let catalog = CountingCatalog::with_default_index();
        let fetcher = StubFetcher::serving(skeleton_tar_gz());
        let mut settings = settings(&target);
        settings.preflight = PreflightMode::TolerateIncomplete;
        let mut pipeline =
            AcquisitionPipeline::new(VersionResolver::new(&catalog), &fetcher, settings);

        let outcome = pipeline
            .install(
                &"3.4".parse().expect("request"),
                &NullProgress,
                &CancelToken::new(),
            )
            .await;

        assert_eq!(outcome.error_kind(), Some(ErrorKind::PreflightFailed));
    }

    #[test]
    fn cleanup_is_idempotent() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("blog");
        let job = AcquisitionJob::create(&target, "https://example.invalid/skeleton.tar.gz")
            .expect("create job");
        assert!(job.temp_root.is_dir());

        job.clean_up();
        assert!(!job.temp_root.exists());

        // Second cleanup of an already-removed root must not error or panic
        job.clean_up();
    }

    #[test]
    fn job_uses_zip_extension_for_zip_urls() {
        let dir = tempfile::tempdir().expect("temp dir");
        let job = AcquisitionJob::create(
            &dir.path().join("blog"),
            "https://example.invalid/skeleton.zip",
        )
        .expect("create job");
        assert!(job.archive_path.to_string_lossy().ends_with("skeleton.zip"));
        job.clean_up();
    }
}
