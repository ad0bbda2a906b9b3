//! Archive download with progress reporting and cooperative cancellation.
//!
//! [`ArchiveFetcher`] streams a remote archive to a local path. The HTTP
//! client is built with redirects disabled so the single-hop rule is
//! explicit in code: one 301/302 is followed, a second one fails the
//! download. Bodies whose reported size exceeds the 1 MiB threshold (or
//! whose size is unknown) are streamed straight to disk; smaller bodies are
//! buffered and written in one shot.
//!
//! Cancellation is cooperative: the [`CancelToken`] is polled between
//! chunks, never mid-write, so the file on disk is either absent or a
//! prefix of the payload - and on abort even that prefix is removed.
//!
//! Progress flows one way through a [`ProgressSink`]; the fetcher owns no
//! display state and throttles invocations to a fixed cadence.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::header::LOCATION;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::constants::{HTTP_CONNECT_TIMEOUT, HTTP_READ_TIMEOUT, PROGRESS_INTERVAL, STREAM_THRESHOLD};
use crate::core::ScaffoldError;

/// Shared cancellation flag, set by the signal handler and polled by the
/// fetch loop at chunk boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One-way sink for download progress.
///
/// The fetcher pushes `(bytes_total, bytes_so_far)` pairs into it; the
/// renderer owns all display state. `bytes_total` of zero means the remote
/// size is unknown and the fetcher suppresses reporting entirely.
pub trait ProgressSink: Send + Sync {
    /// Report cumulative progress.
    fn report(&self, bytes_total: u64, bytes_so_far: u64);
}

/// A [`ProgressSink`] that discards everything.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _bytes_total: u64, _bytes_so_far: u64) {}
}

/// Which user workflow a fetch belongs to.
///
/// A 403/404 means different things in different workflows: on a
/// new-project install it almost always means "that version does not
/// exist", which deserves a [`ScaffoldError::VersionNotFound`] and the
/// install-latest suggestion instead of a generic download error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workflow {
    /// Installing a new project for an explicitly requested version.
    NewProject {
        /// The version request as the user typed it
        requested: String,
    },
    /// Any other transfer (templates, metadata).
    Auxiliary,
}

/// Anything that can materialize a remote archive at a local path.
///
/// The pipeline is generic over this seam so tests can serve fixture
/// archives and count fetch calls without a network.
pub trait ArchiveSource: Send + Sync {
    /// Fetch `url` into `dest`, reporting progress and honoring `cancel`.
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> impl Future<Output = Result<(), ScaffoldError>> + Send;
}

/// Build the HTTP client shared by every remote call.
///
/// Redirects are disabled (the single-hop rule lives in [`ArchiveFetcher`]),
/// the proxy comes from explicit configuration rather than ambient
/// environment lookups, and connect/read timeouts bound a stalled peer.
pub fn build_client(proxy: Option<&str>) -> Result<reqwest::Client, ScaffoldError> {
    let mut builder = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .read_timeout(HTTP_READ_TIMEOUT);

    if let Some(proxy) = proxy {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| ScaffoldError::ConfigError {
            message: format!("invalid proxy '{proxy}': {e}"),
        })?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| ScaffoldError::Other {
        message: format!("failed to build HTTP client: {e}"),
    })
}

/// Streams remote archives to disk.
pub struct ArchiveFetcher {
    client: reqwest::Client,
    workflow: Workflow,
}

impl ArchiveFetcher {
    /// Create a fetcher for the given workflow.
    pub const fn new(client: reqwest::Client, workflow: Workflow) -> Self {
        Self { client, workflow }
    }

    fn download_error(url: &str, reason: impl Into<String>) -> ScaffoldError {
        ScaffoldError::Download {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Issue a GET, following at most one 301/302 hop.
    async fn get_following_one_redirect(
        &self,
        url: &str,
    ) -> Result<reqwest::Response, ScaffoldError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::download_error(url, e.to_string()))?;

        if !matches!(response.status(), StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND) {
            return Ok(response);
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .ok_or_else(|| Self::download_error(url, "redirect without a Location header"))?;

        debug!(from = url, to = %location, "following redirect");

        let response = self
            .client
            .get(&location)
            .send()
            .await
            .map_err(|e| Self::download_error(&location, e.to_string()))?;

        if matches!(response.status(), StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND) {
            return Err(Self::download_error(url, "too many redirects"));
        }

        Ok(response)
    }

    fn map_status(&self, url: &str, status: StatusCode) -> Option<ScaffoldError> {
        if status.is_success() {
            return None;
        }
        if matches!(status, StatusCode::FORBIDDEN | StatusCode::NOT_FOUND) {
            if let Workflow::NewProject { requested } = &self.workflow {
                // The archive for that exact version is simply not published.
                return Some(ScaffoldError::VersionNotFound {
                    request: requested.clone(),
                });
            }
        }
        Some(Self::download_error(url, format!("HTTP {status}")))
    }

    async fn stream_to_disk(
        url: &str,
        response: reqwest::Response,
        dest: &Path,
        total: u64,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<(), ScaffoldError> {
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut so_far: u64 = 0;
        let mut last_report = Instant::now();

        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                drop(file);
                let _ = tokio::fs::remove_file(dest).await;
                return Err(ScaffoldError::Aborted);
            }

            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(dest).await;
                    return Err(Self::download_error(url, e.to_string()));
                }
            };

            file.write_all(&chunk).await?;
            so_far += chunk.len() as u64;

            if total > 0 && last_report.elapsed() >= PROGRESS_INTERVAL {
                progress.report(total, so_far);
                last_report = Instant::now();
            }
        }

        file.flush().await?;
        if total > 0 {
            progress.report(total, so_far);
        }

        Ok(())
    }

    async fn buffer_to_disk(
        url: &str,
        response: reqwest::Response,
        dest: &Path,
        cancel: &CancelToken,
    ) -> Result<(), ScaffoldError> {
        let mut stream = response.bytes_stream();
        let mut payload = Vec::new();

        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                return Err(ScaffoldError::Aborted);
            }
            let chunk = chunk.map_err(|e| Self::download_error(url, e.to_string()))?;
            payload.extend_from_slice(&chunk);
        }

        tokio::fs::write(dest, payload).await?;
        Ok(())
    }
}

impl ArchiveSource for ArchiveFetcher {
    /// Download `url` into `dest`.
    ///
    /// # Errors
    ///
    /// - [`ScaffoldError::Aborted`] when `cancel` was raised; no partial
    ///   file remains on disk.
    /// - [`ScaffoldError::VersionNotFound`] for a 403/404 on the
    ///   new-project workflow.
    /// - [`ScaffoldError::Download`] for every other transport failure.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<(), ScaffoldError> {
        if cancel.is_cancelled() {
            return Err(ScaffoldError::Aborted);
        }

        debug!(url, dest = %dest.display(), "fetching archive");

        let response = self.get_following_one_redirect(url).await?;
        if let Some(err) = self.map_status(url, response.status()) {
            return Err(err);
        }

        let total = response.content_length().unwrap_or(0);

        if cancel.is_cancelled() {
            return Err(ScaffoldError::Aborted);
        }

        if total > 0 && total <= STREAM_THRESHOLD {
            // Small payloads are buffered whole; no partial file can exist.
            Self::buffer_to_disk(url, response, dest, cancel).await
        } else {
            Self::stream_to_disk(url, response, dest, total, progress, cancel).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_before_first_chunk_leaves_no_partial_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let dest = dir.path().join("skeleton.tar.gz");

        let fetcher = ArchiveFetcher::new(
            build_client(None).expect("client"),
            Workflow::Auxiliary,
        );
        let token = CancelToken::new();
        token.cancel();

        let err = fetcher
            .fetch("http://127.0.0.1:1/archive.tar.gz", &dest, &NullProgress, &token)
            .await
            .expect_err("should abort");

        assert!(matches!(err, ScaffoldError::Aborted));
        assert!(!dest.exists(), "no partial file may remain");
    }

    #[tokio::test]
    async fn connection_failure_is_a_download_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let dest = dir.path().join("skeleton.tar.gz");

        let fetcher = ArchiveFetcher::new(
            build_client(None).expect("client"),
            Workflow::Auxiliary,
        );

        let err = fetcher
            .fetch(
                "http://127.0.0.1:1/archive.tar.gz",
                &dest,
                &NullProgress,
                &CancelToken::new(),
            )
            .await
            .expect_err("nothing listens on that port");

        assert!(matches!(err, ScaffoldError::Download { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn not_found_maps_to_version_not_found_on_the_new_workflow() {
        let fetcher = ArchiveFetcher::new(
            build_client(None).expect("client"),
            Workflow::NewProject {
                requested: "3.9".to_string(),
            },
        );

        let err = fetcher
            .map_status("https://example.invalid/a.tar.gz", StatusCode::NOT_FOUND)
            .expect("error");
        assert!(matches!(
            err,
            ScaffoldError::VersionNotFound { request } if request == "3.9"
        ));
    }

    #[test]
    fn not_found_stays_a_download_error_elsewhere() {
        let fetcher = ArchiveFetcher::new(
            build_client(None).expect("client"),
            Workflow::Auxiliary,
        );

        let err = fetcher
            .map_status("https://example.invalid/a.tar.gz", StatusCode::NOT_FOUND)
            .expect("error");
        assert!(matches!(err, ScaffoldError::Download { .. }));
    }

    #[test]
    fn success_statuses_map_to_no_error() {
        let fetcher = ArchiveFetcher::new(
            build_client(None).expect("client"),
            Workflow::Auxiliary,
        );
        assert!(fetcher.map_status("https://example.invalid", StatusCode::OK).is_none());
    }

    #[test]
    fn invalid_proxy_is_a_config_error() {
        let err = build_client(Some("::not a proxy::")).expect_err("should fail");
        assert!(matches!(err, ScaffoldError::ConfigError { .. }));
    }
}
