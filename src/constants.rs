//! Global constants used throughout the scaffold codebase.
//!
//! This module contains the remote endpoints, cache parameters and size
//! thresholds that are used across multiple modules. Defining them centrally
//! improves maintainability and makes magic numbers more discoverable.

use std::time::Duration;

/// Endpoint returning the remote release catalog as a three-level JSON
/// mapping (`{"3.x": {"3.4": {"3.4.1": "3.4.1", ...}, ...}, ...}`).
pub const CATALOG_URL: &str = "https://get.scaffold.dev/versions.json";

/// Download URL template for a concrete release. `{version}` is replaced
/// with the resolved `major.minor.patch` version.
pub const RELEASE_URL_TEMPLATE: &str = "https://get.scaffold.dev/dist/scaffold-{version}.tar.gz";

/// Fixed download URL for the newest stable release. Requests for the
/// `latest` sentinel resolve here directly, without a catalog lookup.
pub const LATEST_RELEASE_URL: &str = "https://get.scaffold.dev/dist/scaffold-latest.tar.gz";

/// Template for the version-matched `.gitignore` seed file.
pub const GITIGNORE_URL_TEMPLATE: &str = "https://get.scaffold.dev/templates/{version}/gitignore";

/// Endpoint returning the latest published installer version as plain text.
pub const INSTALLER_VERSION_URL: &str = "https://get.scaffold.dev/installer.version";

/// Cache key under which the raw catalog payload is stored.
pub const CATALOG_CACHE_KEY: &str = "versions.json";

/// Cache key under which the latest installer version is stored.
pub const INSTALLER_VERSION_CACHE_KEY: &str = "installer.version";

/// How long a cached catalog payload stays fresh (60 seconds).
///
/// An entry older than this is treated as absent, never returned.
pub const CATALOG_CACHE_TTL: Duration = Duration::from_secs(60);

/// Payloads whose reported size exceeds this threshold (1 MiB) are streamed
/// to disk chunk by chunk instead of being buffered in memory. The CLI
/// progress bar uses the same threshold to decide whether a download is
/// worth displaying at all.
pub const STREAM_THRESHOLD: u64 = 1024 * 1024;

/// Minimum interval between progress sink invocations during a download.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Timeout for establishing an HTTP connection.
///
/// The transport default would wait indefinitely on a stalled peer; an
/// explicit bound keeps a dead mirror from hanging the whole run.
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for reading from an established HTTP connection.
pub const HTTP_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// File whose presence marks a fully installed project. Preflight's
/// tolerant mode accepts an existing target directory only while this
/// marker is absent.
pub const PROJECT_MARKER: &str = "config/settings.yml";

/// Placeholder value shipped in the skeleton's settings file, replaced with
/// a generated secret after extraction.
pub const SECRET_PLACEHOLDER: &str = "ThisSecretIsNotSoSecretChangeIt";
