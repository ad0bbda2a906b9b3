//! Version resolution: mapping a loose request onto one concrete release.
//!
//! A request like `"3"`, `"3.4"` or `"3.4.1"` names a *floor*, not an exact
//! release. Resolution walks the catalog snapshot and picks the newest
//! release that still satisfies that floor - it never downgrades below what
//! was asked, and it never invents a version absent from the snapshot.
//!
//! The `"latest"` sentinel is a separate path entirely: it maps onto the
//! fixed latest-release URL and must not touch the catalog.
//!
//! # Algorithm
//!
//! For a numeric request `major[.minor[.patch]]`:
//!
//! 1. Look up `"<major>.x"` at the top level; absence fails.
//! 2. Collect minor lines `>=` the requested `major.minor` floor (all lines
//!    when only a major was given) and keep the maximum.
//! 3. With an explicit patch, the literal request string is the resolved
//!    version - it is trusted as-is, with no patch-level lookup. Otherwise
//!    collect the chosen line's version values `>=` the bare request and
//!    keep the maximum.
//! 4. Substitute the resolved version into the download URL template.

pub mod ordering;

use std::str::FromStr;

use tracing::debug;

use crate::catalog::{CatalogSource, ReleaseIndex};
use crate::constants::{LATEST_RELEASE_URL, RELEASE_URL_TEMPLATE};
use crate::core::ScaffoldError;

/// A parsed user version request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    /// The `"latest"` sentinel: newest available release overall.
    Latest,
    /// A numeric `major[.minor[.patch]]` prefix.
    Numeric {
        /// The request exactly as the user typed it
        raw: String,
        /// Major component (always present)
        major: String,
        /// Minor component, when given
        minor: Option<String>,
        /// Patch component, when given
        patch: Option<String>,
    },
}

impl VersionRequest {
    /// The request as the user typed it, for error messages.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Latest => "latest",
            Self::Numeric { raw, .. } => raw,
        }
    }
}

impl FromStr for VersionRequest {
    type Err = ScaffoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ScaffoldError::VersionNotFound {
                request: String::new(),
            });
        }
        if s == "latest" {
            return Ok(Self::Latest);
        }

        let mut parts = s.splitn(3, '.');
        let major = parts.next().unwrap_or_default().to_string();
        let minor = parts.next().map(ToString::to_string);
        let patch = parts.next().map(ToString::to_string);

        Ok(Self::Numeric {
            raw: s.to_string(),
            major,
            minor,
            patch,
        })
    }
}

/// The single concrete release a request resolved to.
///
/// Every `ResolvedRelease` corresponds to an entry of the snapshot that
/// produced it (or, for an explicit patch request, to the literal request),
/// with the download URL template already filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelease {
    /// The chosen minor line (e.g. `"3.6"`); `"latest"` for the sentinel
    pub major_minor: String,
    /// The concrete `major.minor.patch` version
    pub version: String,
    /// Fully substituted download URL
    pub download_url: String,
}

impl ResolvedRelease {
    /// The fixed resolution of the `"latest"` sentinel.
    #[must_use]
    pub fn latest() -> Self {
        Self {
            major_minor: "latest".to_string(),
            version: "latest".to_string(),
            download_url: LATEST_RELEASE_URL.to_string(),
        }
    }
}

/// Build the download URL for a concrete version.
#[must_use]
pub fn release_url(version: &str) -> String {
    RELEASE_URL_TEMPLATE.replace("{version}", version)
}

/// Select the best matching release from a catalog snapshot.
///
/// Pure function over the snapshot: deterministic, and the backbone of the
/// resolver's unit tests. `"latest"` requests never reach this point.
pub fn select(
    request: &VersionRequest,
    index: &ReleaseIndex,
) -> Result<ResolvedRelease, ScaffoldError> {
    let VersionRequest::Numeric {
        raw,
        major,
        minor,
        patch,
    } = request
    else {
        return Ok(ResolvedRelease::latest());
    };

    let not_found = || ScaffoldError::VersionNotFound { request: raw.clone() };

    let major_key = format!("{major}.x");
    let minor_lines = index.major_line(&major_key).ok_or_else(not_found)?;

    let floor = minor.as_ref().map(|m| format!("{major}.{m}"));
    let chosen_line = minor_lines
        .keys()
        .filter(|line| floor.as_deref().is_none_or(|f| ordering::satisfies_floor(line, f)))
        .max_by(|a, b| ordering::compare_labels(a, b))
        .ok_or_else(not_found)?;

    let version = if patch.is_some() {
        // An explicit patch is trusted as-is; whether the archive exists is
        // the download's problem, which reports it as VersionNotFound.
        raw.clone()
    } else {
        minor_lines[chosen_line]
            .values()
            .filter(|v| ordering::satisfies_floor(v, raw))
            .max_by(|a, b| ordering::compare_labels(a, b))
            .ok_or_else(not_found)?
            .clone()
    };

    debug!(request = %raw, line = %chosen_line, version = %version, "resolved release");

    Ok(ResolvedRelease {
        major_minor: chosen_line.clone(),
        version: version.clone(),
        download_url: release_url(&version),
    })
}

/// Resolves version requests against a [`CatalogSource`].
///
/// The catalog is consulted lazily: only numeric requests fetch it, so
/// `"latest"` resolution is instant and works offline.
pub struct VersionResolver<C> {
    catalog: C,
}

impl<C: CatalogSource> VersionResolver<C> {
    /// Create a resolver over the given catalog source.
    pub const fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Resolve a request to one concrete, downloadable release.
    ///
    /// # Errors
    ///
    /// [`ScaffoldError::VersionNotFound`] when no matching entry exists;
    /// catalog errors propagate unchanged.
    pub async fn resolve(
        &self,
        request: &VersionRequest,
    ) -> Result<ResolvedRelease, ScaffoldError> {
        if matches!(request, VersionRequest::Latest) {
            return Ok(ResolvedRelease::latest());
        }
        let index = self.catalog.fetch().await?;
        select(request, &index)
    }
}
