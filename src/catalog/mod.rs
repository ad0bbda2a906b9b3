//! Remote release catalog access.
//!
//! The catalog endpoint serves a three-level JSON mapping from major line
//! (`"3.x"`) to minor line (`"3.4"`) to patch label to concrete version
//! string. [`VersionCatalog`] fetches that document, keeping the raw
//! payload in a TTL cache so that repeated resolutions within a minute make
//! no network call at all.
//!
//! Failure modes are distinct on purpose:
//! - the endpoint unreachable with no fresh cache entry is
//!   [`ScaffoldError::CatalogUnavailable`] (carrying the transport error);
//! - an unparseable payload is [`ScaffoldError::CatalogCorrupt`], whether it
//!   came off the wire or out of the cache. A corrupted cache entry is
//!   reported, not silently retried against the network - it expires on its
//!   own within the TTL.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::BlobStore;
use crate::constants::CATALOG_CACHE_KEY;
use crate::core::ScaffoldError;

/// Immutable snapshot of the remote catalog.
///
/// Mirrors the remote document exactly: major line -> minor line -> patch
/// label -> version string. Keys are version-label strings; `BTreeMap` keeps
/// iteration deterministic but resolution never relies on map order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseIndex(pub BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>);

impl ReleaseIndex {
    /// Look up a major line by its catalog key (e.g. `"3.x"`).
    #[must_use]
    pub fn major_line(&self, key: &str) -> Option<&BTreeMap<String, BTreeMap<String, String>>> {
        self.0.get(key)
    }

    /// Whether `version` appears anywhere in the snapshot.
    #[must_use]
    pub fn contains_version(&self, version: &str) -> bool {
        self.0
            .values()
            .flat_map(|minor_lines| minor_lines.values())
            .flat_map(|patches| patches.values())
            .any(|v| v == version)
    }
}

/// Parse a raw catalog payload into a [`ReleaseIndex`].
pub fn parse_index(payload: &[u8]) -> Result<ReleaseIndex, ScaffoldError> {
    serde_json::from_slice(payload).map_err(|e| ScaffoldError::CatalogCorrupt {
        reason: e.to_string(),
    })
}

/// Anything that can produce a [`ReleaseIndex`].
///
/// The resolver and pipeline are generic over this seam so tests can count
/// catalog calls and serve fixed snapshots without a network.
pub trait CatalogSource: Send + Sync {
    /// Produce the current release index.
    fn fetch(&self) -> impl Future<Output = Result<ReleaseIndex, ScaffoldError>> + Send;
}

/// Cache-first client for the remote version catalog.
pub struct VersionCatalog {
    client: reqwest::Client,
    cache: Box<dyn BlobStore>,
    url: String,
}

impl VersionCatalog {
    /// Create a catalog client over an HTTP client and a blob cache.
    pub fn new(client: reqwest::Client, cache: Box<dyn BlobStore>, url: impl Into<String>) -> Self {
        Self {
            client,
            cache,
            url: url.into(),
        }
    }

    async fn fetch_remote(&self) -> Result<ReleaseIndex, ScaffoldError> {
        debug!(url = %self.url, "fetching version catalog");
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            ScaffoldError::CatalogUnavailable {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(ScaffoldError::CatalogUnavailable {
                url: self.url.clone(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let payload = response
            .bytes()
            .await
            .map_err(|e| ScaffoldError::CatalogUnavailable {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        // Store the raw body first, then parse. The cache is best-effort.
        if let Err(e) = self.cache.put(CATALOG_CACHE_KEY, &payload) {
            warn!(error = %e, "failed to cache catalog payload");
        }

        parse_index(&payload)
    }
}

impl CatalogSource for VersionCatalog {
    /// Fetch the release index, consulting the cache first.
    ///
    /// A fresh cache entry short-circuits the network entirely; a cache miss
    /// performs the HTTP GET and stores the raw body under the catalog key.
    async fn fetch(&self) -> Result<ReleaseIndex, ScaffoldError> {
        if let Some(cached) = self.cache.get(CATALOG_CACHE_KEY) {
            debug!(url = %self.url, "using cached version catalog");
            return parse_index(&cached);
        }
        self.fetch_remote().await
    }
}
