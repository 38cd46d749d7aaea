//! Asset Cache
//!
//! Loads and indexes the display images before the first render.
//!
//! # Loading
//!
//! 1. Fetch the manifest (`GET /outfits`, authenticated with the shared secret)
//! 2. Launch one probe per listed filename, plus the two logos and the
//!    default head, all concurrently
//! 3. Join on every probe (success or failure) before publishing anything
//!
//! A failing asset is silently omitted from the index and recorded in the
//! [`LoadReport`]; it never fails the load. Partial indexes are never
//! published, so the first render cannot race a half-populated cache.
//!
//! A failed manifest fetch is fatal to the loading phase and is reported to
//! the caller without retry.

mod index;
mod manifest;
mod probe;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::ApiKey;
use crate::outfit::OutfitSelection;

pub use index::{AssetIndex, FixedAsset};
pub use manifest::Manifest;
pub use probe::{AssetProbe, HttpProbe, ProbeError};

/// Errors that end the loading phase
#[derive(Debug, Error)]
pub enum AssetError {
    /// The manifest request did not complete
    #[error("manifest request to {url} failed: {source}")]
    ManifestRequest {
        /// Manifest URL
        url: String,
        /// Underlying HTTP error
        #[source]
        source: reqwest::Error,
    },

    /// The backend refused or failed the manifest request
    #[error("manifest request to {url} returned status {status}")]
    ManifestStatus {
        /// Manifest URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The manifest body is not the expected JSON shape
    #[error("manifest from {url} is malformed: {source}")]
    ManifestDecode {
        /// Manifest URL
        url: String,
        /// Underlying decode error
        #[source]
        source: reqwest::Error,
    },
}

/// Filenames of the assets that exist outside the manifest categories
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedAssetNames {
    /// Left logo filename
    pub logo_left: String,
    /// Right logo filename
    pub logo_right: String,
    /// Default animated head filename
    pub default_head: String,
}

impl Default for FixedAssetNames {
    fn default() -> Self {
        Self {
            logo_left: "Logo_Left_static.png".to_string(),
            logo_right: "Logo_Right_static.png".to_string(),
            default_head: "Head_Default_animated.gif".to_string(),
        }
    }
}

impl FixedAssetNames {
    /// Filename configured for a fixed asset
    #[must_use]
    pub fn filename(&self, asset: FixedAsset) -> &str {
        match asset {
            FixedAsset::LogoLeft => &self.logo_left,
            FixedAsset::LogoRight => &self.logo_right,
            FixedAsset::DefaultHead => &self.default_head,
        }
    }
}

/// Outcome counts of one load
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Assets that probed successfully
    pub loaded: usize,
    /// Filenames whose probe failed
    pub failed: Vec<String>,
}

/// Result of a completed load: the published index and the manifest default
#[derive(Clone, Debug)]
pub struct LoadedAssets {
    /// The immutable index
    pub index: AssetIndex,
    /// Default selection from the manifest
    pub default_outfits: OutfitSelection,
    /// What loaded and what did not
    pub report: LoadReport,
}

/// Probes manifest entries and builds an [`AssetIndex`]
#[derive(Clone)]
pub struct AssetCache {
    probe: Arc<dyn AssetProbe>,
    asset_base: String,
    fixed: FixedAssetNames,
}

impl AssetCache {
    /// Create a cache probing assets under `asset_base`
    pub fn new(probe: Arc<dyn AssetProbe>, asset_base: impl Into<String>, fixed: FixedAssetNames) -> Self {
        Self {
            probe,
            asset_base: asset_base.into(),
            fixed,
        }
    }

    /// Base URL assets are loaded from
    #[must_use]
    pub fn asset_base(&self) -> &str {
        &self.asset_base
    }

    /// Probe every manifest entry and fixed asset, then publish the index
    ///
    /// Completes only after every probe has settled.
    pub async fn load(&self, manifest: &Manifest) -> LoadedAssets {
        let mut targets: Vec<(String, String)> = manifest
            .files
            .iter()
            .flat_map(|(category, files)| {
                files
                    .iter()
                    .map(move |filename| (category.clone(), filename.clone()))
            })
            .collect();
        targets.extend(
            FixedAsset::ALL
                .iter()
                .map(|asset| (asset.key().to_string(), self.fixed.filename(*asset).to_string())),
        );

        debug!(count = targets.len(), "Probing assets");

        let probes = targets.into_iter().map(|(category, filename)| {
            let url = index::asset_url(&self.asset_base, &filename);
            let probe = Arc::clone(&self.probe);
            async move {
                let outcome = probe.probe(&url).await;
                (category, filename, url, outcome)
            }
        });

        let settled = join_all(probes).await;

        let mut index = AssetIndex::new(self.asset_base.clone());
        let mut report = LoadReport::default();
        for (category, filename, url, outcome) in settled {
            match outcome {
                Ok(()) => {
                    index.insert(&category, &filename, url);
                    report.loaded += 1;
                }
                Err(e) => {
                    warn!(filename = %filename, category = %category, error = %e, "Failed to load asset");
                    report.failed.push(filename);
                }
            }
        }

        info!(
            loaded = report.loaded,
            failed = report.failed.len(),
            "Asset preload complete"
        );

        LoadedAssets {
            index,
            default_outfits: manifest.random_outfits.clone(),
            report,
        }
    }
}

/// Fetches the manifest and runs the cache load
#[derive(Clone)]
pub struct AssetLoader {
    client: reqwest::Client,
    manifest_url: String,
    api_key: Option<ApiKey>,
    timeout: Duration,
    cache: AssetCache,
}

impl AssetLoader {
    /// Create a loader
    pub fn new(
        client: reqwest::Client,
        manifest_url: impl Into<String>,
        api_key: Option<ApiKey>,
        timeout: Duration,
        cache: AssetCache,
    ) -> Self {
        Self {
            client,
            manifest_url: manifest_url.into(),
            api_key,
            timeout,
            cache,
        }
    }

    /// Same loader authenticated with a different key
    #[must_use]
    pub fn with_api_key(&self, api_key: ApiKey) -> Self {
        Self {
            api_key: Some(api_key),
            ..self.clone()
        }
    }

    /// The cache this loader feeds
    #[must_use]
    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Fetch the manifest from the backend
    ///
    /// # Errors
    ///
    /// Returns an [`AssetError`] on network failure, non-success status or a
    /// malformed body. Not retried.
    pub async fn fetch_manifest(&self) -> Result<Manifest, AssetError> {
        let mut request = self.client.get(&self.manifest_url).timeout(self.timeout);
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_blank()) {
            request = request.header(ApiKey::HEADER, key.expose());
        }

        let response = request.send().await.map_err(|source| AssetError::ManifestRequest {
            url: self.manifest_url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::ManifestStatus {
                url: self.manifest_url.clone(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Manifest>()
            .await
            .map_err(|source| AssetError::ManifestDecode {
                url: self.manifest_url.clone(),
                source,
            })
    }

    /// Fetch the manifest and load every asset it lists
    ///
    /// # Errors
    ///
    /// Only a manifest failure is an error; individual asset failures are
    /// recorded in the returned [`LoadReport`].
    pub async fn load_from_backend(&self) -> Result<LoadedAssets, AssetError> {
        info!(url = %self.manifest_url, "Fetching asset manifest");
        let manifest = self.fetch_manifest().await?;
        Ok(self.cache.load(&manifest).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct ListProbe {
        failing: HashSet<String>,
    }

    #[async_trait::async_trait]
    impl AssetProbe for ListProbe {
        async fn probe(&self, url: &str) -> Result<(), ProbeError> {
            if self.failing.iter().any(|name| url.ends_with(name.as_str())) {
                Err(ProbeError::Status(404))
            } else {
                Ok(())
            }
        }
    }

    fn cache(failing: &[&str]) -> AssetCache {
        let probe = ListProbe {
            failing: failing.iter().map(|s| (*s).to_string()).collect(),
        };
        AssetCache::new(
            Arc::new(probe),
            "http://wall.test/public/outfits",
            FixedAssetNames::default(),
        )
    }

    fn manifest() -> Manifest {
        let mut manifest = Manifest::default();
        manifest
            .files
            .insert("female_top".into(), vec!["a.png".into(), "broken.png".into()]);
        manifest
            .files
            .insert("male_shoes".into(), vec!["s.png".into()]);
        manifest.random_outfits.top = Some("a.png".into());
        manifest
    }

    #[tokio::test]
    async fn test_load_omits_failed_assets() {
        let loaded = cache(&["broken.png"]).load(&manifest()).await;

        assert_eq!(
            loaded.index.lookup("a.png"),
            Some("http://wall.test/public/outfits/a.png")
        );
        assert!(loaded.index.lookup("broken.png").is_none());
        assert_eq!(loaded.report.failed, vec!["broken.png".to_string()]);
        // a.png, s.png and the three fixed assets
        assert_eq!(loaded.report.loaded, 5);
        assert_eq!(loaded.default_outfits.top.as_deref(), Some("a.png"));
    }

    #[tokio::test]
    async fn test_fixed_assets_are_indexed() {
        let loaded = cache(&["Logo_Right_static.png"]).load(&Manifest::default()).await;

        assert!(loaded.index.fixed(FixedAsset::LogoLeft).is_some());
        assert!(loaded.index.fixed(FixedAsset::DefaultHead).is_some());
        assert!(loaded.index.fixed(FixedAsset::LogoRight).is_none());
    }

    #[tokio::test]
    async fn test_every_asset_failing_still_completes() {
        let manifest = manifest();
        let everything: Vec<&str> = vec![
            "a.png",
            "broken.png",
            "s.png",
            "Logo_Left_static.png",
            "Logo_Right_static.png",
            "Head_Default_animated.gif",
        ];
        let loaded = cache(&everything).load(&manifest).await;

        assert!(loaded.index.is_empty());
        assert_eq!(loaded.report.failed.len(), 6);
    }
}
