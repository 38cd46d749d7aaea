//! Asset Index
//!
//! Category → filename → resolved URL mapping built by one asset load.
//! Read-only once published: the engine wraps it in an `Arc` and shares it
//! with the refresh generator and the view without locks.

use std::collections::BTreeMap;

/// Assets that live outside the per-gender categories
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixedAsset {
    /// Left logo tile
    LogoLeft,
    /// Right logo tile
    LogoRight,
    /// Animated head shown whenever no captured photo is on screen
    DefaultHead,
}

impl FixedAsset {
    /// Every fixed asset
    pub const ALL: [FixedAsset; 3] = [
        FixedAsset::LogoLeft,
        FixedAsset::LogoRight,
        FixedAsset::DefaultHead,
    ];

    /// Index key the asset is stored under
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::LogoLeft => "logo_left",
            Self::LogoRight => "logo_right",
            Self::DefaultHead => "head_default",
        }
    }
}

/// Index of successfully loaded display assets
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetIndex {
    /// Base URL used to construct fallback URLs
    asset_base: String,
    categories: BTreeMap<String, BTreeMap<String, String>>,
}

impl AssetIndex {
    /// Create an empty index rooted at `asset_base` (e.g. `http://host/public/outfits`)
    pub fn new(asset_base: impl Into<String>) -> Self {
        Self {
            asset_base: asset_base.into(),
            categories: BTreeMap::new(),
        }
    }

    /// Record a loaded asset
    pub fn insert(&mut self, category: &str, filename: &str, url: impl Into<String>) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(filename.to_string(), url.into());
    }

    /// URL of an indexed filename, searching every category
    #[must_use]
    pub fn lookup(&self, filename: &str) -> Option<&str> {
        self.categories
            .values()
            .find_map(|files| files.get(filename))
            .map(String::as_str)
    }

    /// Resolve a filename to a URL
    ///
    /// Indexed filenames return their recorded URL. Anything else falls back
    /// to the conventional location under the asset base, which covers assets
    /// added on the backend after the manifest snapshot. Only a blank filename
    /// resolves to `None`.
    #[must_use]
    pub fn resolve(&self, filename: &str) -> Option<String> {
        if filename.trim().is_empty() {
            return None;
        }
        Some(
            self.lookup(filename)
                .map_or_else(|| self.fallback_url(filename), str::to_string),
        )
    }

    /// Conventional URL for a filename under this index's asset base
    #[must_use]
    pub fn fallback_url(&self, filename: &str) -> String {
        asset_url(&self.asset_base, filename)
    }

    /// Filenames indexed under a category, in sorted order
    pub fn filenames<'a>(&'a self, category: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.categories
            .get(category)
            .into_iter()
            .flat_map(|files| files.keys().map(String::as_str))
    }

    /// URL of a fixed asset, if it loaded
    #[must_use]
    pub fn fixed(&self, asset: FixedAsset) -> Option<&str> {
        self.categories
            .get(asset.key())
            .and_then(|files| files.values().next())
            .map(String::as_str)
    }

    /// Category names present in the index
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Total number of indexed assets
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// Whether nothing loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Base URL fallback resolution is rooted at
    #[must_use]
    pub fn asset_base(&self) -> &str {
        &self.asset_base
    }
}

/// Join an asset base and a filename
pub(crate) fn asset_url(base: &str, filename: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://wall.test/public/outfits";

    #[test]
    fn test_resolve_indexed_filename() {
        let mut index = AssetIndex::new(BASE);
        index.insert("female_top", "a.png", "http://cdn.test/a.png");

        assert_eq!(index.resolve("a.png").as_deref(), Some("http://cdn.test/a.png"));
        assert_eq!(index.lookup("a.png"), Some("http://cdn.test/a.png"));
    }

    #[test]
    fn test_resolve_falls_back_to_asset_base() {
        let index = AssetIndex::new(format!("{BASE}/"));
        assert_eq!(
            index.resolve("late.png").as_deref(),
            Some("http://wall.test/public/outfits/late.png")
        );
        assert!(index.lookup("late.png").is_none());
    }

    #[test]
    fn test_resolve_blank_filename() {
        let index = AssetIndex::new(BASE);
        assert!(index.resolve("").is_none());
        assert!(index.resolve("  ").is_none());
    }

    #[test]
    fn test_fixed_assets() {
        let mut index = AssetIndex::new(BASE);
        index.insert(
            FixedAsset::LogoLeft.key(),
            "Logo_Left_static.png",
            "http://wall.test/public/outfits/Logo_Left_static.png",
        );

        assert!(index.fixed(FixedAsset::LogoLeft).is_some());
        assert!(index.fixed(FixedAsset::LogoRight).is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_filenames_of_missing_category() {
        let index = AssetIndex::new(BASE);
        assert_eq!(index.filenames("male_top").count(), 0);
        assert!(index.is_empty());
    }
}
