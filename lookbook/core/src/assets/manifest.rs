//! Manifest
//!
//! The backend's listing of asset filenames per category plus an initial
//! default selection:
//!
//! ```json
//! { "files": { "female_top": ["a.png"] }, "randomOutfits": { "top": "a.png" } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::outfit::OutfitSelection;

/// Asset manifest served by `GET /outfits`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
    /// Filenames that should exist, keyed by category
    pub files: BTreeMap<String, Vec<String>>,
    /// Selection to show before the first idle refresh
    pub random_outfits: OutfitSelection,
}

impl Manifest {
    /// Number of filenames listed across all categories
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}
