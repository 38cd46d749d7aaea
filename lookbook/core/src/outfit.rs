//! Outfit Model
//!
//! Slots, gender tags and the per-slot filename selection shown on the wall.
//!
//! The head slot is deliberately absent from [`OutfitSelection`]: it shows
//! either the captured photo or a constant animation (see
//! [`crate::state::HeadSource`]), never a randomized pick.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::assets::AssetIndex;

/// Gender tag used to bucket interchangeable assets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Menswear assets
    Male,
    /// Womenswear assets
    Female,
    /// Unisex assets
    Neutral,
}

impl Gender {
    /// Every gender tag, in draw order
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Neutral];

    /// Category prefix used by the manifest
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Neutral => "neutral",
        }
    }

    /// Draw one tag uniformly at random
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A renderable, randomizable position in the outfit grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// Upper body
    Top,
    /// Lower body
    Bottom,
    /// Footwear
    Shoes,
    /// Left accessory column
    Left,
    /// Right accessory column
    Right,
}

impl Slot {
    /// Every slot, in grid reading order
    pub const ALL: [Slot; 5] = [Slot::Left, Slot::Top, Slot::Right, Slot::Bottom, Slot::Shoes];

    /// Slot name as used in manifest categories
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Shoes => "shoes",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Manifest category for this slot and gender, e.g. `female_top`
    #[must_use]
    pub fn category(self, gender: Gender) -> String {
        format!("{}_{}", gender.as_str(), self.as_str())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-slot filenames for one presentation
///
/// Every slot is optional: a slot with no candidate asset renders nothing.
/// Unknown keys in the wire payload (such as `head`) are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutfitSelection {
    /// Upper body filename
    pub top: Option<String>,
    /// Lower body filename
    pub bottom: Option<String>,
    /// Footwear filename
    pub shoes: Option<String>,
    /// Left accessory filename
    pub left: Option<String>,
    /// Right accessory filename
    pub right: Option<String>,
}

impl OutfitSelection {
    /// Selection with every slot absent
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Filename in a slot, if any
    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::Top => self.top.as_deref(),
            Slot::Bottom => self.bottom.as_deref(),
            Slot::Shoes => self.shoes.as_deref(),
            Slot::Left => self.left.as_deref(),
            Slot::Right => self.right.as_deref(),
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<String> {
        match slot {
            Slot::Top => &mut self.top,
            Slot::Bottom => &mut self.bottom,
            Slot::Shoes => &mut self.shoes,
            Slot::Left => &mut self.left,
            Slot::Right => &mut self.right,
        }
    }

    /// Whether every slot is absent
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Slot::ALL.iter().all(|slot| self.get(*slot).is_none())
    }
}

/// Generate a randomized outfit from the indexed assets
///
/// One gender is drawn per call and applied to every slot, so a generated
/// look never mixes categories across genders.
pub fn random_outfit<R: Rng + ?Sized>(index: &AssetIndex, rng: &mut R) -> OutfitSelection {
    let gender = Gender::random(rng);
    random_outfit_for(index, gender, rng)
}

/// Generate a randomized outfit for a fixed gender
///
/// Each slot draws uniformly from the filenames indexed under
/// `{gender}_{slot}`; a slot with no candidates stays absent.
pub fn random_outfit_for<R: Rng + ?Sized>(
    index: &AssetIndex,
    gender: Gender,
    rng: &mut R,
) -> OutfitSelection {
    let mut selection = OutfitSelection::empty();
    for slot in Slot::ALL {
        let candidates: Vec<&str> = index.filenames(&slot.category(gender)).collect();
        *selection.slot_mut(slot) = candidates.choose(rng).map(|name| (*name).to_string());
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn index_with(entries: &[(&str, &str)]) -> AssetIndex {
        let mut index = AssetIndex::new("http://wall.test/public/outfits");
        for (category, filename) in entries {
            index.insert(category, filename, format!("http://wall.test/public/outfits/{filename}"));
        }
        index
    }

    #[test]
    fn test_category_names() {
        assert_eq!(Slot::Top.category(Gender::Female), "female_top");
        assert_eq!(Slot::Shoes.category(Gender::Neutral), "neutral_shoes");
    }

    #[test]
    fn test_selection_ignores_head_key() {
        let selection: OutfitSelection =
            serde_json::from_str(r#"{"head":"h.gif","top":"a.png","shoes":null}"#).unwrap();
        assert_eq!(selection.top.as_deref(), Some("a.png"));
        assert!(selection.shoes.is_none());
        assert!(selection.bottom.is_none());
    }

    #[test]
    fn test_empty_index_generates_empty_selection() {
        let index = AssetIndex::new("http://wall.test/public/outfits");
        let mut rng = StdRng::seed_from_u64(7);
        assert!(random_outfit(&index, &mut rng).is_empty());
    }

    #[test]
    fn test_single_gender_per_generation() {
        let index = index_with(&[
            ("male_top", "m_top.png"),
            ("male_shoes", "m_shoes.png"),
            ("female_top", "f_top.png"),
            ("female_shoes", "f_shoes.png"),
            ("neutral_top", "n_top.png"),
            ("neutral_shoes", "n_shoes.png"),
        ]);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let selection = random_outfit(&index, &mut rng);
            let top = selection.top.unwrap();
            let shoes = selection.shoes.unwrap();
            assert_eq!(top.split('_').next(), shoes.split('_').next());
        }
    }

    #[test]
    fn test_fixed_gender_draws_only_its_categories() {
        let index = index_with(&[
            ("female_top", "a.png"),
            ("female_top", "b.png"),
            ("male_top", "c.png"),
        ]);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..100 {
            let selection = random_outfit_for(&index, Gender::Female, &mut rng);
            let top = selection.top.unwrap();
            assert!(top == "a.png" || top == "b.png");
            assert!(selection.bottom.is_none());
        }
    }

    #[test]
    fn test_all_genders_eventually_drawn() {
        let mut rng = rand::thread_rng();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            seen.insert(Gender::random(&mut rng));
        }
        assert_eq!(seen.len(), 3);
    }
}
