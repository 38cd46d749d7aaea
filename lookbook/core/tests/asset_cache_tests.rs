//! Asset loading barrier and outfit generation against a loaded index

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use lookbook_core::{
    random_outfit, random_outfit_for, AssetCache, AssetProbe, FixedAsset, FixedAssetNames, Gender,
    Manifest, ProbeError, Slot,
};
use pretty_assertions::assert_eq;
use tokio::sync::Semaphore;
use tokio_test::{assert_pending, assert_ready};

const BASE: &str = "http://wall.test/public/outfits";

/// `slow*` assets wait for the gate, `bad*` assets fail, the rest load
struct GatedProbe {
    gate: Arc<Semaphore>,
}

#[async_trait]
impl AssetProbe for GatedProbe {
    async fn probe(&self, url: &str) -> Result<(), ProbeError> {
        let filename = url.rsplit('/').next().unwrap_or_default();
        if filename.starts_with("slow") {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| ProbeError::Decode(e.to_string()))?;
        }
        if filename.starts_with("bad") {
            return Err(ProbeError::Status(404));
        }
        Ok(())
    }
}

struct AlwaysOk;

#[async_trait]
impl AssetProbe for AlwaysOk {
    async fn probe(&self, _url: &str) -> Result<(), ProbeError> {
        Ok(())
    }
}

fn manifest(entries: &[(&str, &[&str])]) -> Manifest {
    let mut manifest = Manifest::default();
    for (category, files) in entries {
        manifest.files.insert(
            (*category).to_string(),
            files.iter().map(|f| (*f).to_string()).collect(),
        );
    }
    manifest
}

#[tokio::test]
async fn test_load_does_not_resolve_before_every_probe_settles() {
    let gate = Arc::new(Semaphore::new(0));
    let cache = AssetCache::new(
        Arc::new(GatedProbe {
            gate: Arc::clone(&gate),
        }),
        BASE,
        FixedAssetNames::default(),
    );
    let manifest = manifest(&[("female_top", &["a.png", "slow.png", "bad.png"])]);

    let mut load = tokio_test::task::spawn(cache.load(&manifest));
    assert_pending!(load.poll());
    assert_pending!(load.poll());

    gate.add_permits(1);
    assert!(load.is_woken());
    let loaded = assert_ready!(load.poll());

    assert!(loaded.index.lookup("a.png").is_some());
    assert!(loaded.index.lookup("slow.png").is_some());
    assert!(loaded.index.lookup("bad.png").is_none());
    assert_eq!(loaded.report.failed, vec!["bad.png".to_string()]);
    assert!(loaded.index.fixed(FixedAsset::DefaultHead).is_some());
}

#[tokio::test]
async fn test_failed_asset_still_resolves_through_fallback() {
    let cache = AssetCache::new(
        Arc::new(GatedProbe {
            gate: Arc::new(Semaphore::new(0)),
        }),
        BASE,
        FixedAssetNames::default(),
    );
    let loaded = cache
        .load(&manifest(&[("male_shoes", &["bad-boot.png"])]))
        .await;

    assert!(loaded.index.lookup("bad-boot.png").is_none());
    assert_eq!(
        loaded.index.resolve("bad-boot.png").as_deref(),
        Some("http://wall.test/public/outfits/bad-boot.png")
    );
}

#[tokio::test]
async fn test_single_category_manifest_constrains_generation() {
    let cache = AssetCache::new(Arc::new(AlwaysOk), BASE, FixedAssetNames::default());
    let loaded = cache
        .load(&manifest(&[("female_top", &["a.png"])]))
        .await;
    let index = loaded.index;

    let mut rng = rand::thread_rng();
    let mut tops = HashSet::new();
    for _ in 0..1000 {
        let outfit = random_outfit(&index, &mut rng);
        tops.insert(outfit.top.clone());
        for slot in [Slot::Bottom, Slot::Shoes, Slot::Left, Slot::Right] {
            assert!(outfit.get(slot).is_none(), "{slot} drew from another category");
        }
    }
    assert!(tops.iter().all(|t| matches!(t.as_deref(), None | Some("a.png"))));
    assert!(tops.contains(&Some("a.png".to_string())));
    assert!(tops.contains(&None));

    for gender in Gender::ALL {
        let outfit = random_outfit_for(&index, gender, &mut rng);
        let expected = (gender == Gender::Female).then_some("a.png");
        assert_eq!(outfit.top.as_deref(), expected, "gender {gender}");
    }
}
