//! bias.rs — Category bias: map detector labels onto catalog categories and
//! nudge ranking toward the kind of place the photo suggests.
//!
//! The label→category table ships with the binary (`config/
//! detection_categories.json`). Lookups normalize case and separators so
//! detector spelling variants ("Surf_board", "surf-board") still land.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::catalog::Category;

static LABEL_CATEGORIES: Lazy<HashMap<String, Category>> = Lazy::new(|| {
    let raw = include_str!("../config/detection_categories.json");
    serde_json::from_str::<HashMap<String, Category>>(raw).expect("valid detection category table")
});

/// Detector labels counted as commerce when inferring the zone type.
const COMMERCE_LABELS: [&str; 7] = [
    "restaurant",
    "cafe",
    "bar",
    "bakery",
    "shop",
    "market",
    "hotel",
];

/// Coarse zone classification inferred from detected commerce density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    Turistica,
    Urbana,
    Rural,
}

/// Per-request detection context from the object-detection collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryContext {
    /// Detected label → occurrence count.
    #[serde(default, rename = "detecciones")]
    pub detections: BTreeMap<String, u32>,
    #[serde(default, rename = "tipo_zona", skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<ZoneType>,
}

/// Normalize a detector label: lowercase, separators to spaces, collapsed.
fn normalize_label(s: &str) -> String {
    let mut out = s.trim().to_ascii_lowercase();
    for ch in ['-', '_', '/', '\\', '.', ','] {
        out = out.replace(ch, " ");
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Category preferred by the detections: sum counts per mapped category and
/// take the maximum. Unmapped labels are ignored; an empty or unmappable set
/// yields `None`. Equal scores resolve to the lexicographically smallest
/// category tag, which keeps the vote deterministic across runs.
pub fn preferred_category(detections: &BTreeMap<String, u32>) -> Option<Category> {
    let mut scores: BTreeMap<&'static str, (Category, u32)> = BTreeMap::new();
    for (label, count) in detections {
        if let Some(cat) = LABEL_CATEGORIES.get(&normalize_label(label)) {
            let entry = scores.entry(cat.tag()).or_insert((*cat, 0));
            entry.1 += count;
        }
    }

    let mut best: Option<(Category, u32)> = None;
    for (_, (cat, score)) in scores {
        match best {
            Some((_, s)) if score <= s => {}
            _ => best = Some((cat, score)),
        }
    }
    best.map(|(cat, _)| cat)
}

/// Distance used for ranking only: a candidate matching the preferred
/// category is treated as `bias_factor` times closer. Reported distances
/// stay unbiased.
pub fn effective_distance(
    true_km: f64,
    site_category: Category,
    preferred: Option<Category>,
    bias_factor: f64,
) -> f64 {
    match preferred {
        Some(p) if p == site_category => true_km * bias_factor,
        _ => true_km,
    }
}

/// Zone inference: total commerce detections mapped to a three-tier zone.
pub fn infer_zone_type(detections: &BTreeMap<String, u32>) -> (u32, ZoneType) {
    let total: u32 = detections
        .iter()
        .filter(|(label, _)| COMMERCE_LABELS.contains(&normalize_label(label).as_str()))
        .map(|(_, count)| *count)
        .sum();

    let zone = if total >= 5 {
        ZoneType::Turistica
    } else if total >= 2 {
        ZoneType::Urbana
    } else {
        ZoneType::Rural
    };
    (total, zone)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detections(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|(l, c)| (l.to_string(), *c)).collect()
    }

    #[test]
    fn empty_detections_have_no_preference_and_no_bias() {
        let empty = BTreeMap::new();
        assert_eq!(preferred_category(&empty), None);
        let d = effective_distance(12.5, Category::Playa, None, 0.6);
        assert_eq!(d, 12.5);
    }

    #[test]
    fn counts_accumulate_per_category() {
        // 3 commerce labels vs 2 beach labels -> ciudad wins
        let det = detections(&[("restaurant", 2), ("cafe", 1), ("surfboard", 2)]);
        assert_eq!(preferred_category(&det), Some(Category::Ciudad));
    }

    #[test]
    fn ties_resolve_to_lexicographically_smallest_tag() {
        // parque vs playa, 2 each -> "parque" < "playa"
        let det = detections(&[("tree", 2), ("beach", 2)]);
        assert_eq!(preferred_category(&det), Some(Category::Parque));
    }

    #[test]
    fn unmapped_labels_are_ignored() {
        let det = detections(&[("person", 7), ("dog", 3)]);
        assert_eq!(preferred_category(&det), None);
    }

    #[test]
    fn label_lookup_survives_spelling_variants() {
        let det = detections(&[("Surf_board", 1)]);
        assert_eq!(preferred_category(&det), Some(Category::Playa));
    }

    #[test]
    fn bias_shrinks_matching_distance_only() {
        let biased = effective_distance(10.0, Category::Playa, Some(Category::Playa), 0.6);
        assert!((biased - 6.0).abs() < 1e-9);
        let other = effective_distance(10.0, Category::Parque, Some(Category::Playa), 0.6);
        assert_eq!(other, 10.0);
    }

    #[test]
    fn zone_tiers_follow_commerce_density() {
        assert_eq!(infer_zone_type(&detections(&[])).1, ZoneType::Rural);
        assert_eq!(
            infer_zone_type(&detections(&[("cafe", 1), ("tree", 9)])).1,
            ZoneType::Rural
        );
        assert_eq!(
            infer_zone_type(&detections(&[("cafe", 1), ("bar", 1)])).1,
            ZoneType::Urbana
        );
        let (total, zone) = infer_zone_type(&detections(&[("restaurant", 3), ("hotel", 2)]));
        assert_eq!(total, 5);
        assert_eq!(zone, ZoneType::Turistica);
    }
}
