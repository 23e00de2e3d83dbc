//! Cross-source category taxonomy unifier.
//!
//! Each source exposes its own category vocabulary (catalog categories, item
//! groups, line-item category fields). This module merges them into one
//! mapping onto the closed [`ProductCategory`] enum via layered matching:
//! exact hit, substring relation against the curated base table, then keyword
//! heuristics. The mapping is an explicit value owned by the pipeline and
//! accumulated across adapters, not ambient global state.

use std::collections::{BTreeSet, HashMap};

use crate::domain::ProductCategory;
use crate::normalize::clean;

use ProductCategory::*;

/// Hand-curated base table of exact synonyms. Definition order is the scan
/// order for substring matching and must stay stable across runs.
const BASE_CATEGORY_TABLE: &[(&str, ProductCategory)] = &[
    ("burgers", Burgers),
    ("burger", Burgers),
    ("sandwiches", Sandwiches),
    ("sandwich", Sandwiches),
    ("sides", Sides),
    ("side", Sides),
    ("sides & appetizers", Sides),
    ("appetizers", Appetizers),
    ("appetizer", Appetizers),
    ("beverages", Beverages),
    ("beverage", Beverages),
    ("drinks", Beverages),
    ("drink", Beverages),
    ("coffee", Beverages),
    ("breakfast", Breakfast),
    ("entrees", Entrees),
    ("entree", Entrees),
    ("pasta", Entrees),
    ("seafood", Entrees),
    ("salads", Salads),
    ("salad", Salads),
    ("desserts", Desserts),
    ("dessert", Desserts),
    ("alcohol", Alcohol),
    ("beer", Alcohol),
    ("beer & wine", Alcohol),
    ("wine", Alcohol),
    ("cocktails", Alcohol),
    ("wraps", Sandwiches),
];

const ENTREE_KEYWORDS: &[&str] = &["steak", "meat", "entree", "entres", "chicken", "beef", "pork", "lamb"];
const BEVERAGE_KEYWORDS: &[&str] = &["drink", "beverage", "coffee", "juice", "soda"];
const ALCOHOL_KEYWORDS: &[&str] = &["beer", "wine", "cocktail", "alcohol", "spirit"];
const SIDE_KEYWORDS: &[&str] = &["side", "appetizer", "appitizer"];

/// Merged mapping from cleaned raw category label to canonical category.
///
/// Entries keep insertion order (base table first, learned labels after) so
/// substring lookups scan in a stable order across runs.
#[derive(Debug, Clone)]
pub struct CategoryMapping {
    entries: Vec<(String, ProductCategory)>,
    index: HashMap<String, usize>,
}

impl CategoryMapping {
    /// Mapping seeded with the curated base table only.
    pub fn base() -> Self {
        let mut mapping = Self {
            entries: Vec::with_capacity(BASE_CATEGORY_TABLE.len()),
            index: HashMap::with_capacity(BASE_CATEGORY_TABLE.len()),
        };
        for (key, category) in BASE_CATEGORY_TABLE {
            mapping.insert(key, *category);
        }
        mapping
    }

    fn insert(&mut self, key: &str, category: ProductCategory) {
        if self.index.contains_key(key) {
            return;
        }
        self.index.insert(key.to_string(), self.entries.len());
        self.entries.push((key.to_string(), category));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold one source's raw category vocabulary into the mapping. Labels the
    /// mapping already covers are left untouched, so calling this once per
    /// source accumulates rather than replaces.
    ///
    /// For each new label: exact base-table hit, then substring relation in
    /// either direction against the base table in definition order, then
    /// keyword buckets. Labels that match nothing stay unmapped and fall
    /// through to UNKNOWN at lookup time.
    pub fn learn(&mut self, raw_categories: &BTreeSet<String>) {
        for raw in raw_categories {
            if self.contains(raw) {
                continue;
            }

            let mut matched = false;
            for (base_key, base_value) in BASE_CATEGORY_TABLE {
                // e.g. "steak" in "steaks", or "steaks" in "steak combo"
                if raw.contains(base_key) || base_key.contains(raw.as_str()) {
                    self.insert(raw, *base_value);
                    matched = true;
                    break;
                }
            }
            if matched {
                continue;
            }

            if let Some(category) = keyword_bucket(raw) {
                self.insert(raw, category);
            }
        }
    }

    /// Normalize a raw category label to its canonical category: clean, exact
    /// lookup, then first mapping key contained in the cleaned label (entry
    /// order), else UNKNOWN.
    pub fn normalize(&self, raw: &str) -> ProductCategory {
        let cleaned = clean(raw);

        if let Some(&idx) = self.index.get(&cleaned) {
            return self.entries[idx].1;
        }

        for (key, category) in &self.entries {
            if cleaned.contains(key.as_str()) {
                return *category;
            }
        }

        ProductCategory::Unknown
    }
}

fn keyword_bucket(label: &str) -> Option<ProductCategory> {
    if ENTREE_KEYWORDS.iter().any(|k| label.contains(k)) {
        Some(Entrees)
    } else if BEVERAGE_KEYWORDS.iter().any(|k| label.contains(k)) {
        Some(Beverages)
    } else if ALCOHOL_KEYWORDS.iter().any(|k| label.contains(k)) {
        Some(Alcohol)
    } else if SIDE_KEYWORDS.iter().any(|k| label.contains(k)) {
        // "appet"/"appit" distinguishes appetizers from plain sides
        if label.contains("appet") || label.contains("appit") {
            Some(Appetizers)
        } else {
            Some(Sides)
        }
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_set(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|s| clean(s)).collect()
    }

    #[test]
    fn base_table_exact_synonyms() {
        let mapping = CategoryMapping::base();
        assert_eq!(mapping.normalize("Burger"), Burgers);
        assert_eq!(mapping.normalize("Wraps"), Sandwiches);
        assert_eq!(mapping.normalize("Beer & Wine 🍺"), Alcohol);
    }

    #[test]
    fn substring_lookup_handles_compound_labels() {
        let mapping = CategoryMapping::base();
        assert_eq!(mapping.normalize("burger combo"), Burgers);
        assert_eq!(mapping.normalize("house salad bar"), Salads);
    }

    #[test]
    fn unmatched_labels_degrade_to_unknown() {
        let mapping = CategoryMapping::base();
        assert_eq!(mapping.normalize("miscellaneous"), Unknown);
        assert_eq!(mapping.normalize(""), Unknown);
    }

    #[test]
    fn learned_labels_use_substring_relation_against_base() {
        let mut mapping = CategoryMapping::base();
        mapping.learn(&raw_set(&["italian pasta dishes"]));
        assert_eq!(mapping.normalize("italian pasta dishes"), Entrees);
    }

    #[test]
    fn learned_labels_fall_through_to_keyword_buckets() {
        let mut mapping = CategoryMapping::base();
        mapping.learn(&raw_set(&["steaks"]));
        // no substring relation with the base table; "steak" keyword applies
        assert_eq!(mapping.normalize("steaks"), Entrees);
    }

    #[test]
    fn keyword_buckets_cover_the_heuristic_tiers() {
        let mut mapping = CategoryMapping::base();
        mapping.learn(&raw_set(&[
            "wood-fired meats",
            "fresh juices",
            "craft spirits",
            "shareable appetizer plates",
            "side orders",
        ]));
        assert_eq!(mapping.normalize("wood-fired meats"), Entrees);
        assert_eq!(mapping.normalize("fresh juices"), Beverages);
        assert_eq!(mapping.normalize("craft spirits"), Alcohol);
        assert_eq!(mapping.normalize("shareable appetizer plates"), Appetizers);
        assert_eq!(mapping.normalize("side orders"), Sides);
    }

    #[test]
    fn learning_accumulates_across_sources() {
        let mut mapping = CategoryMapping::base();
        mapping.learn(&raw_set(&["fresh juices"]));
        let size_after_first = mapping.len();
        mapping.learn(&raw_set(&["craft spirits"]));
        // First source's learned entry survives the second source's pass
        assert!(mapping.len() > size_after_first);
        assert_eq!(mapping.normalize("fresh juices"), Beverages);
        assert_eq!(mapping.normalize("craft spirits"), Alcohol);
    }

    #[test]
    fn mapping_is_deterministic_across_runs() {
        let labels = raw_set(&["steaks", "fresh juices", "side orders", "mystery"]);
        let mut a = CategoryMapping::base();
        let mut b = CategoryMapping::base();
        a.learn(&labels);
        b.learn(&labels);
        assert_eq!(a.entries, b.entries);
    }
}
