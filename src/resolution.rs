//! Fuzzy entity resolution over cleaned item names.
//!
//! After cleaning, the same product still appears under near-variant names
//! ("bbq bacon burger" vs "bbq bacon burgers"). Variants are folded into the
//! most frequent spelling within a category using token-sort similarity.

use std::collections::{HashMap, HashSet};

use rapidfuzz::fuzz;
use tracing::{debug, info};

use crate::domain::{OrderItem, ProductCategory};

/// Similarity scores strictly above this merge a variant into its anchor.
const SIMILARITY_THRESHOLD: f64 = 88.0;

/// Token-sort similarity: split on whitespace, sort tokens, compare the
/// rejoined strings. Word-order variants ("bacon bbq burger" vs
/// "bbq bacon burger") score 100. Scale is 0-100.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let sorted = |s: &str| {
        let mut tokens: Vec<&str> = s.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    };
    let left = sorted(a);
    let right = sorted(b);
    // fuzz::ratio is normalized 0.0-1.0; callers compare on a 0-100 scale.
    fuzz::ratio(left.chars(), right.chars()) * 100.0
}

/// Fold near-variant item names into their most frequent spelling, rewriting
/// `canonical_name` in place. Only names within the same category are
/// compared; a variant merges when its token-sort score against the anchor
/// strictly exceeds the threshold.
///
/// Anchors are chosen by descending frequency; ties keep first-appearance
/// order, so the result is deterministic for a given item sequence.
pub fn resolve_product_names(items: &mut [OrderItem]) {
    let mut counts: HashMap<(String, ProductCategory), usize> = HashMap::new();
    let mut groups: Vec<(String, ProductCategory)> = Vec::new();
    for item in items.iter() {
        let key = (item.canonical_name.clone(), item.category);
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            groups.push(key);
        }
        *count += 1;
    }

    // Stable sort: equal frequencies keep first-appearance order.
    groups.sort_by(|a, b| counts[b].cmp(&counts[a]));

    let mut claimed: HashSet<usize> = HashSet::new();
    let mut rewrites: HashMap<(String, ProductCategory), String> = HashMap::new();

    for i in 0..groups.len() {
        if claimed.contains(&i) {
            continue;
        }
        claimed.insert(i);
        let (anchor_name, anchor_category) = groups[i].clone();

        for j in 0..groups.len() {
            if claimed.contains(&j) {
                continue;
            }
            let (candidate_name, candidate_category) = &groups[j];
            if *candidate_category != anchor_category {
                continue;
            }
            let score = token_sort_ratio(&anchor_name, candidate_name);
            if score > SIMILARITY_THRESHOLD {
                debug!(
                    variant = candidate_name.as_str(),
                    anchor = anchor_name.as_str(),
                    score,
                    "Merging name variant"
                );
                claimed.insert(j);
                rewrites.insert(groups[j].clone(), anchor_name.clone());
            }
        }
    }

    if !rewrites.is_empty() {
        info!(merged = rewrites.len(), "Resolved product name variants");
    }

    for item in items.iter_mut() {
        let key = (item.canonical_name.clone(), item.category);
        if let Some(anchor) = rewrites.get(&key) {
            item.canonical_name = anchor.clone();
        }
    }
}

/// Category override pass: any item whose resolved name contains "burger" is
/// forced into the BURGERS category, whatever the source taxonomy said.
pub fn resolve_category_conflicts(items: &mut [OrderItem]) {
    let mut moved = 0usize;
    for item in items.iter_mut() {
        if item.canonical_name.contains("burger") && item.category != ProductCategory::Burgers {
            item.category = ProductCategory::Burgers;
            moved += 1;
        }
    }
    if moved > 0 {
        info!(moved, "Reassigned burger-named items to the burgers category");
    }
}
