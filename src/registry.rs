//! In-memory identity map shared by all source adapters.
//!
//! Locations are deduplicated by canonical name; products are materialized
//! only after entity resolution has settled every canonical_name rewrite.

use std::collections::BTreeMap;

use tracing::debug;

use crate::constants::DEFAULT_TIMEZONE;
use crate::domain::{Location, Order, OrderItem, Product, ProductCategory};

/// Metadata a source may report for a location. Every field is optional; the
/// merge policy is fill-only-unset, so the first source to report a field
/// wins and later sources never overwrite it.
#[derive(Debug, Clone, Default)]
pub struct LocationMeta {
    pub timezone: Option<String>,
    pub address_line_1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Default)]
pub struct Registry {
    /// Locations keyed by canonical name, the only merge key.
    pub locations: BTreeMap<String, Location>,
    /// Products keyed by (canonical name, category); empty until
    /// [`Registry::materialize_products`] runs.
    pub products: BTreeMap<(String, ProductCategory), Product>,
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the location for this canonical name, creating a blank one on
    /// first sighting. Metadata merging is a separate operation.
    pub fn get_or_create_location(&mut self, canonical_name: &str) -> &mut Location {
        self.locations
            .entry(canonical_name.to_string())
            .or_insert_with(|| {
                debug!(location = canonical_name, "Creating location");
                Location::new(canonical_name)
            })
    }

    /// Fill unset location fields from source-reported metadata. Fields a
    /// previous source already set are left alone. The timezone starts at the
    /// default zone and is replaced only while still at that default.
    pub fn merge_location_fields(location: &mut Location, meta: &LocationMeta) {
        if let Some(tz) = &meta.timezone {
            if location.timezone == DEFAULT_TIMEZONE && tz != DEFAULT_TIMEZONE {
                location.timezone = tz.clone();
            }
        }
        if location.address_line_1.is_none() {
            location.address_line_1 = meta.address_line_1.clone();
        }
        if location.city.is_none() {
            location.city = meta.city.clone();
        }
        if location.state.is_none() {
            location.state = meta.state.clone();
        }
        if location.zip_code.is_none() {
            location.zip_code = meta.zip_code.clone();
        }
        if let Some(country) = &meta.country {
            location.country = country.clone();
        }
    }

    /// Timezone of a known location, or the default zone.
    pub fn location_timezone(&self, canonical_name: &str) -> String {
        self.locations
            .get(canonical_name)
            .map(|l| l.timezone.clone())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string())
    }

    /// Canonical-name → timezone map for the export side channel.
    pub fn location_timezone_map(&self) -> BTreeMap<String, String> {
        self.locations
            .iter()
            .map(|(name, location)| (name.clone(), location.timezone.clone()))
            .collect()
    }

    /// Build Product identities from the order items' final canonical names
    /// and bind each item to its product.
    ///
    /// Must run exactly once, after entity resolution and the category
    /// conflict pass have completed for ALL sources; materializing earlier
    /// yields orphaned and duplicate identities. Any previously materialized
    /// products are discarded first (they carry pre-resolution names).
    pub fn materialize_products(&mut self) {
        self.products.clear();

        for item in &mut self.order_items {
            let key = (item.canonical_name.clone(), item.category);
            let product = self
                .products
                .entry(key)
                .or_insert_with(|| Product::new(&item.canonical_name, item.category));
            item.product_id = Some(product.id);
        }

        debug!(products = self.products.len(), "Materialized products");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceSystem;

    fn meta(city: &str, tz: &str) -> LocationMeta {
        LocationMeta {
            timezone: Some(tz.to_string()),
            city: Some(city.to_string()),
            ..Default::default()
        }
    }

    fn item(name: &str, category: ProductCategory) -> OrderItem {
        OrderItem {
            id: None,
            order_id: "TOAST_x".to_string(),
            product_id: None,
            item_name: name.to_string(),
            canonical_name: name.to_string(),
            category,
            quantity: 1,
            unit_price_cents: 100,
            total_price_cents: 100,
        }
    }

    #[test]
    fn locations_merge_by_canonical_name() {
        let mut registry = Registry::new();
        registry.get_or_create_location("Downtown");
        registry.get_or_create_location("Downtown");
        assert_eq!(registry.locations.len(), 1);
    }

    #[test]
    fn first_writer_sets_fields_later_writers_fill_only_unset() {
        let mut registry = Registry::new();
        {
            let location = registry.get_or_create_location("Downtown");
            location.set_source_id(SourceSystem::Toast, "loc_downtown_001");
            Registry::merge_location_fields(location, &meta("Seattle", "America/Los_Angeles"));
        }
        {
            let location = registry.get_or_create_location("Downtown");
            location.set_source_id(SourceSystem::DoorDash, "str_downtown_001");
            Registry::merge_location_fields(location, &meta("Portland", "America/Denver"));
        }

        let location = &registry.locations["Downtown"];
        assert_eq!(location.city.as_deref(), Some("Seattle"));
        assert_eq!(location.timezone, "America/Los_Angeles");
        // source id slots are per-source, both populated
        assert!(location.toast_id.is_some());
        assert!(location.doordash_id.is_some());
    }

    #[test]
    fn materialize_binds_items_and_dedups_by_name_and_category() {
        let mut registry = Registry::new();
        registry.order_items.push(item("churros", ProductCategory::Desserts));
        registry.order_items.push(item("churros", ProductCategory::Desserts));
        registry.order_items.push(item("churros", ProductCategory::Beverages));

        registry.materialize_products();

        assert_eq!(registry.products.len(), 2);
        let first = registry.order_items[0].product_id.unwrap();
        let second = registry.order_items[1].product_id.unwrap();
        let third = registry.order_items[2].product_id.unwrap();
        assert_eq!(first, second);
        assert_ne!(first, third);
    }

    #[test]
    fn rematerializing_discards_stale_products() {
        let mut registry = Registry::new();
        registry.order_items.push(item("hashbrowns", ProductCategory::Sides));
        registry.materialize_products();

        // Simulate a post-hoc name rewrite followed by re-materialization
        registry.order_items[0].canonical_name = "hash browns".to_string();
        registry.materialize_products();

        assert_eq!(registry.products.len(), 1);
        assert!(registry
            .products
            .contains_key(&("hash browns".to_string(), ProductCategory::Sides)));
    }
}
