use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_COUNTRY, DEFAULT_TIMEZONE};

/// Order fulfillment types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    DineIn,
    TakeOut,
    Pickup,
    Delivery,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::DineIn => "DINE_IN",
            OrderType::TakeOut => "TAKE_OUT",
            OrderType::Pickup => "PICKUP",
            OrderType::Delivery => "DELIVERY",
        }
    }
}

/// Source system identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceSystem {
    Toast,
    DoorDash,
    Square,
}

impl SourceSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSystem::Toast => "Toast",
            SourceSystem::DoorDash => "DoorDash",
            SourceSystem::Square => "Square",
        }
    }

    /// Prefix used when building the composite order natural key.
    pub fn order_id_prefix(&self) -> &'static str {
        match self {
            SourceSystem::Toast => "TOAST",
            SourceSystem::DoorDash => "DD",
            SourceSystem::Square => "SQ",
        }
    }

    /// Format the composite order id `{PREFIX}_{native_id}`.
    pub fn format_order_id(&self, external_id: &str) -> String {
        format!("{}_{}", self.order_id_prefix(), external_id)
    }
}

/// Order status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Completed,
    Cancelled,
    Refunded,
    Voided,
    Delivered,
    Fulfilled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
            OrderStatus::Voided => "VOIDED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Fulfilled => "FULFILLED",
        }
    }

    /// Map a raw status string onto the unified vocabulary. Values outside the
    /// vocabulary degrade to COMPLETED rather than failing.
    pub fn from_raw(raw: &str) -> Self {
        match raw.to_uppercase().as_str() {
            "CANCELLED" => OrderStatus::Cancelled,
            "REFUNDED" => OrderStatus::Refunded,
            "VOIDED" => OrderStatus::Voided,
            "DELIVERED" => OrderStatus::Delivered,
            "FULFILLED" => OrderStatus::Fulfilled,
            _ => OrderStatus::Completed,
        }
    }
}

/// Unified product categories: the closed target vocabulary that all three
/// source taxonomies are merged into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    Burgers,
    Sandwiches,
    Sides,
    Appetizers,
    Beverages,
    Breakfast,
    Entrees,
    Salads,
    Desserts,
    Alcohol,
    Unknown,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Burgers => "burgers",
            ProductCategory::Sandwiches => "sandwiches",
            ProductCategory::Sides => "sides",
            ProductCategory::Appetizers => "appetizers",
            ProductCategory::Beverages => "beverages",
            ProductCategory::Breakfast => "breakfast",
            ProductCategory::Entrees => "entrees",
            ProductCategory::Salads => "salads",
            ProductCategory::Desserts => "desserts",
            ProductCategory::Alcohol => "alcohol",
            ProductCategory::Unknown => "unknown",
        }
    }
}

/// Total category parse: any value outside the closed enumeration yields
/// UNKNOWN instead of an error.
pub fn parse_category(value: &str) -> ProductCategory {
    match value {
        "burgers" => ProductCategory::Burgers,
        "sandwiches" => ProductCategory::Sandwiches,
        "sides" => ProductCategory::Sides,
        "appetizers" => ProductCategory::Appetizers,
        "beverages" => ProductCategory::Beverages,
        "breakfast" => ProductCategory::Breakfast,
        "entrees" => ProductCategory::Entrees,
        "salads" => ProductCategory::Salads,
        "desserts" => ProductCategory::Desserts,
        "alcohol" => ProductCategory::Alcohol,
        _ => ProductCategory::Unknown,
    }
}

/// A physical restaurant/retail location. Canonical name is the only merge
/// key: every source reporting the same name resolves to one Location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Option<Uuid>,
    pub canonical_name: String,
    pub toast_id: Option<String>,
    pub doordash_id: Option<String>,
    pub square_id: Option<String>,
    pub address_line_1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: String,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub fn new(canonical_name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            canonical_name: canonical_name.to_string(),
            toast_id: None,
            doordash_id: None,
            square_id: None,
            address_line_1: None,
            city: None,
            state: None,
            zip_code: None,
            country: DEFAULT_COUNTRY.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record this location's external identifier for one source system.
    pub fn set_source_id(&mut self, source: SourceSystem, source_id: &str) {
        let slot = match source {
            SourceSystem::Toast => &mut self.toast_id,
            SourceSystem::DoorDash => &mut self.doordash_id,
            SourceSystem::Square => &mut self.square_id,
        };
        *slot = Some(source_id.to_string());
    }
}

/// One fulfilled transaction. For the Toast source this is one check within a
/// larger order, so a single source order may split into several Orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Option<Uuid>,
    /// Composite natural key: `{PREFIX}_{native_id}`.
    pub order_id: String,
    pub source_system: SourceSystem,
    /// Canonical name of the owning location; immutable after creation.
    pub location_name: String,
    pub external_order_id: String,
    pub timestamp_utc: DateTime<Utc>,
    pub business_date: NaiveDate,
    /// Local hour of day, 0-23.
    pub hour_of_day: u32,
    /// Local weekday, 0=Sunday .. 6=Saturday.
    pub day_of_week: u32,
    pub order_type: OrderType,
    pub total_amount_cents: i64,
    pub subtotal_amount_cents: i64,
    pub tax_amount_cents: i64,
    pub tip_amount_cents: i64,
    /// Defined per source: merchant payout for the marketplace, subtotal for
    /// the POS sources.
    pub net_revenue_cents: i64,
    pub fee_amount_cents: i64,
    pub payment_method: Option<String>,
    pub card_brand: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// One line item within an Order. `canonical_name` is a working name that the
/// resolution engine rewrites in place; `product_id` stays None until product
/// materialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Option<Uuid>,
    /// Composite order_id of the owning Order.
    pub order_id: String,
    pub product_id: Option<Uuid>,
    /// Raw display name as reported by the source.
    pub item_name: String,
    pub canonical_name: String,
    pub category: ProductCategory,
    pub quantity: i64,
    /// Derived from total_price_cents, never the reverse: the charged total
    /// is ground truth and `unit * quantity` need not equal it exactly.
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
}

/// A canonical product identity, keyed by (canonical name, category).
/// Materialized only after entity resolution has settled all name rewrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub canonical_name: String,
    pub category: ProductCategory,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(canonical_name: &str, category: ProductCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            canonical_name: canonical_name.to_string(),
            category,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_formatting_uses_source_prefix() {
        assert_eq!(SourceSystem::Toast.format_order_id("chk_1"), "TOAST_chk_1");
        assert_eq!(SourceSystem::DoorDash.format_order_id("abc"), "DD_abc");
        assert_eq!(SourceSystem::Square.format_order_id("ord9"), "SQ_ord9");
    }

    #[test]
    fn parse_category_is_total() {
        assert_eq!(parse_category("desserts"), ProductCategory::Desserts);
        assert_eq!(parse_category("not a category"), ProductCategory::Unknown);
        assert_eq!(parse_category(""), ProductCategory::Unknown);
    }

    #[test]
    fn status_vocabulary_roundtrips_and_degrades() {
        assert_eq!(OrderStatus::from_raw("cancelled"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::from_raw("VOIDED"), OrderStatus::Voided);
        assert_eq!(OrderStatus::from_raw("SOMETHING_ELSE"), OrderStatus::Completed);
    }

    #[test]
    fn location_source_id_slots_are_independent() {
        let mut location = Location::new("Downtown");
        location.set_source_id(SourceSystem::Toast, "loc_downtown_001");
        location.set_source_id(SourceSystem::Square, "LCN001DOWNTOWN");
        assert_eq!(location.toast_id.as_deref(), Some("loc_downtown_001"));
        assert_eq!(location.square_id.as_deref(), Some("LCN001DOWNTOWN"));
        assert!(location.doordash_id.is_none());
    }
}
