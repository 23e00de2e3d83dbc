//! Adapter for the delivery marketplace export (DoorDash).
//!
//! One export file carries stores and orders. Marketplace orders settle
//! through a payout, so net revenue here is the merchant payout rather than
//! the subtotal, and the platform commission is recorded as a fee.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use tracing::info;

use crate::categories::CategoryMapping;
use crate::constants::fallback_location_name;
use crate::domain::{Order, OrderItem, OrderStatus, OrderType, SourceSystem};
use crate::error::Result;
use crate::normalize::{clean, extract_baked_quantity, normalize_timestamp, project_local, to_cents};
use crate::registry::{LocationMeta, Registry};

use super::{derive_unit_price, get_array, get_non_empty, get_str};

const SOURCE: SourceSystem = SourceSystem::DoorDash;

fn map_order_type(fulfillment_method: &str) -> OrderType {
    // MERCHANT_DELIVERY, MARKETPLACE_DELIVERY, ... all carry DELIVERY
    if fulfillment_method.to_uppercase().contains("DELIVERY") {
        OrderType::Delivery
    } else {
        OrderType::Pickup
    }
}

fn map_status(order_status: &str) -> OrderStatus {
    match order_status {
        "DELIVERED" | "PICKED_UP" | "COMPLETED" | "FULFILLED" => OrderStatus::Completed,
        other => OrderStatus::from_raw(other),
    }
}

/// Per-item category labels, cleaned, across every order in the export.
fn collect_categories(payload: &Value) -> BTreeSet<String> {
    let mut categories = BTreeSet::new();
    for order in get_array(payload, "orders") {
        for item in get_array(order, "order_items") {
            if let Some(category) = get_non_empty(item, "category") {
                categories.insert(clean(category));
            }
        }
    }
    categories
}

pub fn process(payload: &Value, mapping: &mut CategoryMapping, registry: &mut Registry) -> Result<()> {
    mapping.learn(&collect_categories(payload));

    let mut store_names: HashMap<String, String> = HashMap::new();
    for store in get_array(payload, "stores") {
        let (store_id, name) = match (get_non_empty(store, "store_id"), get_non_empty(store, "name")) {
            (Some(id), Some(name)) => (id, name),
            _ => continue,
        };
        store_names.insert(store_id.to_string(), name.to_string());

        let address = store.get("address").cloned().unwrap_or(Value::Null);
        let meta = LocationMeta {
            timezone: get_non_empty(store, "timezone").map(str::to_string),
            address_line_1: get_str(&address, "street").map(str::to_string),
            city: get_str(&address, "city").map(str::to_string),
            state: get_str(&address, "state").map(str::to_string),
            zip_code: get_str(&address, "zip_code").map(str::to_string),
            country: get_str(&address, "country").map(str::to_string),
        };
        let location = registry.get_or_create_location(name);
        location.set_source_id(SOURCE, store_id);
        Registry::merge_location_fields(location, &meta);
    }

    let mut order_count = 0usize;
    for order in get_array(payload, "orders") {
        let external_id = get_str(order, "external_delivery_id").unwrap_or_default();
        let order_id = SOURCE.format_order_id(external_id);

        let store_id = get_str(order, "store_id").unwrap_or_default();
        let location_name = match store_names.get(store_id) {
            Some(name) => name.clone(),
            None => {
                let name = fallback_location_name(store_id).to_string();
                let location = registry.get_or_create_location(&name);
                location.set_source_id(SOURCE, store_id);
                name
            }
        };
        let timezone = registry.location_timezone(&location_name);

        let timestamp_utc = normalize_timestamp(get_str(order, "created_at").unwrap_or_default());
        let local = project_local(timestamp_utc, &timezone);

        let fulfillment = get_str(order, "order_fulfillment_method").unwrap_or("MERCHANT_DELIVERY");
        let status = map_status(get_str(order, "order_status").unwrap_or("DELIVERED"));

        registry.orders.push(Order {
            id: None,
            order_id: order_id.clone(),
            source_system: SOURCE,
            location_name,
            external_order_id: external_id.to_string(),
            timestamp_utc,
            business_date: local.business_date,
            hour_of_day: local.hour_of_day,
            day_of_week: local.day_of_week,
            order_type: map_order_type(fulfillment),
            total_amount_cents: to_cents(order.get("total_charged_to_consumer").unwrap_or(&Value::Null)),
            subtotal_amount_cents: to_cents(order.get("order_subtotal").unwrap_or(&Value::Null)),
            tax_amount_cents: to_cents(order.get("tax_amount").unwrap_or(&Value::Null)),
            tip_amount_cents: to_cents(order.get("dasher_tip").unwrap_or(&Value::Null)),
            // What the marketplace actually pays out, after commission
            net_revenue_cents: to_cents(order.get("merchant_payout").unwrap_or(&Value::Null)),
            fee_amount_cents: to_cents(order.get("commission").unwrap_or(&Value::Null)),
            // Marketplace orders always settle by card
            payment_method: Some("CREDIT".to_string()),
            card_brand: None,
            status,
            created_at: chrono::Utc::now(),
        });
        order_count += 1;

        for item in get_array(order, "order_items") {
            let raw_name = get_non_empty(item, "name").unwrap_or("Unknown");
            let quantity = item.get("quantity").and_then(Value::as_i64).unwrap_or(1);
            let (canonical_name, adj_qty) = extract_baked_quantity(raw_name, quantity);

            let category = mapping.normalize(get_str(item, "category").unwrap_or("unknown"));
            let total_price = to_cents(item.get("total_price").unwrap_or(&Value::Null));

            registry.order_items.push(OrderItem {
                id: None,
                order_id: order_id.clone(),
                product_id: None,
                item_name: raw_name.to_string(),
                canonical_name,
                category,
                quantity: adj_qty,
                unit_price_cents: derive_unit_price(total_price, adj_qty),
                total_price_cents: total_price,
            });
        }
    }

    info!(orders = order_count, "Processed DoorDash export");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductCategory;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "stores": [{
                "store_id": "str_downtown_001",
                "name": "Downtown",
                "timezone": "America/Chicago",
                "address": {"street": "1 Main St", "city": "Austin", "state": "TX", "zip_code": "78701", "country": "US"}
            }],
            "orders": [{
                "external_delivery_id": "abc",
                "store_id": "str_downtown_001",
                "created_at": "2024-01-15T18:30:00Z",
                "order_fulfillment_method": "MERCHANT_DELIVERY",
                "order_status": "DELIVERED",
                "total_charged_to_consumer": "15.50",
                "order_subtotal": 1200,
                "tax_amount": 100,
                "dasher_tip": 250,
                "merchant_payout": 1020,
                "commission": 180,
                "order_items": [{
                    "name": "Churros 6pc",
                    "quantity": 1,
                    "category": "Desserts",
                    "total_price": 900
                }]
            }]
        })
    }

    #[test]
    fn marketplace_money_semantics() {
        let mut mapping = CategoryMapping::base();
        let mut registry = Registry::new();
        process(&payload(), &mut mapping, &mut registry).unwrap();

        let order = &registry.orders[0];
        assert_eq!(order.order_id, "DD_abc");
        assert_eq!(order.total_amount_cents, 1550);
        assert_eq!(order.net_revenue_cents, 1020);
        assert_eq!(order.fee_amount_cents, 180);
        assert_eq!(order.payment_method.as_deref(), Some("CREDIT"));
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.order_type, OrderType::Delivery);
    }

    #[test]
    fn baked_quantity_rewrites_item_economics() {
        let mut mapping = CategoryMapping::base();
        let mut registry = Registry::new();
        process(&payload(), &mut mapping, &mut registry).unwrap();

        let item = &registry.order_items[0];
        assert_eq!(item.canonical_name, "churros");
        assert_eq!(item.category, ProductCategory::Desserts);
        assert_eq!(item.quantity, 6);
        assert_eq!(item.unit_price_cents, 150);
        assert_eq!(item.total_price_cents, 900);
    }

    #[test]
    fn local_projection_uses_store_timezone() {
        let mut mapping = CategoryMapping::base();
        let mut registry = Registry::new();
        process(&payload(), &mut mapping, &mut registry).unwrap();

        let order = &registry.orders[0];
        // 18:30 UTC is 12:30 in Chicago, Monday
        assert_eq!(order.hour_of_day, 12);
        assert_eq!(order.day_of_week, 1);
        assert_eq!(order.business_date.to_string(), "2024-01-15");
    }

    #[test]
    fn pickup_orders_stay_pickup() {
        assert_eq!(map_order_type("PICKUP"), OrderType::Pickup);
        assert_eq!(map_order_type("MARKETPLACE_DELIVERY"), OrderType::Delivery);
    }

    #[test]
    fn terminal_marketplace_statuses_unify_to_completed() {
        assert_eq!(map_status("DELIVERED"), OrderStatus::Completed);
        assert_eq!(map_status("PICKED_UP"), OrderStatus::Completed);
        assert_eq!(map_status("CANCELLED"), OrderStatus::Cancelled);
    }
}
