//! Adapter for the full-service POS export (Toast).
//!
//! One export file carries locations and orders; each order holds one or more
//! checks, and every check becomes one unified Order. Items live on checks as
//! selections, categorized by their item group.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use tracing::info;

use crate::categories::CategoryMapping;
use crate::constants::fallback_location_name;
use crate::domain::{Order, OrderItem, OrderStatus, OrderType, SourceSystem};
use crate::error::Result;
use crate::normalize::{
    clean, extract_baked_quantity, normalize_timestamp, parse_business_date, project_local,
    to_cents,
};
use crate::registry::{LocationMeta, Registry};

use super::{derive_unit_price, get_array, get_non_empty, get_str};

const SOURCE: SourceSystem = SourceSystem::Toast;

fn map_order_type(dining_behavior: &str) -> OrderType {
    match dining_behavior {
        "TAKE_OUT" => OrderType::TakeOut,
        "DELIVERY" => OrderType::Delivery,
        _ => OrderType::DineIn,
    }
}

/// Item-group names, cleaned, across every selection in the export.
fn collect_categories(payload: &Value) -> BTreeSet<String> {
    let mut categories = BTreeSet::new();
    for order in get_array(payload, "orders") {
        for check in get_array(order, "checks") {
            for selection in get_array(check, "selections") {
                if let Some(group) = selection.get("itemGroup") {
                    if let Some(name) = get_non_empty(group, "name") {
                        categories.insert(clean(name));
                    }
                }
            }
        }
    }
    categories
}

pub fn process(payload: &Value, mapping: &mut CategoryMapping, registry: &mut Registry) -> Result<()> {
    mapping.learn(&collect_categories(payload));

    // guid -> canonical name, for resolving orders to locations
    let mut location_names: HashMap<String, String> = HashMap::new();
    for loc in get_array(payload, "locations") {
        let (guid, name) = match (get_non_empty(loc, "guid"), get_non_empty(loc, "name")) {
            (Some(guid), Some(name)) => (guid, name),
            _ => continue,
        };
        location_names.insert(guid.to_string(), name.to_string());

        let address = loc.get("address").cloned().unwrap_or(Value::Null);
        let meta = LocationMeta {
            timezone: get_non_empty(loc, "timezone").map(str::to_string),
            address_line_1: get_str(&address, "line1").map(str::to_string),
            city: get_str(&address, "city").map(str::to_string),
            state: get_str(&address, "state").map(str::to_string),
            zip_code: get_str(&address, "zip").map(str::to_string),
            country: get_str(&address, "country").map(str::to_string),
        };
        let location = registry.get_or_create_location(name);
        location.set_source_id(SOURCE, guid);
        Registry::merge_location_fields(location, &meta);
    }

    let mut order_count = 0usize;
    for order in get_array(payload, "orders") {
        let restaurant_guid = get_str(order, "restaurantGuid").unwrap_or_default();
        let location_name = match location_names.get(restaurant_guid) {
            Some(name) => name.clone(),
            None => {
                let name = fallback_location_name(restaurant_guid).to_string();
                let location = registry.get_or_create_location(&name);
                location.set_source_id(SOURCE, restaurant_guid);
                name
            }
        };
        let timezone = registry.location_timezone(&location_name);

        for check in get_array(order, "checks") {
            let check_guid = get_str(check, "guid").unwrap_or_default();
            let order_id = SOURCE.format_order_id(check_guid);

            let payment = get_array(check, "payments").first().cloned().unwrap_or(Value::Null);

            // Settlement time wins; fall back to close, then open.
            let raw_timestamp = get_non_empty(check, "paidDate")
                .or_else(|| get_non_empty(check, "closedDate"))
                .or_else(|| get_non_empty(order, "openedDate"))
                .unwrap_or_default();
            let timestamp_utc = normalize_timestamp(raw_timestamp);
            let local = project_local(timestamp_utc, &timezone);

            // The source's own business date takes precedence over the derived one
            let business_date = order
                .get("businessDate")
                .and_then(parse_business_date)
                .unwrap_or(local.business_date);

            let dining_behavior = order
                .get("diningOption")
                .and_then(|o| get_str(o, "behavior"))
                .unwrap_or("DINE_IN");

            let subtotal = to_cents(check.get("amount").unwrap_or(&Value::Null));
            let voided = check.get("voided").and_then(Value::as_bool).unwrap_or(false);

            let order_instance = Order {
                id: None,
                order_id: order_id.clone(),
                source_system: SOURCE,
                location_name: location_name.clone(),
                external_order_id: get_str(order, "guid").unwrap_or_default().to_string(),
                timestamp_utc,
                business_date,
                hour_of_day: local.hour_of_day,
                day_of_week: local.day_of_week,
                order_type: map_order_type(dining_behavior),
                total_amount_cents: to_cents(check.get("totalAmount").unwrap_or(&Value::Null)),
                subtotal_amount_cents: subtotal,
                tax_amount_cents: to_cents(check.get("taxAmount").unwrap_or(&Value::Null)),
                tip_amount_cents: to_cents(check.get("tipAmount").unwrap_or(&Value::Null)),
                // No platform fee on the POS side; net revenue is the subtotal
                net_revenue_cents: subtotal,
                fee_amount_cents: 0,
                payment_method: Some(get_str(&payment, "type").unwrap_or("UNKNOWN").to_string()),
                card_brand: get_str(&payment, "cardType").map(str::to_string),
                status: if voided { OrderStatus::Voided } else { OrderStatus::Completed },
                created_at: chrono::Utc::now(),
            };
            registry.orders.push(order_instance);
            order_count += 1;

            for selection in get_array(check, "selections") {
                if selection.get("voided").and_then(Value::as_bool).unwrap_or(false) {
                    continue;
                }

                let raw_name = get_non_empty(selection, "displayName")
                    .or_else(|| selection.get("item").and_then(|i| get_non_empty(i, "name")))
                    .unwrap_or("Unknown");
                let quantity = selection.get("quantity").and_then(Value::as_i64).unwrap_or(1);
                let (canonical_name, adj_qty) = extract_baked_quantity(raw_name, quantity);

                let group_name = selection
                    .get("itemGroup")
                    .and_then(|g| get_str(g, "name"))
                    .unwrap_or("unknown");
                let category = mapping.normalize(group_name);

                // price on a selection is the charged line total
                let total_price = to_cents(selection.get("price").unwrap_or(&Value::Null));

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
    }

    info!(orders = order_count, "Processed Toast export");
    Ok(())
}
