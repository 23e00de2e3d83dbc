//! Adapter for the retail POS export (Square).
//!
//! The export is split across four files: orders, a catalog of items and
//! variations, locations, and payments. Line items reference catalog object
//! ids, so names and categories come from a catalog join; variations inherit
//! the parent item's name and category. Payments are joined by order id for
//! payment method and card brand.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use tracing::info;

use crate::categories::CategoryMapping;
use crate::constants::fallback_location_name;
use crate::domain::{Order, OrderItem, OrderStatus, OrderType, ProductCategory, SourceSystem};
use crate::error::Result;
use crate::normalize::{clean, extract_baked_quantity, normalize_timestamp, project_local, to_cents};
use crate::registry::{LocationMeta, Registry};

use super::{derive_unit_price, get_array, get_non_empty, get_str};

const SOURCE: SourceSystem = SourceSystem::Square;

fn map_order_type(fulfillment_type: &str) -> OrderType {
    let upper = fulfillment_type.to_uppercase();
    if upper == "PICKUP" {
        OrderType::TakeOut
    } else if upper.contains("DELIVERY") {
        OrderType::Delivery
    } else {
        // covers DINE_IN and anything unrecognized
        OrderType::DineIn
    }
}

fn map_status(state: &str) -> OrderStatus {
    match state.to_uppercase().as_str() {
        "CANCELLED" => OrderStatus::Cancelled,
        "REFUNDED" => OrderStatus::Refunded,
        _ => OrderStatus::Completed,
    }
}

/// Square reports quantities as decimal strings ("2", "1.0").
fn parse_quantity(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::String(s)) => s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(1),
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(1),
        _ => 1,
    }
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    name: String,
    category_id: Option<String>,
}

/// Join table from catalog object id (item or variation) to display name and
/// category. Variations resolve to the parent item's name; a variation is
/// just a size or flavor, not a distinct product.
fn build_catalog_map(catalog: &Value) -> (HashMap<String, CatalogEntry>, HashMap<String, String>) {
    let objects = get_array(catalog, "objects");

    let mut category_names: HashMap<String, String> = HashMap::new();
    for obj in objects {
        if get_str(obj, "type") == Some("CATEGORY") {
            if let (Some(id), Some(data)) = (get_non_empty(obj, "id"), obj.get("category_data")) {
                if let Some(name) = get_non_empty(data, "name") {
                    category_names.insert(id.to_string(), name.to_string());
                }
            }
        }
    }

    let mut catalog_map: HashMap<String, CatalogEntry> = HashMap::new();
    for obj in objects {
        if get_str(obj, "type") != Some("ITEM") {
            continue;
        }
        let item_id = match get_non_empty(obj, "id") {
            Some(id) => id,
            None => continue,
        };
        let item_data = match obj.get("item_data") {
            Some(data) => data,
            None => continue,
        };
        let name = get_str(item_data, "name").unwrap_or_default().to_string();
        let category_id = get_non_empty(item_data, "category_id").map(str::to_string);

        catalog_map.insert(
            item_id.to_string(),
            CatalogEntry { name: name.clone(), category_id: category_id.clone() },
        );

        for variation in get_array(item_data, "variations") {
            if let Some(var_id) = get_non_empty(variation, "id") {
                catalog_map.insert(
                    var_id.to_string(),
                    CatalogEntry { name: name.clone(), category_id: category_id.clone() },
                );
            }
        }
    }

    (catalog_map, category_names)
}

pub fn process(
    orders_payload: &Value,
    catalog_payload: &Value,
    locations_payload: &Value,
    payments_payload: &Value,
    mapping: &mut CategoryMapping,
    registry: &mut Registry,
) -> Result<()> {
    let (catalog_map, category_names) = build_catalog_map(catalog_payload);

    let vocabulary: BTreeSet<String> = category_names.values().map(|n| clean(n)).collect();
    mapping.learn(&vocabulary);

    let mut location_names: HashMap<String, String> = HashMap::new();
    for loc in get_array(locations_payload, "locations") {
        let (loc_id, name) = match (get_non_empty(loc, "id"), get_non_empty(loc, "name")) {
            (Some(id), Some(name)) => (id, name),
            _ => continue,
        };
        location_names.insert(loc_id.to_string(), name.to_string());

        let address = loc.get("address").cloned().unwrap_or(Value::Null);
        let meta = LocationMeta {
            timezone: get_non_empty(loc, "timezone").map(str::to_string),
            address_line_1: get_str(&address, "address_line_1").map(str::to_string),
            city: get_str(&address, "locality").map(str::to_string),
            state: get_str(&address, "administrative_district_level_1").map(str::to_string),
            zip_code: get_str(&address, "postal_code").map(str::to_string),
            country: get_str(&address, "country").map(str::to_string),
        };
        let location = registry.get_or_create_location(name);
        location.set_source_id(SOURCE, loc_id);
        Registry::merge_location_fields(location, &meta);
    }

    // order_id -> (payment method, card brand)
    let mut payments: HashMap<String, (String, Option<String>)> = HashMap::new();
    for payment in get_array(payments_payload, "payments") {
        if let Some(order_id) = get_non_empty(payment, "order_id") {
            let method = get_str(payment, "source_type").unwrap_or("UNKNOWN").to_string();
            let card_brand = payment
                .get("card_details")
                .and_then(|d| d.get("card"))
                .and_then(|c| get_str(c, "card_brand"))
                .map(str::to_string);
            payments.insert(order_id.to_string(), (method, card_brand));
        }
    }

    let mut order_count = 0usize;
    for order in get_array(orders_payload, "orders") {
        let square_id = get_str(order, "id").unwrap_or_default();
        let order_id = SOURCE.format_order_id(square_id);

        let location_square_id = get_str(order, "location_id").unwrap_or_default();
        let location_name = match location_names.get(location_square_id) {
            Some(name) => name.clone(),
            None => {
                let name = fallback_location_name(location_square_id).to_string();
                let location = registry.get_or_create_location(&name);
                location.set_source_id(SOURCE, location_square_id);
                name
            }
        };
        let timezone = registry.location_timezone(&location_name);

        // Close time is the business event; creation time is the fallback
        let raw_timestamp = get_non_empty(order, "closed_at")
            .or_else(|| get_non_empty(order, "created_at"))
            .unwrap_or_default();
        let timestamp_utc = normalize_timestamp(raw_timestamp);
        let local = project_local(timestamp_utc, &timezone);

        let fulfillment_type = get_array(order, "fulfillments")
            .first()
            .and_then(|f| get_str(f, "type"))
            .unwrap_or("");

        let money = |key: &str| {
            to_cents(
                order
                    .get(key)
                    .and_then(|m| m.get("amount"))
                    .unwrap_or(&Value::Null),
            )
        };
        let total_amount = money("total_money");
        let tax_amount = money("total_tax_money");
        let tip_amount = money("total_tip_money");
        // The export has no subtotal field
        let subtotal = total_amount - tax_amount - tip_amount;

        let (payment_method, card_brand) = payments
            .get(square_id)
            .cloned()
            .unwrap_or_else(|| ("UNKNOWN".to_string(), None));

        registry.orders.push(Order {
            id: None,
            order_id: order_id.clone(),
            source_system: SOURCE,
            location_name,
            external_order_id: square_id.to_string(),
            timestamp_utc,
            business_date: local.business_date,
            hour_of_day: local.hour_of_day,
            day_of_week: local.day_of_week,
            order_type: map_order_type(fulfillment_type),
            total_amount_cents: total_amount,
            subtotal_amount_cents: subtotal,
            tax_amount_cents: tax_amount,
            tip_amount_cents: tip_amount,
            net_revenue_cents: subtotal,
            fee_amount_cents: 0,
            payment_method: Some(payment_method),
            card_brand,
            status: map_status(get_str(order, "state").unwrap_or("COMPLETED")),
            created_at: chrono::Utc::now(),
        });
        order_count += 1;

        for line_item in get_array(order, "line_items") {
            let catalog_entry = get_str(line_item, "catalog_object_id")
                .and_then(|id| catalog_map.get(id));

            let raw_name = match catalog_entry {
                Some(entry) if !entry.name.is_empty() => entry.name.as_str(),
                _ => get_non_empty(line_item, "name").unwrap_or("Unknown Item"),
            };
            let category = catalog_entry
                .and_then(|entry| entry.category_id.as_deref())
                .and_then(|id| category_names.get(id))
                .map(|name| mapping.normalize(name))
                .unwrap_or(ProductCategory::Unknown);

            let quantity = parse_quantity(line_item.get("quantity"));
            let (canonical_name, adj_qty) = extract_baked_quantity(raw_name, quantity);

            let total_price = to_cents(
                line_item
                    .get("gross_sales_money")
                    .and_then(|m| m.get("amount"))
                    .unwrap_or(&Value::Null),
            );

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

    info!(orders = order_count, "Processed Square export");
    Ok(())
}
