//! Side-channel exports of the cleaned dataset: CSV files for verification
//! and a canonical-name to timezone map for downstream consumers.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::registry::Registry;

/// Write `cleaned_orders.csv` and `cleaned_order_items.csv` to `output_dir`.
pub fn export_csv(registry: &Registry, output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)?;

    let mut orders = csv::Writer::from_path(output_dir.join("cleaned_orders.csv"))?;
    orders.write_record([
        "order_id",
        "source_system",
        "location_name",
        "external_order_id",
        "timestamp_utc",
        "business_date",
        "hour_of_day",
        "day_of_week",
        "order_type",
        "total_amount_cents",
        "subtotal_amount_cents",
        "tax_amount_cents",
        "tip_amount_cents",
        "net_revenue_cents",
        "fee_amount_cents",
        "payment_method",
        "card_brand",
        "status",
    ])?;
    for order in &registry.orders {
        let record: [String; 18] = [
            order.order_id.clone(),
            order.source_system.as_str().to_string(),
            order.location_name.clone(),
            order.external_order_id.clone(),
            order.timestamp_utc.to_rfc3339(),
            order.business_date.to_string(),
            order.hour_of_day.to_string(),
            order.day_of_week.to_string(),
            order.order_type.as_str().to_string(),
            order.total_amount_cents.to_string(),
            order.subtotal_amount_cents.to_string(),
            order.tax_amount_cents.to_string(),
            order.tip_amount_cents.to_string(),
            order.net_revenue_cents.to_string(),
            order.fee_amount_cents.to_string(),
            order.payment_method.clone().unwrap_or_default(),
            order.card_brand.clone().unwrap_or_default(),
            order.status.as_str().to_string(),
        ];
        orders.write_record(&record)?;
    }
    orders.flush()?;

    let mut items = csv::Writer::from_path(output_dir.join("cleaned_order_items.csv"))?;
    items.write_record([
        "order_id",
        "product_id",
        "item_name",
        "canonical_name",
        "category",
        "quantity",
        "unit_price_cents",
        "total_price_cents",
    ])?;
    for item in &registry.order_items {
        let record: [String; 8] = [
            item.order_id.clone(),
            item.product_id.map(|id| id.to_string()).unwrap_or_default(),
            item.item_name.clone(),
            item.canonical_name.clone(),
            item.category.as_str().to_string(),
            item.quantity.to_string(),
            item.unit_price_cents.to_string(),
            item.total_price_cents.to_string(),
        ];
        items.write_record(&record)?;
    }
    items.flush()?;

    info!(
        orders = registry.orders.len(),
        items = registry.order_items.len(),
        "Exported cleaned CSV files"
    );
    Ok(())
}

/// Write `location_timezones.json`, skipped when no locations were seen.
pub fn export_timezone_map(registry: &Registry, output_dir: &Path) -> Result<()> {
    let map = registry.location_timezone_map();
    if map.is_empty() {
        return Ok(());
    }
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join("location_timezones.json");
    fs::write(&path, serde_json::to_string_pretty(&map)?)?;
    info!(locations = map.len(), "Exported location timezone map");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Location;

    #[test]
    fn timezone_map_export_writes_json() {
        let mut registry = Registry::new();
        let mut loc = Location::new("Downtown");
        loc.timezone = "America/Chicago".to_string();
        registry.locations.insert("Downtown".to_string(), loc);

        let dir = tempfile::tempdir().unwrap();
        export_timezone_map(&registry, dir.path()).unwrap();

        let raw = fs::read_to_string(dir.path().join("location_timezones.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["Downtown"], "America/Chicago");
    }

    #[test]
    fn empty_registry_skips_timezone_export() {
        let registry = Registry::new();
        let dir = tempfile::tempdir().unwrap();
        export_timezone_map(&registry, dir.path()).unwrap();
        assert!(!dir.path().join("location_timezones.json").exists());
    }

    #[test]
    fn csv_export_writes_headers_even_when_empty() {
        let registry = Registry::new();
        let dir = tempfile::tempdir().unwrap();
        export_csv(&registry, dir.path()).unwrap();

        let orders = fs::read_to_string(dir.path().join("cleaned_orders.csv")).unwrap();
        assert!(orders.starts_with("order_id,source_system"));
        let items = fs::read_to_string(dir.path().join("cleaned_order_items.csv")).unwrap();
        assert!(items.starts_with("order_id,product_id"));
    }
}
