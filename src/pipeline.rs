//! End-to-end reconciliation pipeline: ingest all sources, resolve entities,
//! materialize products, export, persist.

use tracing::{error, info};

use crate::categories::CategoryMapping;
use crate::config::Config;
use crate::constants::{DOORDASH_SOURCE, SQUARE_SOURCE, TOAST_SOURCE};
use crate::error::Result;
use crate::export;
use crate::registry::Registry;
use crate::resolution::{resolve_category_conflicts, resolve_product_names};
use crate::sources::{self, read_json_file};
use crate::storage::Store;

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineSummary {
    pub locations: usize,
    pub products: usize,
    pub orders: usize,
    pub order_items: usize,
}

/// Ingest the selected source exports into the shared registry. A source that
/// fails to read or parse is logged and skipped; the remaining sources still
/// land. The category mapping accumulates across sources, so labels learned
/// from an earlier source stay in force for later ones.
pub fn ingest(
    config: &Config,
    source_names: &[String],
    mapping: &mut CategoryMapping,
    registry: &mut Registry,
) {
    let selected = |name: &str| source_names.iter().any(|s| s == name);

    if selected(TOAST_SOURCE) {
        if let Err(e) = read_json_file(&config.toast_export_path())
            .and_then(|payload| sources::toast::process(&payload, mapping, registry))
        {
            error!("Error processing Toast: {}", e);
        }
    }

    if selected(DOORDASH_SOURCE) {
        if let Err(e) = read_json_file(&config.doordash_orders_path())
            .and_then(|payload| sources::doordash::process(&payload, mapping, registry))
        {
            error!("Error processing DoorDash: {}", e);
        }
    }

    if selected(SQUARE_SOURCE) {
        if let Err(e) = ingest_square(config, mapping, registry) {
            error!("Error processing Square: {}", e);
        }
    }
}

/// All source names, in canonical ingest order.
pub fn all_source_names() -> Vec<String> {
    vec![
        TOAST_SOURCE.to_string(),
        DOORDASH_SOURCE.to_string(),
        SQUARE_SOURCE.to_string(),
    ]
}

fn ingest_square(
    config: &Config,
    mapping: &mut CategoryMapping,
    registry: &mut Registry,
) -> Result<()> {
    let orders = read_json_file(&config.square_orders_path())?;
    let catalog = read_json_file(&config.square_catalog_path())?;
    let locations = read_json_file(&config.square_locations_path())?;
    let payments = read_json_file(&config.square_payments_path())?;
    sources::square::process(&orders, &catalog, &locations, &payments, mapping, registry)
}

/// Post-ingest phase: fold name variants, settle categories, then build
/// product identities from the final names.
pub fn resolve_and_materialize(registry: &mut Registry) {
    resolve_product_names(&mut registry.order_items);
    resolve_category_conflicts(&mut registry.order_items);
    registry.materialize_products();
}

/// Persist the whole registry through the store, parents before children:
/// locations, then products, then orders, then items. Unlike per-source
/// ingest failures, a persistence failure is fatal.
pub async fn persist(registry: &Registry, store: &dyn Store) -> Result<()> {
    for location in registry.locations.values() {
        let mut location = location.clone();
        store.upsert_location(&mut location).await?;
    }
    for product in registry.products.values() {
        store.upsert_product(product).await?;
    }
    for order in &registry.orders {
        let mut order = order.clone();
        store.upsert_order(&mut order).await?;
    }
    for item in &registry.order_items {
        let mut item = item.clone();
        store.upsert_order_item(&mut item).await?;
    }

    info!(
        locations = registry.locations.len(),
        products = registry.products.len(),
        orders = registry.orders.len(),
        order_items = registry.order_items.len(),
        "Persisted registry"
    );
    Ok(())
}

/// Run the full pipeline: ingest, resolve, export, persist.
pub async fn run(
    config: &Config,
    source_names: &[String],
    store: &dyn Store,
    export_csv: bool,
) -> Result<PipelineSummary> {
    let mut mapping = CategoryMapping::base();
    let mut registry = Registry::new();

    ingest(config, source_names, &mut mapping, &mut registry);
    resolve_and_materialize(&mut registry);

    let output_dir = std::path::Path::new(&config.output_dir);
    if export_csv {
        export::export_csv(&registry, output_dir)?;
    }
    export::export_timezone_map(&registry, output_dir)?;

    persist(&registry, store).await?;

    Ok(PipelineSummary {
        locations: registry.locations.len(),
        products: registry.products.len(),
        orders: registry.orders.len(),
        order_items: registry.order_items.len(),
    })
}
