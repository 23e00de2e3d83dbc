use crate::domain::{Location, Order, OrderItem, Product};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use tracing::debug;

/// Storage trait for persisting reconciled data.
///
/// Every write is an upsert keyed by natural key, so re-running the pipeline
/// over the same exports converges instead of duplicating rows: locations by
/// canonical name, products by (canonical name, category), orders by
/// composite order id, items by (order id, item name, canonical name).
#[async_trait]
pub trait Store: Send + Sync {
    /// Ensure the backing schema exists. A no-op for backends without one.
    async fn execute_ddl(&self) -> Result<()>;

    // Location operations
    async fn upsert_location(&self, location: &mut Location) -> Result<()>;
    async fn get_location_by_name(&self, name: &str) -> Result<Option<Location>>;

    // Product operations
    async fn upsert_product(&self, product: &Product) -> Result<()>;

    // Order operations
    async fn upsert_order(&self, order: &mut Order) -> Result<()>;

    // Order item operations
    async fn upsert_order_item(&self, item: &mut OrderItem) -> Result<()>;
}

/// In-memory store implementation for development/testing
pub struct InMemoryStore {
    locations: Arc<Mutex<HashMap<String, Location>>>,
    products: Arc<Mutex<HashMap<(String, String), Product>>>,
    orders: Arc<Mutex<HashMap<String, Order>>>,
    order_items: Arc<Mutex<HashMap<(String, String, String), OrderItem>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            locations: Arc::new(Mutex::new(HashMap::new())),
            products: Arc::new(Mutex::new(HashMap::new())),
            orders: Arc::new(Mutex::new(HashMap::new())),
            order_items: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn location_count(&self) -> usize {
        self.locations.lock().unwrap().len()
    }

    pub fn product_count(&self) -> usize {
        self.products.lock().unwrap().len()
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub fn order_item_count(&self) -> usize {
        self.order_items.lock().unwrap().len()
    }

    pub fn get_order(&self, order_id: &str) -> Option<Order> {
        self.orders.lock().unwrap().get(order_id).cloned()
    }

    pub fn orders_snapshot(&self) -> Vec<Order> {
        self.orders.lock().unwrap().values().cloned().collect()
    }

    pub fn order_items_snapshot(&self) -> Vec<OrderItem> {
        self.order_items.lock().unwrap().values().cloned().collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn execute_ddl(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_location(&self, location: &mut Location) -> Result<()> {
        let mut locations = self.locations.lock().unwrap();

        if let Some(existing) = locations.get_mut(&location.canonical_name) {
            merge_location(existing, location);
            location.id = existing.id;
            debug!("Updated location: {}", location.canonical_name);
        } else {
            let id = Uuid::new_v4();
            location.id = Some(id);
            locations.insert(location.canonical_name.clone(), location.clone());
            debug!("Created location: {} with id {}", location.canonical_name, id);
        }
        Ok(())
    }

    async fn get_location_by_name(&self, name: &str) -> Result<Option<Location>> {
        let locations = self.locations.lock().unwrap();
        Ok(locations.get(name).cloned())
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        let mut products = self.products.lock().unwrap();
        let key = (product.canonical_name.clone(), product.category.as_str().to_string());
        products.entry(key).or_insert_with(|| product.clone());
        Ok(())
    }

    async fn upsert_order(&self, order: &mut Order) -> Result<()> {
        let mut orders = self.orders.lock().unwrap();

        if let Some(existing) = orders.get(&order.order_id) {
            order.id = existing.id;
            debug!("Order already exists: {}", order.order_id);
        } else {
            let id = Uuid::new_v4();
            order.id = Some(id);
            orders.insert(order.order_id.clone(), order.clone());
            debug!("Created order: {} with id {}", order.order_id, id);
        }
        Ok(())
    }

    async fn upsert_order_item(&self, item: &mut OrderItem) -> Result<()> {
        let mut order_items = self.order_items.lock().unwrap();
        let key = (
            item.order_id.clone(),
            item.item_name.clone(),
            item.canonical_name.clone(),
        );

        if let Some(existing) = order_items.get(&key) {
            item.id = existing.id;
        } else {
            let id = Uuid::new_v4();
            item.id = Some(id);
            order_items.insert(key, item.clone());
        }
        Ok(())
    }
}

/// Incoming-wins merge for location re-upserts: a set field on the incoming
/// record replaces the stored one, an unset field leaves it alone.
fn merge_location(existing: &mut Location, incoming: &Location) {
    if incoming.toast_id.is_some() {
        existing.toast_id = incoming.toast_id.clone();
    }
    if incoming.doordash_id.is_some() {
        existing.doordash_id = incoming.doordash_id.clone();
    }
    if incoming.square_id.is_some() {
        existing.square_id = incoming.square_id.clone();
    }
    if incoming.address_line_1.is_some() {
        existing.address_line_1 = incoming.address_line_1.clone();
    }
    if incoming.city.is_some() {
        existing.city = incoming.city.clone();
    }
    if incoming.state.is_some() {
        existing.state = incoming.state.clone();
    }
    if incoming.zip_code.is_some() {
        existing.zip_code = incoming.zip_code.clone();
    }
    existing.country = incoming.country.clone();
    existing.timezone = incoming.timezone.clone();
    existing.updated_at = Utc::now();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderStatus, OrderType, ProductCategory, SourceSystem};
    use chrono::NaiveDate;

    fn order(order_id: &str) -> Order {
        Order {
            id: None,
            order_id: order_id.to_string(),
            source_system: SourceSystem::Toast,
            location_name: "Downtown".to_string(),
            external_order_id: "x".to_string(),
            timestamp_utc: Utc::now(),
            business_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            hour_of_day: 12,
            day_of_week: 1,
            order_type: OrderType::DineIn,
            total_amount_cents: 1000,
            subtotal_amount_cents: 900,
            tax_amount_cents: 100,
            tip_amount_cents: 0,
            net_revenue_cents: 900,
            fee_amount_cents: 0,
            payment_method: None,
            card_brand: None,
            status: OrderStatus::Completed,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn reupserting_an_order_is_idempotent() {
        let store = InMemoryStore::new();
        let mut first = order("TOAST_chk_1");
        store.upsert_order(&mut first).await.unwrap();
        let mut second = order("TOAST_chk_1");
        store.upsert_order(&mut second).await.unwrap();

        assert_eq!(store.order_count(), 1);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn location_reupsert_merges_incoming_set_fields() {
        let store = InMemoryStore::new();

        let mut first = Location::new("Downtown");
        first.toast_id = Some("loc_downtown_001".to_string());
        first.city = Some("Seattle".to_string());
        store.upsert_location(&mut first).await.unwrap();

        let mut second = Location::new("Downtown");
        second.square_id = Some("LCN001DOWNTOWN".to_string());
        store.upsert_location(&mut second).await.unwrap();

        let merged = store.get_location_by_name("Downtown").await.unwrap().unwrap();
        assert_eq!(merged.toast_id.as_deref(), Some("loc_downtown_001"));
        assert_eq!(merged.square_id.as_deref(), Some("LCN001DOWNTOWN"));
        assert_eq!(merged.city.as_deref(), Some("Seattle"));
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn products_dedup_on_name_and_category() {
        let store = InMemoryStore::new();
        let a = Product::new("churros", ProductCategory::Desserts);
        let b = Product::new("churros", ProductCategory::Desserts);
        store.upsert_product(&a).await.unwrap();
        store.upsert_product(&b).await.unwrap();
        assert_eq!(store.product_count(), 1);
    }

    #[tokio::test]
    async fn order_items_key_on_order_name_and_canonical_name() {
        let store = InMemoryStore::new();
        let mut item = OrderItem {
            id: None,
            order_id: "DD_abc".to_string(),
            product_id: None,
            item_name: "Churros 6pc".to_string(),
            canonical_name: "churros".to_string(),
            category: ProductCategory::Desserts,
            quantity: 6,
            unit_price_cents: 150,
            total_price_cents: 900,
        };
        store.upsert_order_item(&mut item).await.unwrap();
        let mut again = item.clone();
        again.id = None;
        store.upsert_order_item(&mut again).await.unwrap();

        assert_eq!(store.order_item_count(), 1);
        assert_eq!(item.id, again.id);
    }
}
