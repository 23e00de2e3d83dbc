use crate::domain::{Location, Order, OrderItem, Product};
use crate::error::{ReconcilerError, Result};
use crate::storage::Store;
use async_trait::async_trait;
use libsql::{Builder, Connection, Database};
use std::env;
use tracing::info;
use uuid::Uuid;

pub struct DatabaseManager {
    db: Database,
}

impl DatabaseManager {
    /// Create a new database manager with connection to Turso
    pub async fn new() -> Result<Self> {
        let url = env::var("LIBSQL_URL").map_err(|_| ReconcilerError::Database {
            message: "LIBSQL_URL environment variable not set".to_string(),
        })?;

        let auth_token = env::var("LIBSQL_AUTH_TOKEN").map_err(|_| ReconcilerError::Database {
            message: "LIBSQL_AUTH_TOKEN environment variable not set".to_string(),
        })?;

        info!("Connecting to Turso database at {}", url);

        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| ReconcilerError::Database {
                message: format!("Failed to connect to database: {e}"),
            })?;

        Ok(Self { db })
    }

    /// Get a connection to the database
    pub async fn get_connection(&self) -> Result<Connection> {
        self.db.connect().map_err(|e| ReconcilerError::Database {
            message: format!("Failed to get database connection: {e}"),
        })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        let conn = self.get_connection().await?;

        let migration_sql = include_str!("../migrations/001_create_schema.sql");

        conn.execute_batch(migration_sql)
            .await
            .map_err(|e| ReconcilerError::Database {
                message: format!("Failed to run migrations: {e}"),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl Store for DatabaseManager {
    async fn execute_ddl(&self) -> Result<()> {
        self.run_migrations().await
    }

    async fn upsert_location(&self, location: &mut Location) -> Result<()> {
        if location.id.is_none() {
            location.id = Some(Uuid::new_v4());
        }
        let conn = self.get_connection().await?;

        conn.execute(
            "INSERT INTO locations (id, canonical_name, toast_id, doordash_id, square_id, \
             address_line_1, city, state, zip_code, country, timezone) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(canonical_name) DO UPDATE SET \
             toast_id = COALESCE(excluded.toast_id, toast_id), \
             doordash_id = COALESCE(excluded.doordash_id, doordash_id), \
             square_id = COALESCE(excluded.square_id, square_id), \
             address_line_1 = COALESCE(excluded.address_line_1, address_line_1), \
             city = COALESCE(excluded.city, city), \
             state = COALESCE(excluded.state, state), \
             zip_code = COALESCE(excluded.zip_code, zip_code), \
             country = excluded.country, \
             timezone = excluded.timezone, \
             updated_at = datetime('now')",
            libsql::params![
                location.id.map(|id| id.to_string()),
                location.canonical_name.clone(),
                location.toast_id.clone(),
                location.doordash_id.clone(),
                location.square_id.clone(),
                location.address_line_1.clone(),
                location.city.clone(),
                location.state.clone(),
                location.zip_code.clone(),
                location.country.clone(),
                location.timezone.clone()
            ],
        )
        .await
        .map_err(|e| ReconcilerError::Database {
            message: format!("Failed to upsert location: {e}"),
        })?;

        Ok(())
    }

    async fn get_location_by_name(&self, name: &str) -> Result<Option<Location>> {
        let conn = self.get_connection().await?;

        let mut rows = conn
            .query(
                "SELECT canonical_name, toast_id, doordash_id, square_id, timezone \
                 FROM locations WHERE canonical_name = ?",
                libsql::params![name],
            )
            .await
            .map_err(|e| ReconcilerError::Database {
                message: format!("Failed to query location: {e}"),
            })?;

        let row = rows.next().await.map_err(|e| ReconcilerError::Database {
            message: format!("Failed to read row: {e}"),
        })?;

        match row {
            Some(row) => {
                let read = |idx: i32| -> Result<Option<String>> {
                    row.get(idx).map_err(|e| ReconcilerError::Database {
                        message: format!("Failed to read column {idx}: {e}"),
                    })
                };
                let mut location = Location::new(
                    &read(0)?.unwrap_or_default(),
                );
                location.toast_id = read(1)?;
                location.doordash_id = read(2)?;
                location.square_id = read(3)?;
                if let Some(tz) = read(4)? {
                    location.timezone = tz;
                }
                Ok(Some(location))
            }
            None => Ok(None),
        }
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        let conn = self.get_connection().await?;

        conn.execute(
            "INSERT INTO products (id, canonical_name, category) VALUES (?, ?, ?) \
             ON CONFLICT(canonical_name, category) DO NOTHING",
            libsql::params![
                product.id.to_string(),
                product.canonical_name.clone(),
                product.category.as_str()
            ],
        )
        .await
        .map_err(|e| ReconcilerError::Database {
            message: format!("Failed to upsert product: {e}"),
        })?;

        Ok(())
    }

    async fn upsert_order(&self, order: &mut Order) -> Result<()> {
        if order.id.is_none() {
            order.id = Some(Uuid::new_v4());
        }
        let conn = self.get_connection().await?;

        conn.execute(
            "INSERT INTO orders (id, order_id, source_system, location_name, external_order_id, \
             timestamp_utc, business_date, hour_of_day, day_of_week, order_type, \
             total_amount_cents, subtotal_amount_cents, tax_amount_cents, tip_amount_cents, \
             net_revenue_cents, fee_amount_cents, payment_method, card_brand, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(order_id) DO NOTHING",
            libsql::params![
                order.id.map(|id| id.to_string()),
                order.order_id.clone(),
                order.source_system.as_str(),
                order.location_name.clone(),
                order.external_order_id.clone(),
                order.timestamp_utc.to_rfc3339(),
                order.business_date.to_string(),
                order.hour_of_day as i64,
                order.day_of_week as i64,
                order.order_type.as_str(),
                order.total_amount_cents,
                order.subtotal_amount_cents,
                order.tax_amount_cents,
                order.tip_amount_cents,
                order.net_revenue_cents,
                order.fee_amount_cents,
                order.payment_method.clone(),
                order.card_brand.clone(),
                order.status.as_str()
            ],
        )
        .await
        .map_err(|e| ReconcilerError::Database {
            message: format!("Failed to upsert order: {e}"),
        })?;

        Ok(())
    }

    async fn upsert_order_item(&self, item: &mut OrderItem) -> Result<()> {
        if item.id.is_none() {
            item.id = Some(Uuid::new_v4());
        }
        let conn = self.get_connection().await?;

        conn.execute(
            "INSERT INTO order_items (id, order_id, product_id, item_name, canonical_name, \
             category, quantity, unit_price_cents, total_price_cents) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(order_id, item_name, canonical_name) DO NOTHING",
            libsql::params![
                item.id.map(|id| id.to_string()),
                item.order_id.clone(),
                item.product_id.map(|id| id.to_string()),
                item.item_name.clone(),
                item.canonical_name.clone(),
                item.category.as_str(),
                item.quantity,
                item.unit_price_cents,
                item.total_price_cents
            ],
        )
        .await
        .map_err(|e| ReconcilerError::Database {
            message: format!("Failed to upsert order item: {e}"),
        })?;

        Ok(())
    }
}
