//! # Product Repository
//!
//! Database operations for products and stock.
//!
//! ## Stock Adjustment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read stock, check in Rust, write new value                  │
//! │     Two concurrent sales can both pass the check and oversell.         │
//! │                                                                         │
//! │  ✅ CORRECT: one conditional UPDATE (compare-and-swap)                 │
//! │     UPDATE products                                                     │
//! │     SET stock_quantity = stock_quantity - :qty                          │
//! │     WHERE id = :id                                                      │
//! │       AND (is_imported = 0 OR stock_quantity >= :qty)                   │
//! │                                                                         │
//! │     rows_affected = 0 means the floor would be violated (or the        │
//! │     product is gone); the caller distinguishes by re-reading.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use khata_core::Product;

const PRODUCT_COLUMNS: &str = "id, name, purchase_price_cents, sale_price_cents, \
     stock_quantity, is_imported, created_at, updated_at";

/// Outcome of a conditional stock deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StockDeduction {
    /// Stock was decremented.
    Applied,
    /// The product is stock-tracked and has too little stock.
    Insufficient { available: i64 },
    /// No such product.
    NotFound,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Fetches a product on an explicit connection (for use inside
    /// transactions).
    pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(product)
    }

    /// Gets several products at once.
    ///
    /// Builds the IN-clause with bound placeholders - never by splicing the
    /// ids into the SQL text. Used by batch sale recording to prefetch every
    /// product of an invoice.
    pub async fn get_by_ids(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        builder.push(")");

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists products sorted by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, purchase_price_cents, sale_price_cents,
                stock_quantity, is_imported, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.stock_quantity)
        .bind(product.is_imported)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an existing product's editable fields.
    ///
    /// Stock is NOT updated here; stock moves only through the delta
    /// operations below so sales and returns stay the single source of
    /// stock truth.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                purchase_price_cents = ?3,
                sale_price_cents = ?4,
                is_imported = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.is_imported)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Hard-deletes a product, writing a deletion-log row in the same
    /// transaction. Products referenced by sales cannot be deleted (foreign
    /// key violation).
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let mut tx = self.pool.begin().await?;

        let product = Self::fetch(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        sqlx::query(
            r#"
            INSERT INTO deletion_log (id, entity_type, entity_id, name, deleted_at)
            VALUES (?1, 'product', ?2, ?3, ?4)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id)
        .bind(&product.name)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Capital tied up in stock: Σ purchase_price × max(stock, 0), in cents.
    ///
    /// Negative stock (oversold manually-added items) contributes ZERO to
    /// capital, never a negative amount. Point-in-time snapshot; capital has
    /// no history.
    pub async fn capital_cents(&self) -> DbResult<i64> {
        let capital: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(purchase_price_cents * MAX(stock_quantity, 0)) FROM products",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(capital.unwrap_or(0))
    }

    // =========================================================================
    // Stock deltas (transaction participants)
    // =========================================================================

    /// Conditionally deducts stock (the check-then-decrement CAS).
    ///
    /// Imported products fail when `qty` exceeds current stock; manually
    /// added products may go negative freely.
    pub(crate) async fn try_deduct_stock(
        conn: &mut SqliteConnection,
        id: &str,
        qty: i64,
    ) -> DbResult<StockDeduction> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - ?2, updated_at = ?3
            WHERE id = ?1 AND (is_imported = 0 OR stock_quantity >= ?2)
            "#,
        )
        .bind(id)
        .bind(qty)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() > 0 {
            debug!(id = %id, qty = %qty, "Stock deducted");
            return Ok(StockDeduction::Applied);
        }

        // The guard refused: distinguish a missing product from a floor hit.
        match Self::fetch(conn, id).await? {
            Some(product) => Ok(StockDeduction::Insufficient {
                available: product.stock_quantity,
            }),
            None => Ok(StockDeduction::NotFound),
        }
    }

    /// Increments stock unconditionally (returns, sale deletion, quantity
    /// decreases).
    pub(crate) async fn add_stock(
        conn: &mut SqliteConnection,
        id: &str,
        qty: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(qty)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(id = %id, qty = %qty, "Stock restored");
        Ok(())
    }

    /// Decrements stock unconditionally.
    ///
    /// Used to reverse a return: the goods physically left again, so no
    /// floor check applies even for imported products.
    pub(crate) async fn remove_stock_unchecked(
        conn: &mut SqliteConnection,
        id: &str,
        qty: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(qty)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}
