//! # Sale Repository
//!
//! Database operations for sale rows.
//!
//! ## Snapshot Pattern
//! A sale row freezes the product's purchase price at sale time
//! (`purchase_price_cents`). Later edits to the product never touch old
//! sales: the snapshot is the immutable historical cost basis that margin
//! and profit are computed from.
//!
//! ## Ordering Invariant
//! Every credit-sale listing here is `ORDER BY created_at, id` - oldest
//! first. The FIFO allocator consumes these lists as-is, so this ordering
//! IS the allocation order.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use khata_core::Sale;

const SALE_COLUMNS: &str = "id, product_id, customer_id, quantity, purchase_price_cents, \
     sale_price_cents, profit_cents, is_credit, transaction_id, created_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Fetches a sale on an explicit connection (for use inside
    /// transactions).
    pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(sale)
    }

    /// Lists the most recent sales.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists all line items of one invoice (shared transaction_id).
    pub async fn list_by_transaction(&self, transaction_id: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE transaction_id = ?1 ORDER BY created_at, id"
        ))
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists a customer's credit sales, oldest first.
    pub async fn list_credit_for_customer(&self, customer_id: &str) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        Self::credit_for_customer(&mut conn, customer_id).await
    }

    /// Credit sales of one customer, oldest first, on an explicit
    /// connection.
    pub(crate) async fn credit_for_customer(
        conn: &mut SqliteConnection,
        customer_id: &str,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE customer_id = ?1 AND is_credit = 1 \
             ORDER BY created_at, id"
        ))
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(sales)
    }

    /// All credit sales across all customers, oldest first.
    pub async fn list_all_credit(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE is_credit = 1 ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Sum of a customer's credit-sale amounts (price × quantity), in cents.
    pub(crate) async fn sum_credit_amount(
        conn: &mut SqliteConnection,
        customer_id: &str,
    ) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(sale_price_cents * quantity) FROM sales \
             WHERE customer_id = ?1 AND is_credit = 1",
        )
        .bind(customer_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(total.unwrap_or(0))
    }

    /// Profit booked on cash sales created in the range, in cents.
    ///
    /// Credit sales carry profit 0 at creation, so no filter on is_credit
    /// is strictly needed; filtering anyway keeps the intent visible.
    pub async fn sum_cash_profit_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(profit_cents) FROM sales \
             WHERE is_credit = 0 AND created_at >= ?1 AND created_at <= ?2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    /// Number of sales created in the range.
    pub async fn count_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sales WHERE created_at >= ?1 AND created_at <= ?2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // =========================================================================
    // Row mutations (transaction participants)
    // =========================================================================

    /// Inserts a sale row.
    pub(crate) async fn insert(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, product_id = %sale.product_id, is_credit = %sale.is_credit, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, product_id, customer_id, quantity,
                purchase_price_cents, sale_price_cents, profit_cents,
                is_credit, transaction_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.product_id)
        .bind(&sale.customer_id)
        .bind(sale.quantity)
        .bind(sale.purchase_price_cents)
        .bind(sale.sale_price_cents)
        .bind(sale.profit_cents)
        .bind(sale.is_credit)
        .bind(&sale.transaction_id)
        .bind(sale.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Rewrites a sale's mutable fields.
    ///
    /// `purchase_price_cents` and `created_at` are NOT in the SET list: the
    /// cost-basis snapshot and the sale's age are immutable.
    pub(crate) async fn update_row(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, "Updating sale");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                customer_id = ?2,
                quantity = ?3,
                sale_price_cents = ?4,
                profit_cents = ?5,
                is_credit = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_id)
        .bind(sale.quantity)
        .bind(sale.sale_price_cents)
        .bind(sale.profit_cents)
        .bind(sale.is_credit)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", &sale.id));
        }

        Ok(())
    }

    /// Deletes a sale row.
    pub(crate) async fn delete_row(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }
}

/// Helper to generate a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}
