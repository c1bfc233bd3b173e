//! # Return Repository
//!
//! Database operations for returns.
//!
//! Returns restore stock and reduce effective debt, but never rewrite the
//! originating sale's stored profit. The sums exposed here are what the
//! debt computation and the over-return guard read.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use khata_core::SaleReturn;

const RETURN_COLUMNS: &str =
    "id, sale_id, product_id, customer_id, quantity, return_date, reason, created_at";

/// Repository for return database operations.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    /// Creates a new ReturnRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Gets a return by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SaleReturn>> {
        let ret = sqlx::query_as::<_, SaleReturn>(&format!(
            "SELECT {RETURN_COLUMNS} FROM returns WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ret)
    }

    /// Fetches a return on an explicit connection (for use inside
    /// transactions).
    pub(crate) async fn fetch(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<SaleReturn>> {
        let ret = sqlx::query_as::<_, SaleReturn>(&format!(
            "SELECT {RETURN_COLUMNS} FROM returns WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(ret)
    }

    /// Lists the returns recorded against one sale.
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<SaleReturn>> {
        let returns = sqlx::query_as::<_, SaleReturn>(&format!(
            "SELECT {RETURN_COLUMNS} FROM returns WHERE sale_id = ?1 ORDER BY return_date, id"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(returns)
    }

    /// Total quantity already returned against a sale.
    ///
    /// Read inside the same transaction as the over-return check so a
    /// concurrent return can't slip past the guard.
    pub(crate) async fn returned_quantity(
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<i64> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT SUM(quantity) FROM returns WHERE sale_id = ?1")
                .bind(sale_id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(total.unwrap_or(0))
    }

    /// Returned amount (quantity × sale price) over a customer's CREDIT
    /// sales, in cents. The debt computation subtracts this.
    pub(crate) async fn sum_credit_returned_amount(
        conn: &mut SqliteConnection,
        customer_id: &str,
    ) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(r.quantity * s.sale_price_cents)
            FROM returns r
            JOIN sales s ON s.id = r.sale_id
            WHERE s.is_credit = 1 AND s.customer_id = ?1
            "#,
        )
        .bind(customer_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(total.unwrap_or(0))
    }

    /// Margin returned against CASH sales in the range, in cents.
    ///
    /// Only consulted under `ReturnProfitPolicy::DeductOnReport`; the
    /// default policy leaves recognized profit untouched.
    pub async fn cash_returned_margin_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(r.quantity * (s.sale_price_cents - s.purchase_price_cents))
            FROM returns r
            JOIN sales s ON s.id = r.sale_id
            WHERE s.is_credit = 0 AND r.return_date >= ?1 AND r.return_date <= ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    // =========================================================================
    // Row mutations (transaction participants)
    // =========================================================================

    /// Inserts a return row.
    pub(crate) async fn insert(conn: &mut SqliteConnection, ret: &SaleReturn) -> DbResult<()> {
        debug!(id = %ret.id, sale_id = %ret.sale_id, quantity = %ret.quantity, "Inserting return");

        sqlx::query(
            r#"
            INSERT INTO returns (
                id, sale_id, product_id, customer_id,
                quantity, return_date, reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&ret.id)
        .bind(&ret.sale_id)
        .bind(&ret.product_id)
        .bind(&ret.customer_id)
        .bind(ret.quantity)
        .bind(ret.return_date)
        .bind(&ret.reason)
        .bind(ret.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Deletes a return row.
    pub(crate) async fn delete_row(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM returns WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Return", id));
        }

        Ok(())
    }
}

/// Helper to generate a new return ID.
pub fn generate_return_id() -> String {
    Uuid::new_v4().to_string()
}
