//! # Payment Repository
//!
//! Database operations for customer payments.
//!
//! ## Ordering Invariant
//! Payments are always listed `ORDER BY payment_date, created_at, id` - a
//! total order, so the FIFO allocator sees the same chronological sequence
//! on every run even when two payments share a date.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use khata_core::Payment;

const PAYMENT_COLUMNS: &str = "id, customer_id, amount_cents, payment_date, notes, created_at";

const PAYMENT_ORDER: &str = "ORDER BY payment_date, created_at, id";

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Gets a payment by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Inserts a payment row.
    pub async fn insert(&self, payment: &Payment) -> DbResult<()> {
        debug!(id = %payment.id, customer_id = %payment.customer_id, amount = %payment.amount_cents, "Inserting payment");

        sqlx::query(
            r#"
            INSERT INTO payments (id, customer_id, amount_cents, payment_date, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.customer_id)
        .bind(payment.amount_cents)
        .bind(payment.payment_date)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a payment row.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", id));
        }

        Ok(())
    }

    /// Lists a customer's payments in chronological order.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Payment>> {
        let mut conn = self.pool.acquire().await?;
        Self::for_customer(&mut conn, customer_id).await
    }

    /// A customer's payments, chronological, on an explicit connection.
    pub(crate) async fn for_customer(
        conn: &mut SqliteConnection,
        customer_id: &str,
    ) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE customer_id = ?1 {PAYMENT_ORDER}"
        ))
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(payments)
    }

    /// All payments across all customers, in chronological order.
    ///
    /// Period reporting needs the complete history: payments BEFORE a
    /// period determine how far each sale was already paid down when the
    /// period's payments arrive.
    pub async fn list_all(&self) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments {PAYMENT_ORDER}"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Payments whose payment_date falls in the range, chronological.
    pub async fn list_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE payment_date >= ?1 AND payment_date <= ?2 {PAYMENT_ORDER}"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Sum of all payment amounts for a customer, in cents.
    ///
    /// Unconditional: not limited to what the allocator could place against
    /// credit sales. Overpayments still reduce debt.
    pub(crate) async fn sum_for_customer(
        conn: &mut SqliteConnection,
        customer_id: &str,
    ) -> DbResult<i64> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT SUM(amount_cents) FROM payments WHERE customer_id = ?1")
                .bind(customer_id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(total.unwrap_or(0))
    }
}

/// Helper to generate a new payment ID.
pub fn generate_payment_id() -> String {
    Uuid::new_v4().to_string()
}
