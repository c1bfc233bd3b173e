//! # Domain Types
//!
//! Core domain types used throughout Khata.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  stock_quantity │   │  purchase_price │   │  customer (FK)  │       │
//! │  │  is_imported    │   │  (snapshot)     │   │  amount_cents   │       │
//! │  │  prices (cents) │   │  profit_cents   │   │  payment_date   │       │
//! │  └─────────────────┘   │  is_credit      │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │   SaleReturn    │   │     Expense     │       │
//! │  │  name, phone    │   │   sale (FK)     │   │   independent   │       │
//! │  │  debt: DERIVED  │   │   quantity      │   │   ledger        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `Sale` copies the product's `purchase_price_cents` at creation. That
//! snapshot is the immutable historical cost basis: later edits to the
//! product never change what an old sale cost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product in the shop's inventory.
///
/// Two kinds exist, distinguished by `is_imported`:
/// - **imported (stock-tracked)**: stock must never go negative; selling
///   more than is available is rejected.
/// - **manually added**: stock is advisory and may go negative freely
///   (the shopkeeper sells things the system never saw arrive).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Cost basis in cents. Zero for manually-added products with no
    /// recorded cost; in that case all sale revenue counts as profit.
    pub purchase_price_cents: i64,

    /// Default ask price in cents, if one was recorded.
    pub sale_price_cents: Option<i64>,

    /// Current stock level. May be negative for manually-added products.
    pub stock_quantity: i64,

    /// True for stock-tracked (imported) inventory.
    pub is_imported: bool,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the cost basis as Money.
    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// Returns the default ask price as Money, if recorded.
    #[inline]
    pub fn sale_price(&self) -> Option<Money> {
        self.sale_price_cents.map(Money::from_cents)
    }

    /// Checks whether `quantity` units can be deducted from stock.
    ///
    /// Imported products enforce the stock floor; manually-added products
    /// always pass (their stock may go negative).
    pub fn can_deduct(&self, quantity: i64) -> bool {
        !self.is_imported || self.stock_quantity >= quantity
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer who may buy on credit.
///
/// Debt is **derived** from ledger rows (credit sales − payments − returns),
/// never stored here. Customers are never deleted: sales and payments
/// reference them forever.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// A single sale line.
///
/// `purchase_price_cents` is a snapshot of the product's cost at sale time
/// and never changes afterwards. `profit_cents` is computed once at
/// creation under the recognition policy (see [`crate::profit`]):
/// cash sales book margin immediately, credit sales book zero.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub product_id: String,
    /// None for walk-in cash sales.
    pub customer_id: Option<String>,
    pub quantity: i64,
    /// Cost basis snapshot, frozen at sale time.
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    /// Booked profit. Zero for credit sales until payments arrive.
    pub profit_cents: i64,
    pub is_credit: bool,
    /// Groups line items entered together into one logical invoice.
    pub transaction_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Full sale amount: price × quantity.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.sale_price_cents).multiply_quantity(self.quantity)
    }

    /// Margin over the cost-basis snapshot: (price − cost) × quantity.
    /// May be negative for sales below cost.
    #[inline]
    pub fn margin(&self) -> Money {
        (Money::from_cents(self.sale_price_cents) - Money::from_cents(self.purchase_price_cents))
            .multiply_quantity(self.quantity)
    }

    /// Booked profit as Money.
    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment received from a customer against their outstanding credit.
///
/// Payments are **not** linked to specific sales at creation time; the
/// linkage is computed at read time by the FIFO allocator
/// ([`crate::allocation`]).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub customer_id: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Return
// =============================================================================

/// A return of some quantity of a previous sale.
///
/// A return restores stock and reduces effective debt through the debt
/// computation. It does **not** retroactively edit the original sale's
/// stored profit value; see [`ReturnProfitPolicy`] for how reporting may
/// account for it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleReturn {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub customer_id: Option<String>,
    pub quantity: i64,
    #[ts(as = "String")]
    pub return_date: DateTime<Utc>,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Expense
// =============================================================================

/// A business expense. Its own ledger, tied to neither customers nor
/// products.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub category: Option<String>,
    #[ts(as = "String")]
    pub expense_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Reporting Policy
// =============================================================================

/// How period reporting treats returns against cash sales whose profit was
/// already recognized at sale time.
///
/// The historical per-sale profit record is never mutated under either
/// policy; this only changes what aggregate reports subtract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReturnProfitPolicy {
    /// Recognized profit stands; returns affect debt and stock only.
    KeepHistorical,
    /// Period reports subtract the returned margin
    /// (quantity × (sale_price − purchase_price)) for cash sales.
    DeductOnReport,
}

impl Default for ReturnProfitPolicy {
    fn default() -> Self {
        ReturnProfitPolicy::KeepHistorical
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(stock: i64, imported: bool) -> Product {
        Product {
            id: "p1".to_string(),
            name: "Sugar 1kg".to_string(),
            purchase_price_cents: 1000,
            sale_price_cents: Some(1500),
            stock_quantity: stock,
            is_imported: imported,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_deduct_imported_enforces_floor() {
        let p = product(3, true);
        assert!(p.can_deduct(3));
        assert!(!p.can_deduct(5));
    }

    #[test]
    fn test_can_deduct_manual_allows_negative() {
        let p = product(0, false);
        assert!(p.can_deduct(5));
    }

    #[test]
    fn test_sale_amount_and_margin() {
        let sale = Sale {
            id: "s1".to_string(),
            product_id: "p1".to_string(),
            customer_id: None,
            quantity: 3,
            purchase_price_cents: 1000,
            sale_price_cents: 1500,
            profit_cents: 1500,
            is_credit: false,
            transaction_id: None,
            created_at: Utc::now(),
        };
        assert_eq!(sale.amount().cents(), 4500);
        assert_eq!(sale.margin().cents(), 1500);
    }

    #[test]
    fn test_return_profit_policy_default() {
        assert_eq!(
            ReturnProfitPolicy::default(),
            ReturnProfitPolicy::KeepHistorical
        );
    }
}
