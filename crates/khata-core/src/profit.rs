//! # Profit Recognition
//!
//! The policy that decides how much profit a sale books at creation time.
//!
//! ## The Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Profit Recognition Policy                             │
//! │                                                                         │
//! │  Cash sale (is_credit = false)                                         │
//! │  └── profit = (sale_price − purchase_price) × quantity                 │
//! │      • May be NEGATIVE (sold at a loss) - that is allowed              │
//! │      • purchase_price = 0 (no recorded cost) ⇒ all revenue is profit   │
//! │                                                                         │
//! │  Credit sale (is_credit = true)                                        │
//! │  └── profit = 0 at creation                                            │
//! │      • Profit is recognized later, only as payments arrive             │
//! │      • Cash not collected is cash not earned                           │
//! │      • See the FIFO allocator in `allocation`                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::money::Money;

/// Computes the profit a sale books at creation time.
///
/// ## Arguments
/// * `is_credit` - whether the customer pays later
/// * `sale_price` - per-unit price charged
/// * `purchase_price` - per-unit cost-basis snapshot
/// * `quantity` - units sold
///
/// ## Example
/// ```rust
/// use khata_core::money::Money;
/// use khata_core::profit::sale_profit;
///
/// // 3 units at $15.00, cost $10.00 each: $15.00 booked immediately
/// let p = sale_profit(false, Money::from_cents(1500), Money::from_cents(1000), 3);
/// assert_eq!(p.cents(), 1500);
///
/// // On credit nothing is booked until the customer pays
/// let p = sale_profit(true, Money::from_cents(1500), Money::from_cents(1000), 3);
/// assert!(p.is_zero());
/// ```
pub fn sale_profit(
    is_credit: bool,
    sale_price: Money,
    purchase_price: Money,
    quantity: i64,
) -> Money {
    if is_credit {
        return Money::zero();
    }
    (sale_price - purchase_price).multiply_quantity(quantity)
}

/// The margin a sale would yield if fully paid: (price − cost) × quantity.
///
/// For cash sales this equals the booked profit; for credit sales it is the
/// amount the FIFO allocator hands out proportionally as payments arrive.
#[inline]
pub fn sale_margin(sale_price: Money, purchase_price: Money, quantity: i64) -> Money {
    (sale_price - purchase_price).multiply_quantity(quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_sale_books_margin() {
        // purchase 10.00, sell 3 at 15.00 -> profit 15.00
        let p = sale_profit(false, Money::from_cents(1500), Money::from_cents(1000), 3);
        assert_eq!(p.cents(), 1500);
    }

    #[test]
    fn test_credit_sale_defers_profit() {
        let p = sale_profit(true, Money::from_cents(1500), Money::from_cents(1000), 3);
        assert_eq!(p, Money::zero());
    }

    #[test]
    fn test_loss_making_cash_sale_is_allowed() {
        let p = sale_profit(false, Money::from_cents(800), Money::from_cents(1000), 2);
        assert_eq!(p.cents(), -400);
    }

    #[test]
    fn test_zero_cost_counts_all_revenue_as_profit() {
        // Manually-added product with no recorded cost
        let p = sale_profit(false, Money::from_cents(500), Money::zero(), 4);
        assert_eq!(p.cents(), 2000);
    }
}
