//! # Payment Allocation
//!
//! The FIFO waterfall that turns customer payments into realized profit, and
//! the debt arithmetic derived from the same ledger rows.
//!
//! ## The Waterfall
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   FIFO Payment Allocation                               │
//! │                                                                         │
//! │  Customer's credit sales, oldest first:                                │
//! │                                                                         │
//! │    Sale A  amount=100  margin=40   paid=0                              │
//! │    Sale B  amount= 50  margin=20   paid=0                              │
//! │                                                                         │
//! │  Payment of 120 arrives:                                               │
//! │                                                                         │
//! │    remaining=120 ──► Sale A: applied=100 (fills it)                    │
//! │    │                 realized += 40 × 100/100 = 40                     │
//! │    remaining=20  ──► Sale B: applied=20 (partial, 40% of 50)           │
//! │    │                 realized += 20 × 20/50 = 8                        │
//! │    remaining=0   ──► stop                                              │
//! │                                                                         │
//! │  Total realized profit = 48                                            │
//! │                                                                         │
//! │  Overpayment beyond all outstanding amounts stays UNAPPLIED: it is a   │
//! │  credit balance, never negative-debt profit.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recompute, Don't Cache
//! No paid-amount state is persisted anywhere. The allocation is re-run from
//! scratch on every query over fresh ledger rows, so it must be pure,
//! deterministic, and idempotent: the same sales and payments always produce
//! the same allocation, no matter how often it runs. That is why this lives
//! in khata-core and takes plain slices.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Input Lines
// =============================================================================

/// One outstanding credit sale, as the allocator sees it.
///
/// Callers must supply these **oldest first** per customer; the waterfall
/// fills them in the order given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditSaleLine {
    pub sale_id: String,
    pub customer_id: String,
    /// Full sale amount: sale_price × quantity, in cents.
    pub amount_cents: i64,
    /// (sale_price − purchase_price) × quantity, in cents. May be negative.
    pub margin_cents: i64,
}

/// One customer payment, as the allocator sees it.
///
/// Callers must supply these in chronological order (payment_date, then
/// creation order) across all customers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLine {
    pub payment_id: String,
    pub customer_id: String,
    pub amount_cents: i64,
}

// =============================================================================
// Outcome
// =============================================================================

/// How a single payment was spent by the waterfall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub payment_id: String,
    /// Cents of this payment applied to credit sales.
    pub applied_cents: i64,
    /// Cents left over after every outstanding sale was filled
    /// (overpayment / customer credit balance).
    pub unapplied_cents: i64,
    /// Profit this payment realized, in cents.
    pub realized_profit_cents: i64,
}

/// How far a single sale has been paid down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalePaydown {
    pub sale_id: String,
    /// Cents of the sale amount covered by payments.
    pub paid_cents: i64,
}

/// The full result of one allocation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutcome {
    /// Per-payment breakdown, in the order the payments were given.
    pub payments: Vec<PaymentAllocation>,
    /// Per-sale paydown, in the order the sales were given.
    pub sales: Vec<SalePaydown>,
    /// Sum of realized profit across all payments, in cents.
    pub realized_profit_cents: i64,
}

impl AllocationOutcome {
    /// Paid-down cents for one sale, zero if the sale wasn't in the input.
    pub fn paid_on_sale(&self, sale_id: &str) -> i64 {
        self.sales
            .iter()
            .find(|s| s.sale_id == sale_id)
            .map(|s| s.paid_cents)
            .unwrap_or(0)
    }

    /// Total realized profit as Money.
    pub fn realized_profit(&self) -> Money {
        Money::from_cents(self.realized_profit_cents)
    }
}

// =============================================================================
// The Allocator
// =============================================================================

/// Allocates payments across credit sales FIFO and derives realized profit.
///
/// ## Algorithm
/// 1. Group sales by customer, preserving the oldest-first order given.
/// 2. For each payment in order: walk that customer's sales oldest-first,
///    applying `min(remaining, unpaid)` to each; every applied slice
///    realizes `margin × applied / amount` of the sale's margin.
/// 3. Whatever a payment cannot place stays unapplied.
///
/// ## Arguments
/// * `sales` - credit sales, oldest first within each customer
/// * `payments` - payments in chronological order
///
/// ## Example
/// ```rust
/// use khata_core::allocation::{allocate_fifo, CreditSaleLine, PaymentLine};
///
/// let sales = vec![
///     CreditSaleLine { sale_id: "a".into(), customer_id: "c".into(), amount_cents: 10000, margin_cents: 4000 },
///     CreditSaleLine { sale_id: "b".into(), customer_id: "c".into(), amount_cents: 5000, margin_cents: 2000 },
/// ];
/// let payments = vec![
///     PaymentLine { payment_id: "p".into(), customer_id: "c".into(), amount_cents: 12000 },
/// ];
/// let outcome = allocate_fifo(&sales, &payments);
/// assert_eq!(outcome.realized_profit_cents, 4800);
/// ```
pub fn allocate_fifo(sales: &[CreditSaleLine], payments: &[PaymentLine]) -> AllocationOutcome {
    // Indices into `sales`, grouped per customer, order preserved.
    let mut by_customer: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, sale) in sales.iter().enumerate() {
        by_customer
            .entry(sale.customer_id.as_str())
            .or_default()
            .push(idx);
    }

    let mut paid = vec![0i64; sales.len()];
    let mut allocations = Vec::with_capacity(payments.len());
    let mut total_realized = Money::zero();

    for payment in payments {
        let mut remaining = payment.amount_cents;
        let mut realized = Money::zero();

        if let Some(indices) = by_customer.get(payment.customer_id.as_str()) {
            for &idx in indices {
                if remaining == 0 {
                    break;
                }
                let sale = &sales[idx];
                let unpaid = sale.amount_cents - paid[idx];
                if unpaid <= 0 {
                    continue;
                }
                let applied = remaining.min(unpaid);
                realized +=
                    Money::from_cents(sale.margin_cents).prorate(applied, sale.amount_cents);
                paid[idx] += applied;
                remaining -= applied;
            }
        }

        total_realized += realized;
        allocations.push(PaymentAllocation {
            payment_id: payment.payment_id.clone(),
            applied_cents: payment.amount_cents - remaining,
            unapplied_cents: remaining,
            realized_profit_cents: realized.cents(),
        });
    }

    AllocationOutcome {
        payments: allocations,
        sales: sales
            .iter()
            .zip(paid)
            .map(|(sale, paid_cents)| SalePaydown {
                sale_id: sale.sale_id.clone(),
                paid_cents,
            })
            .collect(),
        realized_profit_cents: total_realized.cents(),
    }
}

// =============================================================================
// Debt
// =============================================================================

/// A customer's outstanding balance.
///
/// `debt = credit sales total − payments total − returned amount on credit
/// sales`. All three inputs are plain sums over ledger rows; the result may
/// be negative when the customer has overpaid (a credit balance callers
/// should display distinctly from positive debt).
#[inline]
pub fn outstanding_debt(
    credit_sales_total: Money,
    payments_total: Money,
    returned_total: Money,
) -> Money {
    credit_sales_total - payments_total - returned_total
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(id: &str, customer: &str, amount: i64, margin: i64) -> CreditSaleLine {
        CreditSaleLine {
            sale_id: id.to_string(),
            customer_id: customer.to_string(),
            amount_cents: amount,
            margin_cents: margin,
        }
    }

    fn payment(id: &str, customer: &str, amount: i64) -> PaymentLine {
        PaymentLine {
            payment_id: id.to_string(),
            customer_id: customer.to_string(),
            amount_cents: amount,
        }
    }

    #[test]
    fn test_fifo_fills_oldest_first() {
        // Sale A (100, margin 40) then B (50, margin 20); payment of 120
        // fills A and 40% of B: 40 + 8 = 48.
        let sales = vec![sale("a", "c1", 10000, 4000), sale("b", "c1", 5000, 2000)];
        let payments = vec![payment("p1", "c1", 12000)];

        let outcome = allocate_fifo(&sales, &payments);
        assert_eq!(outcome.realized_profit_cents, 4800);
        assert_eq!(outcome.paid_on_sale("a"), 10000);
        assert_eq!(outcome.paid_on_sale("b"), 2000);
        assert_eq!(outcome.payments[0].unapplied_cents, 0);
    }

    #[test]
    fn test_multiple_payments_continue_where_previous_stopped() {
        let sales = vec![sale("a", "c1", 10000, 4000), sale("b", "c1", 5000, 2000)];
        let payments = vec![
            payment("p1", "c1", 6000),
            payment("p2", "c1", 6000),
            payment("p3", "c1", 3000),
        ];

        let outcome = allocate_fifo(&sales, &payments);
        // Fully paid: margin realized in full across the three payments.
        assert_eq!(outcome.realized_profit_cents, 6000);
        assert_eq!(outcome.paid_on_sale("a"), 10000);
        assert_eq!(outcome.paid_on_sale("b"), 5000);
        // p1 covers 60% of A; p2 the last 40% of A plus 40% of B.
        assert_eq!(outcome.payments[0].realized_profit_cents, 2400);
        assert_eq!(outcome.payments[1].realized_profit_cents, 2400);
        assert_eq!(outcome.payments[2].realized_profit_cents, 1200);
    }

    #[test]
    fn test_overpayment_stays_unapplied() {
        let sales = vec![sale("a", "c1", 10000, 4000)];
        let payments = vec![payment("p1", "c1", 15000)];

        let outcome = allocate_fifo(&sales, &payments);
        assert_eq!(outcome.realized_profit_cents, 4000);
        assert_eq!(outcome.payments[0].applied_cents, 10000);
        assert_eq!(outcome.payments[0].unapplied_cents, 5000);
    }

    #[test]
    fn test_customers_do_not_cross() {
        let sales = vec![sale("a", "c1", 10000, 4000), sale("b", "c2", 5000, 2000)];
        let payments = vec![payment("p1", "c2", 5000)];

        let outcome = allocate_fifo(&sales, &payments);
        assert_eq!(outcome.realized_profit_cents, 2000);
        assert_eq!(outcome.paid_on_sale("a"), 0);
        assert_eq!(outcome.paid_on_sale("b"), 5000);
    }

    #[test]
    fn test_idempotent() {
        let sales = vec![sale("a", "c1", 10000, 4000), sale("b", "c1", 5000, 2000)];
        let payments = vec![payment("p1", "c1", 7500), payment("p2", "c1", 2500)];

        let first = allocate_fifo(&sales, &payments);
        let second = allocate_fifo(&sales, &payments);
        assert_eq!(
            first.realized_profit_cents,
            second.realized_profit_cents
        );
        assert_eq!(first.paid_on_sale("a"), second.paid_on_sale("a"));
        assert_eq!(first.paid_on_sale("b"), second.paid_on_sale("b"));
    }

    #[test]
    fn test_negative_margin_realizes_loss() {
        // Credit sale below cost: paying it off realizes the loss.
        let sales = vec![sale("a", "c1", 10000, -2000)];
        let payments = vec![payment("p1", "c1", 5000)];

        let outcome = allocate_fifo(&sales, &payments);
        assert_eq!(outcome.realized_profit_cents, -1000);
    }

    #[test]
    fn test_zero_amount_sale_is_skipped() {
        let sales = vec![sale("a", "c1", 0, 0), sale("b", "c1", 5000, 2000)];
        let payments = vec![payment("p1", "c1", 5000)];

        let outcome = allocate_fifo(&sales, &payments);
        assert_eq!(outcome.realized_profit_cents, 2000);
        assert_eq!(outcome.paid_on_sale("b"), 5000);
    }

    #[test]
    fn test_payment_with_no_sales_is_fully_unapplied() {
        let outcome = allocate_fifo(&[], &[payment("p1", "c1", 5000)]);
        assert_eq!(outcome.realized_profit_cents, 0);
        assert_eq!(outcome.payments[0].unapplied_cents, 5000);
    }

    #[test]
    fn test_outstanding_debt() {
        let debt = outstanding_debt(
            Money::from_cents(10000),
            Money::from_cents(0),
            Money::from_cents(10000),
        );
        assert!(debt.is_zero());

        // Overpaid customer: negative debt is a credit balance
        let debt = outstanding_debt(
            Money::from_cents(5000),
            Money::from_cents(8000),
            Money::zero(),
        );
        assert_eq!(debt.cents(), -3000);
    }
}
