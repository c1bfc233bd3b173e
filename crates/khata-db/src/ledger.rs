//! # Ledger Facade
//!
//! The transactional entry point callers build on. Every mutating
//! operation here runs as one atomic unit: the stock adjustment and the
//! ledger-row write both succeed or both fail.
//!
//! ## Operation Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Ledger Operations                              │
//! │                                                                         │
//! │  MUTATIONS (one SQLite transaction each)                               │
//! │  ├── record_sale / record_sale_batch   validate → deduct stock →       │
//! │  │                                     insert row (profit policy)      │
//! │  ├── update_sale                       stock delta + profit recompute  │
//! │  ├── delete_sale                       guard: settled? returned? →     │
//! │  │                                     restore stock → delete row      │
//! │  ├── record_return / delete_return     over-return guard, stock move   │
//! │  ├── record_payment                    validated insert                │
//! │  └── record_expense / add_product / add_customer                       │
//! │                                                                         │
//! │  READS (recomputed from rows on every call - nothing cached)           │
//! │  ├── compute_debt          credit − payments − credit returns          │
//! │  ├── compute_period_stats  cash profit + FIFO-realized profit          │
//! │  ├── compute_capital       Σ cost × max(stock, 0)                      │
//! │  └── compute_expense_total                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All validation happens before any mutation; a failed precondition rolls
//! the transaction back and leaves stock and ledger untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::repository::customer::{generate_customer_id, CustomerRepository};
use crate::repository::expense::{generate_expense_id, ExpenseRepository};
use crate::repository::payment::{generate_payment_id, PaymentRepository};
use crate::repository::product::{generate_product_id, ProductRepository, StockDeduction};
use crate::repository::returns::{generate_return_id, ReturnRepository};
use crate::repository::sale::{generate_sale_id, SaleRepository};
use khata_core::allocation::{allocate_fifo, CreditSaleLine, PaymentLine};
use khata_core::profit::sale_profit;
use khata_core::validation::{validate_amount, validate_name, validate_price, validate_quantity};
use khata_core::{
    outstanding_debt, CoreError, Customer, Expense, Money, Payment, Product, ReturnProfitPolicy,
    Sale, SaleReturn, ValidationError,
};

// =============================================================================
// Input / Output DTOs
// =============================================================================

/// Input for recording a single sale line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub product_id: String,
    pub quantity: i64,
    /// Per-unit price in cents. Zero is allowed (giveaways).
    pub sale_price_cents: i64,
    /// Required when `is_credit` is true.
    pub customer_id: Option<String>,
    pub is_credit: bool,
    /// Invoice grouping token; synthesized for batches when absent.
    pub transaction_id: Option<String>,
}

/// What a recorded sale hands back: the new row id and the profit booked
/// at creation (zero for credit sales).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSale {
    pub sale_id: String,
    pub profit_cents: i64,
}

/// Partial update of a sale. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalePatch {
    pub quantity: Option<i64>,
    pub sale_price_cents: Option<i64>,
    pub is_credit: Option<bool>,
}

/// Input for recording a return against a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReturn {
    pub sale_id: String,
    pub quantity: i64,
    /// Defaults to now.
    pub return_date: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    /// Defaults to the sale's customer.
    pub customer_id: Option<String>,
}

/// Input for recording a customer payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub customer_id: String,
    pub amount_cents: i64,
    /// Defaults to now.
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Input for recording an expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub amount_cents: i64,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Defaults to now.
    pub expense_date: Option<DateTime<Utc>>,
}

/// Input for quick-adding a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    /// Cost basis; zero when the shopkeeper never recorded one.
    pub purchase_price_cents: i64,
    pub sale_price_cents: Option<i64>,
    pub stock_quantity: i64,
    /// True for stock-tracked (imported) inventory.
    pub is_imported: bool,
}

/// Input for registering a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// An inclusive date range for reporting queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Aggregate figures for a reporting period.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    /// Cash-sale profit booked in the period plus profit realized by the
    /// period's payments, in cents.
    pub total_profit_cents: i64,
    /// Number of sales created in the period.
    pub total_sales_count: i64,
}

// =============================================================================
// Ledger
// =============================================================================

/// The transactional ledger facade.
///
/// Constructed from [`crate::Database::ledger`]; holds a pool clone and a
/// reporting policy, nothing else. Cheap to clone and to recreate.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
    return_policy: ReturnProfitPolicy,
}

impl Ledger {
    /// Creates a ledger with the default return policy
    /// (`KeepHistorical`).
    pub fn new(pool: SqlitePool) -> Self {
        Ledger {
            pool,
            return_policy: ReturnProfitPolicy::default(),
        }
    }

    /// Sets how period reports treat returns against cash sales.
    pub fn with_return_policy(mut self, policy: ReturnProfitPolicy) -> Self {
        self.return_policy = policy;
        self
    }

    // =========================================================================
    // Products & Customers (quick-add)
    // =========================================================================

    /// Quick-adds a product.
    pub async fn add_product(&self, input: NewProduct) -> LedgerResult<Product> {
        validate_name(&input.name)?;
        validate_price("purchase_price", input.purchase_price_cents)?;
        if let Some(price) = input.sale_price_cents {
            validate_price("sale_price", price)?;
        }

        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            name: input.name.trim().to_string(),
            purchase_price_cents: input.purchase_price_cents,
            sale_price_cents: input.sale_price_cents,
            stock_quantity: input.stock_quantity,
            is_imported: input.is_imported,
            created_at: now,
            updated_at: now,
        };

        ProductRepository::new(self.pool.clone()).insert(&product).await?;
        info!(id = %product.id, name = %product.name, "Product added");
        Ok(product)
    }

    /// Registers a customer.
    pub async fn add_customer(&self, input: NewCustomer) -> LedgerResult<Customer> {
        validate_name(&input.name)?;

        let customer = Customer {
            id: generate_customer_id(),
            name: input.name.trim().to_string(),
            phone: input.phone,
            notes: input.notes,
            created_at: Utc::now(),
        };

        CustomerRepository::new(self.pool.clone()).insert(&customer).await?;
        info!(id = %customer.id, name = %customer.name, "Customer added");
        Ok(customer)
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a single sale.
    ///
    /// ## Steps
    /// 1. Validate (quantity, price, credit ⇒ customer)
    /// 2. Deduct stock (CAS; imported products enforce the floor)
    /// 3. Insert the row with the cost-basis snapshot and the profit the
    ///    recognition policy books at creation
    ///
    /// All three happen in one transaction.
    pub async fn record_sale(&self, input: NewSale) -> LedgerResult<RecordedSale> {
        Self::validate_sale_input(&input)?;

        let mut tx = self.pool.begin().await?;
        let recorded = Self::record_sale_in(&mut tx, &input, Utc::now()).await?;
        tx.commit().await?;

        info!(
            sale_id = %recorded.sale_id,
            profit_cents = %recorded.profit_cents,
            is_credit = %input.is_credit,
            "Sale recorded"
        );
        Ok(recorded)
    }

    /// Records several sale lines as one invoice.
    ///
    /// Every line gets the same transaction id (the given one, or a
    /// synthesized token). The batch is atomic: one out-of-stock line rolls
    /// back the whole invoice.
    pub async fn record_sale_batch(
        &self,
        items: Vec<NewSale>,
        transaction_id: Option<String>,
    ) -> LedgerResult<Vec<RecordedSale>> {
        if items.is_empty() {
            return Err(LedgerError::from(ValidationError::Required {
                field: "items".to_string(),
            }));
        }
        for item in &items {
            Self::validate_sale_input(item)?;
        }

        let transaction_id = transaction_id.unwrap_or_else(|| {
            generate_transaction_id(items.iter().find_map(|i| i.customer_id.as_deref()))
        });

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut recorded = Vec::with_capacity(items.len());
        for item in &items {
            let line = NewSale {
                transaction_id: Some(transaction_id.clone()),
                ..item.clone()
            };
            recorded.push(Self::record_sale_in(&mut tx, &line, now).await?);
        }
        tx.commit().await?;

        info!(transaction_id = %transaction_id, lines = recorded.len(), "Sale batch recorded");
        Ok(recorded)
    }

    fn validate_sale_input(input: &NewSale) -> LedgerResult<()> {
        validate_quantity(input.quantity)?;
        validate_price("sale_price", input.sale_price_cents)?;
        if input.is_credit && input.customer_id.is_none() {
            return Err(CoreError::CustomerRequired.into());
        }
        Ok(())
    }

    /// One sale line inside an open transaction.
    async fn record_sale_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        input: &NewSale,
        now: DateTime<Utc>,
    ) -> LedgerResult<RecordedSale> {
        if let Some(customer_id) = &input.customer_id {
            CustomerRepository::fetch(&mut *tx, customer_id)
                .await?
                .ok_or_else(|| CoreError::CustomerNotFound(customer_id.clone()))?;
        }

        let product = ProductRepository::fetch(&mut *tx, &input.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(input.product_id.clone()))?;

        match ProductRepository::try_deduct_stock(&mut *tx, &product.id, input.quantity).await? {
            StockDeduction::Applied => {}
            StockDeduction::Insufficient { available } => {
                return Err(CoreError::InsufficientStock {
                    product: product.name,
                    available,
                    requested: input.quantity,
                }
                .into());
            }
            StockDeduction::NotFound => {
                return Err(CoreError::ProductNotFound(input.product_id.clone()).into());
            }
        }

        let profit = sale_profit(
            input.is_credit,
            Money::from_cents(input.sale_price_cents),
            product.purchase_price(),
            input.quantity,
        );

        let sale = Sale {
            id: generate_sale_id(),
            product_id: product.id,
            customer_id: input.customer_id.clone(),
            quantity: input.quantity,
            // Cost-basis snapshot: frozen here, immutable afterwards.
            purchase_price_cents: product.purchase_price_cents,
            sale_price_cents: input.sale_price_cents,
            profit_cents: profit.cents(),
            is_credit: input.is_credit,
            transaction_id: input.transaction_id.clone(),
            created_at: now,
        };

        SaleRepository::insert(&mut *tx, &sale).await?;

        Ok(RecordedSale {
            sale_id: sale.id,
            profit_cents: sale.profit_cents,
        })
    }

    /// Updates a sale's quantity, price, or credit flag.
    ///
    /// The stock delta is recomputed: increasing quantity re-runs the
    /// availability check for imported products; decreasing restores the
    /// difference. Profit is recomputed under the recognition policy with
    /// the sale's CURRENT credit flag and its original cost-basis snapshot.
    pub async fn update_sale(&self, id: &str, patch: SalePatch) -> LedgerResult<Sale> {
        let mut tx = self.pool.begin().await?;

        let mut sale = SaleRepository::fetch(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

        let new_quantity = patch.quantity.unwrap_or(sale.quantity);
        let new_price = patch.sale_price_cents.unwrap_or(sale.sale_price_cents);
        let new_is_credit = patch.is_credit.unwrap_or(sale.is_credit);

        validate_quantity(new_quantity)?;
        validate_price("sale_price", new_price)?;
        if new_is_credit && sale.customer_id.is_none() {
            return Err(CoreError::CustomerRequired.into());
        }

        if new_quantity > sale.quantity {
            let extra = new_quantity - sale.quantity;
            match ProductRepository::try_deduct_stock(&mut tx, &sale.product_id, extra).await? {
                StockDeduction::Applied => {}
                StockDeduction::Insufficient { available } => {
                    let name = ProductRepository::fetch(&mut tx, &sale.product_id)
                        .await?
                        .map(|p| p.name)
                        .unwrap_or_else(|| sale.product_id.clone());
                    return Err(CoreError::InsufficientStock {
                        product: name,
                        available,
                        requested: extra,
                    }
                    .into());
                }
                StockDeduction::NotFound => {
                    return Err(CoreError::ProductNotFound(sale.product_id.clone()).into());
                }
            }
        } else if new_quantity < sale.quantity {
            ProductRepository::add_stock(&mut tx, &sale.product_id, sale.quantity - new_quantity)
                .await?;
        }

        let profit = sale_profit(
            new_is_credit,
            Money::from_cents(new_price),
            Money::from_cents(sale.purchase_price_cents),
            new_quantity,
        );

        sale.quantity = new_quantity;
        sale.sale_price_cents = new_price;
        sale.is_credit = new_is_credit;
        sale.profit_cents = profit.cents();

        SaleRepository::update_row(&mut tx, &sale).await?;
        tx.commit().await?;

        info!(sale_id = %sale.id, profit_cents = %sale.profit_cents, "Sale updated");
        Ok(sale)
    }

    /// Deletes a sale, restoring the full sold quantity to stock.
    ///
    /// ## Guards
    /// - A sale with recorded returns is rejected: deleting it would
    ///   restore stock the returns already restored.
    /// - A credit sale the FIFO allocation shows as (partially) paid is
    ///   rejected: its realized profit would lose its originating sale.
    pub async fn delete_sale(&self, id: &str) -> LedgerResult<Sale> {
        let mut tx = self.pool.begin().await?;

        let sale = SaleRepository::fetch(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

        let returned = ReturnRepository::returned_quantity(&mut tx, id).await?;
        if returned > 0 {
            return Err(CoreError::SaleHasReturns {
                sale_id: id.to_string(),
                returned,
            }
            .into());
        }

        if sale.is_credit {
            if let Some(customer_id) = &sale.customer_id {
                let sales = SaleRepository::credit_for_customer(&mut tx, customer_id).await?;
                let payments = PaymentRepository::for_customer(&mut tx, customer_id).await?;
                let outcome = allocate_fifo(&credit_lines(&sales), &payment_lines(&payments));
                let paid_cents = outcome.paid_on_sale(id);
                if paid_cents > 0 {
                    return Err(CoreError::SaleSettled {
                        sale_id: id.to_string(),
                        paid_cents,
                    }
                    .into());
                }
            }
        }

        ProductRepository::add_stock(&mut tx, &sale.product_id, sale.quantity).await?;
        SaleRepository::delete_row(&mut tx, id).await?;
        tx.commit().await?;

        info!(sale_id = %id, restored_quantity = %sale.quantity, "Sale deleted");
        Ok(sale)
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// Records a return against a sale and restores stock.
    ///
    /// The originating sale's stored profit is left untouched: returns
    /// reduce effective debt (and, depending on the policy, aggregate
    /// reports) - never historical per-sale records.
    pub async fn record_return(&self, input: NewReturn) -> LedgerResult<SaleReturn> {
        validate_quantity(input.quantity)?;

        let mut tx = self.pool.begin().await?;

        let sale = SaleRepository::fetch(&mut tx, &input.sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(input.sale_id.clone()))?;

        let already_returned = ReturnRepository::returned_quantity(&mut tx, &sale.id).await?;
        if already_returned + input.quantity > sale.quantity {
            return Err(CoreError::OverReturn {
                sale_id: sale.id,
                already_returned,
                sale_quantity: sale.quantity,
                requested: input.quantity,
            }
            .into());
        }

        let now = Utc::now();
        let ret = SaleReturn {
            id: generate_return_id(),
            sale_id: sale.id.clone(),
            product_id: sale.product_id.clone(),
            customer_id: input.customer_id.or(sale.customer_id),
            quantity: input.quantity,
            return_date: input.return_date.unwrap_or(now),
            reason: input.reason,
            created_at: now,
        };

        ReturnRepository::insert(&mut tx, &ret).await?;
        ProductRepository::add_stock(&mut tx, &sale.product_id, input.quantity).await?;
        tx.commit().await?;

        info!(return_id = %ret.id, sale_id = %ret.sale_id, quantity = %ret.quantity, "Return recorded");
        Ok(ret)
    }

    /// Deletes a return, taking the returned quantity back out of stock.
    ///
    /// The reversal is unconditional even for imported products: the goods
    /// physically left again, so no floor check applies.
    pub async fn delete_return(&self, id: &str) -> LedgerResult<SaleReturn> {
        let mut tx = self.pool.begin().await?;

        let ret = ReturnRepository::fetch(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::ReturnNotFound(id.to_string()))?;

        ProductRepository::remove_stock_unchecked(&mut tx, &ret.product_id, ret.quantity).await?;
        ReturnRepository::delete_row(&mut tx, id).await?;
        tx.commit().await?;

        info!(return_id = %id, "Return deleted");
        Ok(ret)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Records a customer payment.
    ///
    /// The payment is not linked to any sale; the FIFO allocator computes
    /// the linkage at read time.
    pub async fn record_payment(&self, input: NewPayment) -> LedgerResult<Payment> {
        validate_amount("amount", input.amount_cents)?;

        let customers = CustomerRepository::new(self.pool.clone());
        customers
            .get_by_id(&input.customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(input.customer_id.clone()))?;

        let now = Utc::now();
        let payment = Payment {
            id: generate_payment_id(),
            customer_id: input.customer_id,
            amount_cents: input.amount_cents,
            payment_date: input.payment_date.unwrap_or(now),
            notes: input.notes,
            created_at: now,
        };

        PaymentRepository::new(self.pool.clone()).insert(&payment).await?;

        info!(payment_id = %payment.id, customer_id = %payment.customer_id, amount_cents = %payment.amount_cents, "Payment recorded");
        Ok(payment)
    }

    // =========================================================================
    // Expenses
    // =========================================================================

    /// Records an expense.
    pub async fn record_expense(&self, input: NewExpense) -> LedgerResult<Expense> {
        validate_amount("amount", input.amount_cents)?;

        let now = Utc::now();
        let expense = Expense {
            id: generate_expense_id(),
            amount_cents: input.amount_cents,
            description: input.description,
            category: input.category,
            expense_date: input.expense_date.unwrap_or(now),
            created_at: now,
        };

        ExpenseRepository::new(self.pool.clone()).insert(&expense).await?;

        info!(expense_id = %expense.id, amount_cents = %expense.amount_cents, "Expense recorded");
        Ok(expense)
    }

    /// Total expenses in the range.
    pub async fn compute_expense_total(&self, range: DateRange) -> LedgerResult<Money> {
        Self::validate_range(&range)?;
        let total = ExpenseRepository::new(self.pool.clone())
            .sum_in_range(range.start, range.end)
            .await?;
        Ok(Money::from_cents(total))
    }

    // =========================================================================
    // Derived figures (recompute, don't cache)
    // =========================================================================

    /// A customer's outstanding balance:
    /// `credit sales − payments − returns on credit sales`.
    ///
    /// Negative means the customer has overpaid (a credit balance) -
    /// callers display that distinctly from positive debt. The three sums
    /// run on one connection so they see a consistent snapshot within this
    /// request.
    pub async fn compute_debt(&self, customer_id: &str) -> LedgerResult<Money> {
        let mut conn = self.pool.acquire().await?;

        CustomerRepository::fetch(&mut conn, customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

        let credit_total = SaleRepository::sum_credit_amount(&mut conn, customer_id).await?;
        let payments_total = PaymentRepository::sum_for_customer(&mut conn, customer_id).await?;
        let returned_total =
            ReturnRepository::sum_credit_returned_amount(&mut conn, customer_id).await?;

        let debt = outstanding_debt(
            Money::from_cents(credit_total),
            Money::from_cents(payments_total),
            Money::from_cents(returned_total),
        );

        debug!(customer_id = %customer_id, debt_cents = %debt.cents(), "Debt computed");
        Ok(debt)
    }

    /// Profit a customer's payments have realized so far, via the FIFO
    /// waterfall over their credit sales.
    pub async fn compute_realized_profit(&self, customer_id: &str) -> LedgerResult<Money> {
        let mut conn = self.pool.acquire().await?;

        let sales = SaleRepository::credit_for_customer(&mut conn, customer_id).await?;
        let payments = PaymentRepository::for_customer(&mut conn, customer_id).await?;
        let outcome = allocate_fifo(&credit_lines(&sales), &payment_lines(&payments));

        Ok(outcome.realized_profit())
    }

    /// Aggregate profit and sales count for a period.
    ///
    /// `total_profit = cash-sale profit booked in the period + profit
    /// realized by payments whose payment_date falls in the period`. The
    /// allocation universe is ALL credit sales and ALL payments in history,
    /// not just the period's: earlier payments determine how far each sale
    /// was already paid down. Under `DeductOnReport`, margin returned
    /// against cash sales in the period is subtracted.
    pub async fn compute_period_stats(&self, range: DateRange) -> LedgerResult<PeriodStats> {
        Self::validate_range(&range)?;

        let sales_repo = SaleRepository::new(self.pool.clone());
        let payments_repo = PaymentRepository::new(self.pool.clone());

        let cash_profit = sales_repo
            .sum_cash_profit_in_range(range.start, range.end)
            .await?;
        let sales_count = sales_repo.count_in_range(range.start, range.end).await?;

        let credit_sales = sales_repo.list_all_credit().await?;
        let payments = payments_repo.list_all().await?;
        let outcome = allocate_fifo(&credit_lines(&credit_sales), &payment_lines(&payments));

        // The outcome is aligned with `payments`; keep only the period's.
        let realized: i64 = payments
            .iter()
            .zip(&outcome.payments)
            .filter(|(p, _)| p.payment_date >= range.start && p.payment_date <= range.end)
            .map(|(_, alloc)| alloc.realized_profit_cents)
            .sum();

        let mut total_profit = cash_profit + realized;

        if self.return_policy == ReturnProfitPolicy::DeductOnReport {
            let returned_margin = ReturnRepository::new(self.pool.clone())
                .cash_returned_margin_in_range(range.start, range.end)
                .await?;
            total_profit -= returned_margin;
        }

        debug!(
            total_profit_cents = %total_profit,
            total_sales_count = %sales_count,
            "Period stats computed"
        );
        Ok(PeriodStats {
            total_profit_cents: total_profit,
            total_sales_count: sales_count,
        })
    }

    /// Capital tied up in stock: Σ purchase_price × max(stock, 0).
    ///
    /// Point-in-time by design - capital has no history, even when callers
    /// ask for a date range elsewhere in the same report.
    pub async fn compute_capital(&self) -> LedgerResult<Money> {
        let capital = ProductRepository::new(self.pool.clone()).capital_cents().await?;
        Ok(Money::from_cents(capital))
    }

    fn validate_range(range: &DateRange) -> LedgerResult<()> {
        if range.start > range.end {
            return Err(LedgerError::from(ValidationError::InvalidFormat {
                field: "range".to_string(),
                reason: "start is after end".to_string(),
            }));
        }
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Bridges sale rows into allocator input, keeping the oldest-first order.
/// Credit sales without a customer cannot exist (guarded at recording), but
/// are skipped defensively rather than panicking on legacy rows.
fn credit_lines(sales: &[Sale]) -> Vec<CreditSaleLine> {
    sales
        .iter()
        .filter_map(|sale| {
            sale.customer_id.as_ref().map(|customer_id| CreditSaleLine {
                sale_id: sale.id.clone(),
                customer_id: customer_id.clone(),
                amount_cents: sale.amount().cents(),
                margin_cents: sale.margin().cents(),
            })
        })
        .collect()
}

/// Bridges payment rows into allocator input, keeping chronological order.
fn payment_lines(payments: &[Payment]) -> Vec<PaymentLine> {
    payments
        .iter()
        .map(|payment| PaymentLine {
            payment_id: payment.id.clone(),
            customer_id: payment.customer_id.clone(),
            amount_cents: payment.amount_cents,
        })
        .collect()
}

/// Generates an invoice-grouping token.
///
/// Uniqueness is the only required property; the timestamp and customer
/// fragment just make logs greppable.
fn generate_transaction_id(customer_id: Option<&str>) -> String {
    let now = Utc::now();
    let who = customer_id
        .map(|id| id.chars().take(8).collect::<String>())
        .unwrap_or_else(|| "cash".to_string());
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", now.format("%y%m%d%H%M%S"), who, &suffix[..8])
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    #[test]
    fn test_generate_transaction_id_unique() {
        let a = generate_transaction_id(Some("customer-1"));
        let b = generate_transaction_id(Some("customer-1"));
        assert_ne!(a, b);
        assert!(a.contains("customer"));

        let cash = generate_transaction_id(None);
        assert!(cash.contains("cash"));
    }

    // -------------------------------------------------------------------------
    // In-memory database fixtures
    // -------------------------------------------------------------------------

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(
        db: &Database,
        name: &str,
        cost: i64,
        stock: i64,
        imported: bool,
    ) -> Product {
        db.ledger()
            .add_product(NewProduct {
                name: name.to_string(),
                purchase_price_cents: cost,
                sale_price_cents: None,
                stock_quantity: stock,
                is_imported: imported,
            })
            .await
            .unwrap()
    }

    async fn seed_customer(db: &Database, name: &str) -> Customer {
        db.ledger()
            .add_customer(NewCustomer {
                name: name.to_string(),
                phone: None,
                notes: None,
            })
            .await
            .unwrap()
    }

    fn cash_sale(product_id: &str, quantity: i64, price: i64) -> NewSale {
        NewSale {
            product_id: product_id.to_string(),
            quantity,
            sale_price_cents: price,
            customer_id: None,
            is_credit: false,
            transaction_id: None,
        }
    }

    fn credit_sale(product_id: &str, customer_id: &str, quantity: i64, price: i64) -> NewSale {
        NewSale {
            product_id: product_id.to_string(),
            quantity,
            sale_price_cents: price,
            customer_id: Some(customer_id.to_string()),
            is_credit: true,
            transaction_id: None,
        }
    }

    fn wide_range() -> DateRange {
        let now = Utc::now();
        DateRange {
            start: now - Duration::days(1),
            end: now + Duration::days(1),
        }
    }

    // -------------------------------------------------------------------------
    // Profit recognition
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cash_sale_books_profit_and_deducts_stock() {
        let db = test_db().await;
        let product = seed_product(&db, "Sugar 1kg", 1000, 10, true).await;

        // 3 units at $15.00 that cost $10.00 each
        let recorded = db
            .ledger()
            .record_sale(cash_sale(&product.id, 3, 1500))
            .await
            .unwrap();
        assert_eq!(recorded.profit_cents, 1500);

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 7);
    }

    #[tokio::test]
    async fn test_credit_sale_defers_profit() {
        let db = test_db().await;
        let product = seed_product(&db, "Rice 5kg", 1000, 10, true).await;
        let customer = seed_customer(&db, "Ali").await;

        let recorded = db
            .ledger()
            .record_sale(credit_sale(&product.id, &customer.id, 3, 1500))
            .await
            .unwrap();
        assert_eq!(recorded.profit_cents, 0);

        // Stock moves immediately even though profit is deferred
        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 7);

        let debt = db.ledger().compute_debt(&customer.id).await.unwrap();
        assert_eq!(debt.cents(), 4500);
    }

    #[tokio::test]
    async fn test_zero_cost_product_counts_all_revenue_as_profit() {
        let db = test_db().await;
        let product = seed_product(&db, "Loose candy", 0, 0, false).await;

        let recorded = db
            .ledger()
            .record_sale(cash_sale(&product.id, 4, 250))
            .await
            .unwrap();
        assert_eq!(recorded.profit_cents, 1000);
    }

    #[tokio::test]
    async fn test_credit_sale_without_customer_rejected() {
        let db = test_db().await;
        let product = seed_product(&db, "Tea", 500, 10, true).await;

        let mut input = cash_sale(&product.id, 1, 800);
        input.is_credit = true;
        let err = db.ledger().record_sale(input).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::CustomerRequired)
        ));
    }

    // -------------------------------------------------------------------------
    // FIFO allocation and debt
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_payment_realizes_profit_fifo() {
        let db = test_db().await;
        let ledger = db.ledger();
        // Sale A: amount 100.00, margin 40.00; Sale B: amount 50.00, margin 20.00
        let a = seed_product(&db, "A", 6000, 10, true).await;
        let b = seed_product(&db, "B", 3000, 10, true).await;
        let customer = seed_customer(&db, "Bilal").await;

        ledger
            .record_sale(credit_sale(&a.id, &customer.id, 1, 10000))
            .await
            .unwrap();
        ledger
            .record_sale(credit_sale(&b.id, &customer.id, 1, 5000))
            .await
            .unwrap();

        // 120.00 fills A and 40% of B: 40.00 + 8.00 realized
        ledger
            .record_payment(NewPayment {
                customer_id: customer.id.clone(),
                amount_cents: 12000,
                payment_date: None,
                notes: None,
            })
            .await
            .unwrap();

        let realized = ledger.compute_realized_profit(&customer.id).await.unwrap();
        assert_eq!(realized.cents(), 4800);

        let debt = ledger.compute_debt(&customer.id).await.unwrap();
        assert_eq!(debt.cents(), 3000);
    }

    #[tokio::test]
    async fn test_overpayment_caps_realized_profit() {
        let db = test_db().await;
        let ledger = db.ledger();
        let product = seed_product(&db, "A", 6000, 10, true).await;
        let customer = seed_customer(&db, "Sana").await;

        ledger
            .record_sale(credit_sale(&product.id, &customer.id, 1, 10000))
            .await
            .unwrap();
        ledger
            .record_payment(NewPayment {
                customer_id: customer.id.clone(),
                amount_cents: 20000,
                payment_date: None,
                notes: None,
            })
            .await
            .unwrap();

        // Margin realized in full, never beyond; the excess is a credit balance.
        let realized = ledger.compute_realized_profit(&customer.id).await.unwrap();
        assert_eq!(realized.cents(), 4000);

        let debt = ledger.compute_debt(&customer.id).await.unwrap();
        assert_eq!(debt.cents(), -10000);
    }

    #[tokio::test]
    async fn test_payment_to_unknown_customer_rejected() {
        let db = test_db().await;
        let err = db
            .ledger()
            .record_payment(NewPayment {
                customer_id: "nobody".to_string(),
                amount_cents: 1000,
                payment_date: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::CustomerNotFound(_))
        ));
    }

    // -------------------------------------------------------------------------
    // Stock floor
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_manual_product_stock_goes_negative() {
        let db = test_db().await;
        let product = seed_product(&db, "Loose flour", 500, 0, false).await;

        db.ledger()
            .record_sale(cash_sale(&product.id, 5, 800))
            .await
            .unwrap();

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, -5);
    }

    #[tokio::test]
    async fn test_imported_product_enforces_stock_floor() {
        let db = test_db().await;
        let product = seed_product(&db, "Milk carton", 500, 3, true).await;

        let err = db
            .ledger()
            .record_sale(cash_sale(&product.id, 5, 800))
            .await
            .unwrap_err();
        match err {
            LedgerError::Core(CoreError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Nothing moved: no sale row, stock intact
        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 3);
        assert!(db.sales().list_recent(10).await.unwrap().is_empty());
    }

    // -------------------------------------------------------------------------
    // Batches
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_batch_shares_transaction_id() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 100, 10, true).await;
        let b = seed_product(&db, "B", 200, 10, true).await;

        let recorded = db
            .ledger()
            .record_sale_batch(
                vec![cash_sale(&a.id, 2, 300), cash_sale(&b.id, 1, 500)],
                None,
            )
            .await
            .unwrap();
        assert_eq!(recorded.len(), 2);

        let first = db
            .sales()
            .get_by_id(&recorded[0].sale_id)
            .await
            .unwrap()
            .unwrap();
        let transaction_id = first.transaction_id.unwrap();
        let lines = db.sales().list_by_transaction(&transaction_id).await.unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_rolls_back_as_a_unit() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 100, 10, true).await;
        let b = seed_product(&db, "B", 200, 1, true).await;

        // Second line is out of stock: the first line must not survive.
        let err = db
            .ledger()
            .record_sale_batch(
                vec![cash_sale(&a.id, 2, 300), cash_sale(&b.id, 5, 500)],
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::InsufficientStock { .. })
        ));

        let a_after = db.products().get_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(a_after.stock_quantity, 10);
        assert!(db.sales().list_recent(10).await.unwrap().is_empty());
    }

    // -------------------------------------------------------------------------
    // Sale updates and deletion
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_update_sale_adjusts_stock_and_profit() {
        let db = test_db().await;
        let ledger = db.ledger();
        let product = seed_product(&db, "Soap", 1000, 10, true).await;

        let recorded = ledger
            .record_sale(cash_sale(&product.id, 3, 1500))
            .await
            .unwrap();

        let updated = ledger
            .update_sale(
                &recorded.sale_id,
                SalePatch {
                    quantity: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.profit_cents, 2500);

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 5);

        // Shrinking restores the difference
        ledger
            .update_sale(
                &recorded.sale_id,
                SalePatch {
                    quantity: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 8);
    }

    #[tokio::test]
    async fn test_update_quantity_beyond_stock_rejected() {
        let db = test_db().await;
        let product = seed_product(&db, "Soap", 1000, 5, true).await;

        let recorded = db
            .ledger()
            .record_sale(cash_sale(&product.id, 3, 1500))
            .await
            .unwrap();

        // 2 left in stock; growing by 4 must fail and change nothing
        let err = db
            .ledger()
            .update_sale(
                &recorded.sale_id,
                SalePatch {
                    quantity: Some(7),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::InsufficientStock { .. })
        ));

        let sale = db.sales().get_by_id(&recorded.sale_id).await.unwrap().unwrap();
        assert_eq!(sale.quantity, 3);
    }

    #[tokio::test]
    async fn test_delete_sale_restores_stock() {
        let db = test_db().await;
        let product = seed_product(&db, "Soap", 1000, 10, true).await;

        let recorded = db
            .ledger()
            .record_sale(cash_sale(&product.id, 4, 1500))
            .await
            .unwrap();
        db.ledger().delete_sale(&recorded.sale_id).await.unwrap();

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 10);
        assert!(db.sales().get_by_id(&recorded.sale_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_paid_credit_sale_rejected() {
        let db = test_db().await;
        let ledger = db.ledger();
        let product = seed_product(&db, "A", 6000, 10, true).await;
        let customer = seed_customer(&db, "Omar").await;

        let recorded = ledger
            .record_sale(credit_sale(&product.id, &customer.id, 1, 10000))
            .await
            .unwrap();
        ledger
            .record_payment(NewPayment {
                customer_id: customer.id.clone(),
                amount_cents: 4000,
                payment_date: None,
                notes: None,
            })
            .await
            .unwrap();

        let err = ledger.delete_sale(&recorded.sale_id).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::SaleSettled { paid_cents: 4000, .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_sale_with_returns_rejected() {
        let db = test_db().await;
        let ledger = db.ledger();
        let product = seed_product(&db, "A", 100, 10, true).await;

        let recorded = ledger
            .record_sale(cash_sale(&product.id, 4, 300))
            .await
            .unwrap();
        ledger
            .record_return(NewReturn {
                sale_id: recorded.sale_id.clone(),
                quantity: 2,
                return_date: None,
                reason: None,
                customer_id: None,
            })
            .await
            .unwrap();

        let err = ledger.delete_sale(&recorded.sale_id).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::SaleHasReturns { returned: 2, .. })
        ));
    }

    // -------------------------------------------------------------------------
    // Returns
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_full_return_clears_debt_and_restores_stock() {
        let db = test_db().await;
        let ledger = db.ledger();
        let product = seed_product(&db, "A", 6000, 10, true).await;
        let customer = seed_customer(&db, "Zara").await;

        let recorded = ledger
            .record_sale(credit_sale(&product.id, &customer.id, 1, 10000))
            .await
            .unwrap();
        ledger
            .record_return(NewReturn {
                sale_id: recorded.sale_id,
                quantity: 1,
                return_date: None,
                reason: Some("changed mind".to_string()),
                customer_id: None,
            })
            .await
            .unwrap();

        let debt = ledger.compute_debt(&customer.id).await.unwrap();
        assert!(debt.is_zero());

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_over_return_rejected_with_history() {
        let db = test_db().await;
        let ledger = db.ledger();
        let product = seed_product(&db, "A", 100, 20, true).await;

        let recorded = ledger
            .record_sale(cash_sale(&product.id, 10, 300))
            .await
            .unwrap();
        ledger
            .record_return(NewReturn {
                sale_id: recorded.sale_id.clone(),
                quantity: 6,
                return_date: None,
                reason: None,
                customer_id: None,
            })
            .await
            .unwrap();

        // 4 returnable; asking for 5 states the history exactly
        let err = ledger
            .record_return(NewReturn {
                sale_id: recorded.sale_id.clone(),
                quantity: 5,
                return_date: None,
                reason: None,
                customer_id: None,
            })
            .await
            .unwrap_err();
        match err {
            LedgerError::Core(CoreError::OverReturn {
                already_returned,
                sale_quantity,
                requested,
                ..
            }) => {
                assert_eq!(already_returned, 6);
                assert_eq!(sale_quantity, 10);
                assert_eq!(requested, 5);
            }
            other => panic!("expected OverReturn, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_return_takes_stock_back_out() {
        let db = test_db().await;
        let ledger = db.ledger();
        let product = seed_product(&db, "A", 100, 10, true).await;

        let recorded = ledger
            .record_sale(cash_sale(&product.id, 4, 300))
            .await
            .unwrap();
        let ret = ledger
            .record_return(NewReturn {
                sale_id: recorded.sale_id,
                quantity: 3,
                return_date: None,
                reason: None,
                customer_id: None,
            })
            .await
            .unwrap();

        // 10 − 4 + 3 = 9 before, back to 6 after the return is deleted
        ledger.delete_return(&ret.id).await.unwrap();
        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 6);
    }

    // -------------------------------------------------------------------------
    // Reporting
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_period_stats_combine_cash_and_realized_profit() {
        let db = test_db().await;
        let ledger = db.ledger();
        let cash = seed_product(&db, "Cash item", 1000, 10, true).await;
        let credit = seed_product(&db, "Credit item", 6000, 10, true).await;
        let customer = seed_customer(&db, "Hina").await;

        // Cash: profit 15.00 booked now. Credit: 100.00/40.00, half paid.
        ledger.record_sale(cash_sale(&cash.id, 3, 1500)).await.unwrap();
        ledger
            .record_sale(credit_sale(&credit.id, &customer.id, 1, 10000))
            .await
            .unwrap();
        ledger
            .record_payment(NewPayment {
                customer_id: customer.id.clone(),
                amount_cents: 5000,
                payment_date: None,
                notes: None,
            })
            .await
            .unwrap();

        let stats = ledger.compute_period_stats(wide_range()).await.unwrap();
        // 1500 cash + 40.00 × 5000/10000 = 1500 + 2000
        assert_eq!(stats.total_profit_cents, 3500);
        assert_eq!(stats.total_sales_count, 2);
    }

    #[tokio::test]
    async fn test_period_stats_only_count_in_range_payments() {
        let db = test_db().await;
        let ledger = db.ledger();
        let product = seed_product(&db, "A", 6000, 10, true).await;
        let customer = seed_customer(&db, "Nadia").await;

        // Credit sale of 100.00 carrying a 40.00 margin
        ledger
            .record_sale(credit_sale(&product.id, &customer.id, 1, 10000))
            .await
            .unwrap();

        let now = Utc::now();
        // Half paid long before the period, half inside it
        ledger
            .record_payment(NewPayment {
                customer_id: customer.id.clone(),
                amount_cents: 5000,
                payment_date: Some(now - Duration::days(30)),
                notes: None,
            })
            .await
            .unwrap();
        ledger
            .record_payment(NewPayment {
                customer_id: customer.id.clone(),
                amount_cents: 5000,
                payment_date: Some(now),
                notes: None,
            })
            .await
            .unwrap();

        let range = DateRange {
            start: now - Duration::days(1),
            end: now + Duration::days(1),
        };
        let stats = ledger.compute_period_stats(range).await.unwrap();
        // The earlier payment already advanced the waterfall, so only the
        // in-range payment's 20.00 share is reported - never the full 40.00.
        assert_eq!(stats.total_profit_cents, 2000);
        assert_eq!(stats.total_sales_count, 1);
    }

    #[tokio::test]
    async fn test_period_stats_deduct_on_report_policy() {
        let db = test_db().await;
        let product = seed_product(&db, "A", 1000, 10, true).await;

        let ledger = db.ledger();
        let recorded = ledger
            .record_sale(cash_sale(&product.id, 2, 1500))
            .await
            .unwrap();
        ledger
            .record_return(NewReturn {
                sale_id: recorded.sale_id,
                quantity: 1,
                return_date: None,
                reason: None,
                customer_id: None,
            })
            .await
            .unwrap();

        // Historical policy keeps the booked 10.00
        let stats = ledger.compute_period_stats(wide_range()).await.unwrap();
        assert_eq!(stats.total_profit_cents, 1000);

        // Deduct policy subtracts the returned unit's 5.00 margin
        let deducting = db
            .ledger()
            .with_return_policy(ReturnProfitPolicy::DeductOnReport);
        let stats = deducting.compute_period_stats(wide_range()).await.unwrap();
        assert_eq!(stats.total_profit_cents, 500);
    }

    #[tokio::test]
    async fn test_capital_ignores_negative_stock() {
        let db = test_db().await;
        let negative = seed_product(&db, "Negative", 200, 0, false).await;
        seed_product(&db, "Positive", 300, 10, true).await;

        // Drive the first product's stock to −5
        db.ledger()
            .record_sale(cash_sale(&negative.id, 5, 400))
            .await
            .unwrap();

        // −5 × 200 contributes nothing; 10 × 300 = 3000
        let capital = db.ledger().compute_capital().await.unwrap();
        assert_eq!(capital.cents(), 3000);
    }

    #[tokio::test]
    async fn test_expense_total_in_range() {
        let db = test_db().await;
        let ledger = db.ledger();

        ledger
            .record_expense(NewExpense {
                amount_cents: 2500,
                description: Some("Electricity".to_string()),
                category: Some("utilities".to_string()),
                expense_date: None,
            })
            .await
            .unwrap();
        ledger
            .record_expense(NewExpense {
                amount_cents: 1500,
                description: None,
                category: None,
                expense_date: None,
            })
            .await
            .unwrap();

        let total = ledger.compute_expense_total(wide_range()).await.unwrap();
        assert_eq!(total.cents(), 4000);
    }
}
