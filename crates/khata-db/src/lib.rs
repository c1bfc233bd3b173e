//! # khata-db: Storage and Transactions for Khata
//!
//! This crate persists the Khata ledger in SQLite via sqlx and wraps every
//! mutating operation of [`Ledger`] in a database transaction. The
//! accounting rules themselves live in khata-core; this crate only decides
//! when rows are read and written, and makes sure they change atomically.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Khata Data Flow                                │
//! │                                                                         │
//! │  Caller (HTTP layer / UI)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     khata-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    Ledger     │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (ledger.rs)  │    │  (one per     │    │  (embedded)  │  │   │
//! │  │   │               │    │   table)      │    │              │  │   │
//! │  │   │ transactions, │◄───│ ProductRepo   │    │ 001_initial_ │  │   │
//! │  │   │ stock CAS,    │    │ SaleRepo      │    │ schema.sql   │  │   │
//! │  │   │ derived reads │    │ PaymentRepo…  │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │  pure accounting calls                             │   │
//! │  │           ▼                                                    │   │
//! │  │   khata-core (profit policy, FIFO allocation, debt)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL) or in-memory database for tests                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and combined ledger error types
//! - [`repository`] - One repository per table
//! - [`ledger`] - The transactional facade callers build on
//!
//! ## Usage
//!
//! ```rust,ignore
//! use khata_db::{Database, DbConfig};
//! use khata_db::ledger::NewSale;
//!
//! let db = Database::new(DbConfig::new("path/to/khata.db")).await?;
//! let ledger = db.ledger();
//!
//! let recorded = ledger
//!     .record_sale(NewSale {
//!         product_id: product.id.clone(),
//!         quantity: 3,
//!         sale_price_cents: 1500,
//!         customer_id: None,
//!         is_credit: false,
//!         transaction_id: None,
//!     })
//!     .await?;
//!
//! let debt = ledger.compute_debt(&customer.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, LedgerError};
pub use ledger::Ledger;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::payment::PaymentRepository;
pub use repository::product::ProductRepository;
pub use repository::returns::ReturnRepository;
pub use repository::sale::SaleRepository;
