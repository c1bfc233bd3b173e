//! # Repository Module
//!
//! Database repository implementations for Khata.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Ledger facade / caller                                                │
//! │       │                                                                 │
//! │       │  db.sales().get_by_id("...")                                   │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── pool-bound methods  - single-statement reads and writes           │
//! │  └── conn-bound methods  - statements that must participate in a       │
//! │                            transaction (stock adjust + row write)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  The conn-bound variants take `&mut SqliteConnection` so the Ledger    │
//! │  can run several of them inside one transaction and commit or roll    │
//! │  back as a unit.                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - products, stock adjustment, capital
//! - [`customer::CustomerRepository`] - customer registry
//! - [`sale::SaleRepository`] - sale rows and credit-sale queries
//! - [`payment::PaymentRepository`] - payment rows
//! - [`returns::ReturnRepository`] - return rows and returned-quantity sums
//! - [`expense::ExpenseRepository`] - the independent expense ledger

pub mod customer;
pub mod expense;
pub mod payment;
pub mod product;
pub mod returns;
pub mod sale;
