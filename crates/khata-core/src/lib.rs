//! # khata-core: Pure Ledger Logic for Khata
//!
//! This crate is the **heart** of Khata, a small-business sales and credit
//! ledger. It contains the accounting rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Khata Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Caller (HTTP layer / UI)                       │   │
//! │  │    record sale ──► record payment ──► reports ──► statements   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                khata-db (Ledger + repositories)                 │   │
//! │  │        SQLite transactions, stock CAS, row storage              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ khata-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐ │   │
//! │  │   │   types   │  │   money   │  │ allocation │  │  profit   │ │   │
//! │  │   │  Product  │  │   Money   │  │ FIFO       │  │ cash vs   │ │   │
//! │  │   │   Sale    │  │  prorate  │  │ waterfall  │  │ credit    │ │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Sale, Payment, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`profit`] - Profit recognition policy for cash vs. credit sales
//! - [`allocation`] - FIFO payment allocation and debt computation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every function is deterministic - same input =
//!    same output. The FIFO allocator in particular is re-run from scratch
//!    on every query and must always agree with itself.
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are in cents (i64) to avoid
//!    float errors
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use khata_core::money::Money;
//! use khata_core::profit::sale_profit;
//!
//! // Cash sale: 3 units at $15.00 that cost $10.00 each
//! let profit = sale_profit(false, Money::from_cents(1500), Money::from_cents(1000), 3);
//! assert_eq!(profit.cents(), 1500);
//!
//! // The same sale on credit books nothing until payments arrive
//! let deferred = sale_profit(true, Money::from_cents(1500), Money::from_cents(1000), 3);
//! assert!(deferred.is_zero());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod error;
pub mod money;
pub mod profit;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use khata_core::Money` instead of
// `use khata_core::money::Money`

pub use allocation::{allocate_fifo, outstanding_debt, AllocationOutcome};
pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity accepted on a single sale or return line.
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g., typing 10000 instead of 10).
/// Can be made configurable per-shop in future versions.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Maximum monetary amount accepted on any single input, in cents.
///
/// ## Business Reason
/// A sanity ceiling for a single-shop ledger; anything above this is a
/// data-entry mistake, not a sale.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_00;
