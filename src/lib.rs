//! SmartSpend
//!
//! A personal-finance tracker that:
//! - Records income and expense transactions, newest first
//! - Persists the sequence as one JSON blob in a pluggable key-value store
//! - Derives totals, net savings and per-category expense breakdowns
//! - Asks Gemini for savings tips, falling back to a canned tip on any failure
//!
//! Totals are nominal sums across currencies; nothing is converted.

pub mod advisor;
pub mod api;
pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod store;
pub mod summary;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use advisor::{SavingsAdvisor, TipGenerator};
pub use store::{BlobStore, TransactionStore};
pub use summary::{aggregate_expenses, compute_summary, expense_breakdown};
