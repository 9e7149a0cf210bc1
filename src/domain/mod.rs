//! Domain layer: ledger entities and the recalculation engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).
//! Every engine function borrows its input tree and returns a freshly owned one.

pub mod aggregation;
pub mod allocation;
pub mod entities;
pub mod error;
pub mod ledger;
pub mod variance;

pub use aggregation::aggregate;
pub use allocation::allocate;
pub use entities::*;
pub use error::DomainError;
pub use ledger::{find_node, find_top_level, Baseline, BaselineLookup, Ledger};
pub use variance::{compute_variance, variance_between, ZeroBaselinePolicy};
