//! ledgertree: a hierarchical numeric ledger kept consistent under edits.
//!
//! Editing a node redistributes its new value across its children in
//! proportion to their current shares, rolls every parent up to the sum of its
//! children, and recomputes each node's percentage variance against the
//! baseline captured at load time.
//!
//! ```
//! use ledgertree::application::services::{apply_edit, RecalcPolicy};
//! use ledgertree::domain::{Baseline, EditRequest, InputValues, Ledger};
//!
//! let ledger = Ledger::sample();
//! let baseline = Baseline::capture(&ledger);
//! let next = apply_edit(
//!     &ledger,
//!     &baseline,
//!     &InputValues::new(),
//!     &EditRequest::direct("phones", 1000.0),
//!     RecalcPolicy::default(),
//! );
//! assert_eq!(next.find("electronics").unwrap().value, 1700.0);
//! assert_eq!(next.find("phones").unwrap().variance.unwrap().to_string(), "25.00%");
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
