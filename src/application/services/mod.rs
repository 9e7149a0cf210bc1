//! Application services
//!
//! Concrete service implementations that orchestrate the recalculation engine.
//! Services depend on I/O boundary traits (FileSystem) but are themselves
//! concrete structs, not traits.

mod edit;
mod ledger_file;
mod session;

pub use edit::{apply_edit, resolve_new_value, EditController, RecalcPolicy};
pub use ledger_file::{parse_ledger, parse_script, DocumentFormat, LedgerFileService};
pub use session::LedgerSession;
