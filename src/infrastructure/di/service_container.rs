//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{LedgerFileService, LedgerSession};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::Ledger;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Ledger document and edit script loading
    pub ledger_files: LedgerFileService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);
        let ledger_files = LedgerFileService::new(fs.clone());

        Self {
            settings,
            fs,
            ledger_files,
        }
    }

    /// Load the ledger at `path`, else the configured default, else the sample.
    pub fn load_ledger(&self, path: Option<&std::path::Path>) -> ApplicationResult<Ledger> {
        let path = path.or(self.settings.ledger.as_deref());
        self.ledger_files.load_or_sample(path)
    }

    /// Start an edit session over `ledger` with the configured policy.
    pub fn session(&self, ledger: Ledger) -> LedgerSession {
        LedgerSession::new(ledger, self.settings.recalc)
    }
}
