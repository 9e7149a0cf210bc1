//! Ledger session
//!
//! Holds the single authoritative current ledger together with its baseline
//! and the pending per-node input amounts. Every accepted edit replaces the
//! current ledger wholesale.

use tracing::{info, instrument};

use crate::application::services::edit::{EditController, RecalcPolicy};
use crate::domain::{Baseline, EditMode, EditRequest, InputValues, Ledger};

/// Host-side state for a sequence of edits.
#[derive(Debug, Clone)]
pub struct LedgerSession {
    controller: EditController,
    current: Ledger,
    inputs: InputValues,
}

impl LedgerSession {
    /// Start a session; the baseline is captured from `initial`.
    pub fn new(initial: Ledger, policy: RecalcPolicy) -> Self {
        let baseline = Baseline::capture(&initial);
        Self {
            controller: EditController::new(baseline, policy),
            current: initial,
            inputs: InputValues::new(),
        }
    }

    pub fn current(&self) -> &Ledger {
        &self.current
    }

    pub fn baseline(&self) -> &Baseline {
        self.controller.baseline()
    }

    pub fn controller(&self) -> &EditController {
        &self.controller
    }

    pub fn inputs(&self) -> &InputValues {
        &self.inputs
    }

    /// Store a pending amount for `id`. It stays until replaced or cleared.
    pub fn set_input(&mut self, id: impl Into<String>, amount: f64) {
        self.inputs.set(id, amount);
    }

    pub fn clear_inputs(&mut self) {
        self.inputs.clear();
    }

    /// Apply `request`; returns false when the target does not exist.
    #[instrument(level = "debug", skip(self))]
    pub fn apply(&mut self, request: &EditRequest) -> bool {
        if !self.current.contains(&request.target_id) {
            return false;
        }
        self.current = self.controller.apply(&self.current, &self.inputs, request);
        info!("applied {} edit to {}", request.mode, request.target_id);
        true
    }

    /// Submit an edit for `id` using the pending input amount.
    pub fn submit(&mut self, id: &str, mode: EditMode) -> bool {
        self.apply(&EditRequest::pending(id, mode))
    }

    /// Discard every edit and return to the baseline ledger.
    pub fn reset(&mut self) {
        self.current = self.controller.baseline().ledger().clone();
    }
}
