// src/state.rs
// Shared handles injected into every request handler

use std::sync::Arc;

use crate::diagnosis::DiagnosisProvider;
use crate::history::{ScanStore, ValidationMode};

#[derive(Clone)]
pub struct AppState {
    // -------- Storage --------
    pub store: ScanStore,

    // -------- Diagnosis --------
    pub provider: Option<Arc<dyn DiagnosisProvider>>,

    // -------- Policy --------
    pub validation: ValidationMode,
}

impl AppState {
    pub fn new(store: ScanStore, validation: ValidationMode) -> Self {
        Self {
            store,
            provider: None,
            validation,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn DiagnosisProvider>) -> Self {
        self.provider = Some(provider);
        self
    }
}
