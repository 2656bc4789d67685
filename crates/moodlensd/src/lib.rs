//! moodlensd — HTTP daemon serving emotion detection over one JSON endpoint.

pub mod config;
pub mod engine;
pub mod routes;

use engine::Analyzer;
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<dyn Analyzer>,
}

impl AppState {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self { analyzer }
    }

    pub fn analyzer(&self) -> &dyn Analyzer {
        self.analyzer.as_ref()
    }
}
