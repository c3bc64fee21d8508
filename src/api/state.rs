//! Application state for the API server

use crate::{Config, JobMachine};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; both fields are cheap handles.
#[derive(Clone)]
pub struct AppState {
    /// The job machine driven by the handlers
    pub machine: JobMachine,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(machine: JobMachine, config: Arc<Config>) -> Self {
        Self { machine, config }
    }
}
