//! Application state for the API server

use crate::{Config, MediaService};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the service instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The media service
    pub service: Arc<MediaService>,

    /// Configuration the router was built with
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service: Arc<MediaService>, config: Arc<Config>) -> Self {
        Self { service, config }
    }
}
