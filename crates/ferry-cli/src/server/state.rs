//! Application state for the web server.

use std::sync::Arc;

use ferry::Ferry;

/// Default cap on request bodies (uploads).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Library facade; all calls into it block and run on the blocking pool.
    pub ferry: Arc<Ferry>,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(ferry: Ferry) -> Self {
        Self {
            ferry: Arc::new(ferry),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}
