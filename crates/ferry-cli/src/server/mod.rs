//! HTTP API over the Ferry library.

mod app;
mod error;
mod handlers;
mod state;

pub use app::run_server;
pub use state::AppState;
