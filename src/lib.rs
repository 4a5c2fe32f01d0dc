//! Confluence - technical-indicator signals and composite scoring for crypto assets

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

use config::Config;
use services::SignalEngine;
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<SignalEngine>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let engine = SignalEngine::from_config(config.engine.clone());
        Self {
            config: Arc::new(config),
            engine,
        }
    }
}

// Re-export commonly used types
pub use error::{AppError, SignalError};
pub use services::HistoryStore;
pub use types::*;
