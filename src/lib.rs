//! Moderation gateway: token-gated image moderation with per-token usage
//! metering.
//!
//! The binary in `main.rs` wires configuration, storage and the router from
//! this crate; integration tests in `tests/` drive the same router.

use std::sync::Arc;

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod moderation;
pub mod store;
pub mod tokens;

pub use api::router;

use middleware::auth::AuthGuard;
use middleware::metrics::PrometheusRecorder;
use middleware::usage::UsageRecorder;
use moderation::Analyzer;
use store::DynStore;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub config: config::Config,
    pub store: DynStore,
    pub guard: AuthGuard,
    pub recorder: UsageRecorder,
    pub analyzer: Arc<dyn Analyzer>,
    pub metrics: PrometheusRecorder,
}

impl AppState {
    pub fn new(
        config: config::Config,
        store: DynStore,
        analyzer: Arc<dyn Analyzer>,
    ) -> anyhow::Result<Self> {
        let metrics = PrometheusRecorder::new()?;
        Ok(Self {
            config,
            guard: AuthGuard::new(store.clone()),
            recorder: UsageRecorder::new(store.clone(), metrics.clone()),
            store,
            analyzer,
            metrics,
        })
    }
}
