use std::sync::Arc;

use atelier_pipeline::Workflow;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool and workflow are reference-counted inside.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: atelier_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The four-phase generation workflow.
    pub workflow: Workflow,
}
