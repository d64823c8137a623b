use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atelier_api::config::ServerConfig;
use atelier_api::router::build_app_router;
use atelier_api::state::AppState;
use atelier_pipeline::clients::{
    build_http_client, HttpFeatureExtractor, HttpImageGenerator, HttpObjectStore,
};
use atelier_pipeline::pg::PgStore;
use atelier_pipeline::{Collaborators, ServiceConfig, Workflow, WorkflowConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "atelier_api=debug,atelier_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    let workflow_config = WorkflowConfig::from_env().expect("Invalid workflow configuration");
    let services = ServiceConfig::from_env().expect("Invalid service configuration");
    tracing::info!(
        host = %config.host,
        port = config.port,
        front_view_cost = workflow_config.front_view_cost,
        remaining_views_cost = workflow_config.remaining_views_cost,
        primary_model = %services.primary_model,
        "Loaded configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = atelier_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    atelier_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    atelier_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Workflow ---
    let http = build_http_client(services.request_timeout).expect("Failed to build HTTP client");
    let ports = Collaborators::with_pg_store(
        PgStore::new(pool.clone()),
        Arc::new(HttpImageGenerator::new(http.clone(), &services)),
        Arc::new(HttpObjectStore::new(http.clone(), &services)),
        Arc::new(HttpFeatureExtractor::new(http, &services)),
    );
    let workflow = Workflow::new(ports, workflow_config);

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        workflow,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
