use axum::Router;
use dotenvy::dotenv;
use sqlx::PgPool;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod config;
mod db;
mod middleware;
mod utils;

use crate::config::Config;
use crate::db::queries::review::ReviewDoc;

#[tokio::main]
async fn main() {
    dotenv().ok();
    Config::init();

    std::fs::create_dir_all("logs").expect("Failed to create logs directory");

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true) // Include target (module path) in logs
        .with_writer(non_blocking) // Write logs to the file
        .init();

    let pool = db::pool::get_db_pool()
        .await
        .expect("Failed to connect to the database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    let merged_doc = ReviewDoc::openapi();

    let app = Router::new()
        .merge(api::health::health_routes())
        .merge(api::review::review_routes())
        .merge(api::review::secure_review_routes())
        .merge(api::review::admin_review_routes())
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", merged_doc.clone()))
        .merge(RapiDoc::with_openapi("/api-docs/rapidoc.json", merged_doc).path("/rapidoc"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(pool.clone());

    run_server(app, pool).await;
    println!("Shutdown complete.");
}

async fn run_server(app: Router, pool: PgPool) {
    let addr = &Config::get().listen_addr;
    println!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr).await.expect("Failed to bind listener");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pool))
        .await
        .expect("Server encountered an error");
}

async fn shutdown_signal(pool: PgPool) {
    signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    println!("Received Ctrl+C, shutting down...");
    println!("🛠️ Closing database pool...");
    pool.close().await;
    println!("✅ Database pool closed. Server shutting down.");
}
