//! Librarium Server - Library Management System

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use librarium_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("librarium_server={},tower_http=debug", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Librarium Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(
        repository,
        config.auth.clone(),
        config.loans.clone(),
        config.catalog.clone(),
    );

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Catalog
        .route("/books", get(api::books::list_books))
        .route("/books", post(api::books::create_book))
        .route("/books/search", get(api::books::search_books))
        .route("/books/:id", get(api::books::get_book))
        .route("/books/:id", put(api::books::update_book))
        .route("/books/:id", delete(api::books::delete_book))
        .route("/books/:id/cover", put(api::books::upload_cover))
        .route("/genres", get(api::books::list_genres))
        // Loans
        .route("/books/:id/checkout", post(api::loans::checkout))
        .route("/books/:id/return", post(api::loans::return_book))
        .route("/books/:id/renew", post(api::loans::renew))
        .route("/loans/me", get(api::loans::my_loans))
        .route("/users/:id/loans", get(api::loans::get_user_loans))
        // Users
        .route("/users", get(api::users::list_users))
        .route("/users/:id", get(api::users::get_user))
        .route("/users/:id", put(api::users::update_user))
        .route("/users/:id", delete(api::users::delete_user))
        // Reports
        .route("/reports", get(api::reports::get_reports))
        .route("/stats", get(api::reports::get_stats))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
