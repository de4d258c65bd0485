use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::middleware;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use urbix_carpool::{
    config::Config,
    db,
    middleware::rate_limit::{log_request, GLOBAL_BURST, GLOBAL_PER_MILLISECOND},
    notify::{LogNotifier, Notifier, WebhookNotifier},
    routes, AppState,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "urbix_carpool=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Starting server at {}", config.server_addr());

    // Connect to database
    let db = db::connect(&config)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    // Run migrations
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Migrations complete");

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            tracing::info!("Sending notifications to mail relay at {}", url);
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => {
            tracing::info!("No mail relay configured, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let cors = match &config.frontend_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .expect("FRONTEND_ORIGIN must be a valid origin"),
            )
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    // Create app state
    let state = AppState {
        db,
        config: config.clone(),
        notifier,
    };

    // Global per-IP rate limit, applied before authentication
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(GLOBAL_PER_MILLISECOND)
            .burst_size(GLOBAL_BURST)
            .finish()
            .expect("global rate limit config is valid"),
    );

    // Create router with middleware
    let app = routes::create_router(state)
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(GovernorLayer::new(governor_config));

    // Start server with socket address for rate limiting
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
