use order_service::{
    AppState,
    config::{AppConfig, Env, StoreBackend},
    create_router,
    repository::{InMemoryOrderStore, OrderStoreState, PostgresOrderStore},
    serve,
    service::{OrderManager, OrderServiceState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, builds the store, service and
/// router in that order, then serves until interrupted.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // 2. Logging: RUST_LOG wins, otherwise a development-friendly default.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "order_service=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for log aggregation.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!(
        env = ?config.env,
        auth_enabled = config.auth_enabled,
        store = ?config.store_backend,
        "application starting"
    );

    // 3. Store
    let store: OrderStoreState = match config.store_backend {
        StoreBackend::Postgres => {
            tracing::info!("setting up database connection");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&config.db_url)
                .await
                .expect("FATAL: failed to connect to Postgres. Check DATABASE_URL.");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("FATAL: failed to migrate database");

            Arc::new(PostgresOrderStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory order store; data is lost on exit");
            Arc::new(InMemoryOrderStore::new())
        }
    };

    // 4. Service and shared state
    let orders: OrderServiceState = Arc::new(OrderManager::new(store));
    let listen_addr = config.listen_addr.clone();
    let app = create_router(AppState { orders, config });

    // 5. Server
    let listener = TcpListener::bind(&listen_addr)
        .await
        .expect("FATAL: failed to bind listen address");
    tracing::info!("listening on {}", listen_addr);
    tracing::info!("API documentation available at http://{}/swagger-ui", listen_addr);

    serve(listener, app, shutdown_signal())
        .await
        .expect("FATAL: server error");

    tracing::info!("server shut down gracefully");
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
