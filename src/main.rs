use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use axum::http::header::STRICT_TRANSPORT_SECURITY;
use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use circulation_api::{
    build_rate_limiter, handlers, middleware_auth,
    store::{BookStore, LoanStore, UserStore},
    store_postgres::{PgBookStore, PgLoanStore, PgUserStore},
    utils::{Argon2Hasher, Clock, CredentialHasher, SystemClock},
    AppState, BookCatalog, Config, LendingWorkflow, LoanLedger, UserDirectory,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,circulation_api=debug,sqlx=warn".into()),
        )
        .json()
        .init();

    info!("Starting circulation API v{}", env!("CARGO_PKG_VERSION"));

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let db = connect_with_retry(&config.database_url)
        .await
        .map_err(|e| anyhow!("Failed to connect to PostgreSQL after retries: {e}"))?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .map_err(|e| anyhow!("Migration failed: {e}"))?;
    info!("Database migrations completed successfully");

    let rate_limiter = build_rate_limiter();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2Hasher);

    let book_store: Arc<dyn BookStore> = Arc::new(PgBookStore::new(db.clone()));
    let user_store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(db.clone()));
    let loan_store: Arc<dyn LoanStore> = Arc::new(PgLoanStore::new(db.clone()));

    let catalog = BookCatalog::new(book_store, clock.clone());
    let directory = UserDirectory::new(user_store, hasher, clock.clone());
    let ledger = LoanLedger::new(loan_store);
    let workflow = Arc::new(LendingWorkflow::new(
        catalog.clone(),
        directory.clone(),
        ledger.clone(),
        clock,
        config.max_borrow_limit,
    ));

    let state = Arc::new(AppState {
        catalog,
        directory,
        ledger,
        workflow,
        config: config.clone(),
        rate_limiter,
    });

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/register", post(handlers::register))
        .route("/api/v1/login", post(handlers::login))
        .route("/api/v1/refresh", post(handlers::refresh_token))
        .route("/api/v1/logout", post(handlers::logout));

    let protected_routes = Router::new()
        .route("/api/v1/books", get(handlers::list_available_books))
        .route("/api/v1/books", post(handlers::add_book))
        .route("/api/v1/books/all", get(handlers::list_all_books))
        .route("/api/v1/books/search", get(handlers::search_books))
        .route("/api/v1/loans", post(handlers::borrow_book))
        .route("/api/v1/loans", get(handlers::borrowed_books))
        .route("/api/v1/loans/return", post(handlers::return_book))
        .route("/api/v1/account", delete(handlers::delete_account))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_auth::auth_middleware,
        ));

    let hsts_value: HeaderValue =
        HeaderValue::from_static("max-age=63072000; includeSubDomains; preload");

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state.clone())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            tower_http::set_header::SetResponseHeaderLayer::if_not_present(
                STRICT_TRANSPORT_SECURITY,
                hsts_value,
            ),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow!("Server error: {e}"))?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn connect_with_retry(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let mut delay = Duration::from_millis(500);
    let max_attempts = 30;

    for attempt in 1..=max_attempts {
        match PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
        {
            Ok(pool) => {
                info!("Connected to PostgreSQL on attempt {attempt}");
                return Ok(pool);
            }
            Err(e) => {
                warn!(
                    "Database connection failed (attempt {}/{}): {e} — retrying in {:?}",
                    attempt, max_attempts, delay
                );
                if attempt == max_attempts {
                    error!("All connection attempts failed");
                    return Err(e);
                }
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(5));
            }
        }
    }
    unreachable!()
}

// ───── Graceful shutdown on Ctrl+C (SIGINT) or Docker SIGTERM ─────
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }

    info!("Shutdown signal received — closing server...");
}
