//! Gateway server setup
//!
//! Routes, middleware, state assembly and the serve loop.

mod api;
mod error;
mod extract;
mod handler;
mod state;

pub use error::{ApiError, ApiResult};
pub use extract::{CallerId, CALLER_HEADER};
pub use handler::gateway_handler;
pub use state::GatewayState;

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method, Request},
    routing::{get, post},
    Router,
};
use chat_common::{AppConfig, AppError, CorsConfig, SeedConfig};
use chat_core::entities::{Friendship, User};
use chat_core::SnowflakeGenerator;
use chat_db::MemoryStore;
use chat_service::ServiceContext;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/chats", post(api::open_chat).get(api::list_chats))
        .route("/chats/:chat_id/messages", get(api::list_messages))
        .route("/users/:user_id/presence", get(api::user_presence))
        .route("/health", get(api::health_check))
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    let cors = create_cors_layer(&state.config().cors, state.config().app.env.is_production());

    create_router()
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            MakeRequestUuid,
        ))
        .with_state(state)
}

/// CORS from configuration
///
/// Development with no configured origins allows any origin; production with
/// none blocks every cross-origin request.
fn create_cors_layer(config: &CorsConfig, is_production: bool) -> CorsLayer {
    let base_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(extract::CALLER_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]);

    if config.allowed_origins.is_empty() {
        if is_production {
            tracing::warn!(
                "CORS: No allowed origins configured in production mode. \
                 Requests from browsers will be blocked."
            );
            return base_layer.allow_origin(AllowOrigin::list(Vec::<HeaderValue>::new()));
        }
        tracing::warn!("CORS: Allowing any origin (development mode)");
        return base_layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    tracing::info!("CORS: Allowing {} configured origins", origins.len());
    base_layer.allow_origin(AllowOrigin::list(origins))
}

/// Initialize storage and create `GatewayState`
///
/// PostgreSQL when `DATABASE_URL` is set, the in-memory store otherwise.
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    let snowflake_generator = Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id));

    let service_context = match &config.database {
        Some(database) => {
            tracing::info!("Connecting to PostgreSQL...");
            let pool = chat_db::create_pool(database)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            chat_db::run_migrations(&pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            tracing::info!("PostgreSQL connection established");

            ServiceContext::postgres(pool, snowflake_generator)
        }
        None => {
            let store = seeded_memory_store(&config.seed);
            tracing::warn!(
                users = config.seed.users.len(),
                friendships = config.seed.friendships.len(),
                "DATABASE_URL not set, using in-memory storage; data is lost on restart"
            );
            if config.seed.is_empty() {
                tracing::warn!(
                    "No SEED_USERS configured; every chat request will fail until users exist"
                );
            }
            ServiceContext::memory(&store, snowflake_generator)
        }
    };

    Ok(GatewayState::new(service_context, config))
}

/// In-memory store holding the configured seed users and friendships
fn seeded_memory_store(seed: &SeedConfig) -> MemoryStore {
    let store = MemoryStore::new();
    for (id, name) in &seed.users {
        store.insert_user(User::new(*id, name.as_str()));
    }
    for (user_id, friend_id) in &seed.friendships {
        store.add_friendship(&Friendship::new(*user_id, *friend_id));
    }
    store
}

/// Serve the gateway on `listener` until Ctrl+C or SIGTERM
pub async fn serve(listener: TcpListener, state: GatewayState) -> Result<(), AppError> {
    serve_with_shutdown(listener, state, shutdown_signal()).await
}

/// Serve the gateway on `listener` until `shutdown` completes
///
/// Open sockets are asked to close once shutdown begins.
pub async fn serve_with_shutdown(
    listener: TcpListener,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AppError> {
    let addr = listener.local_addr()?;
    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    let connections = state.clone();
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!(
                connections = connections.connections().connection_count(),
                "Shutting down, closing connections"
            );
            connections.connections().shutdown_all();
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.gateway.address();
    let state = create_gateway_state(config).await?;

    let listener = TcpListener::bind(&addr).await?;
    serve(listener, state).await
}
