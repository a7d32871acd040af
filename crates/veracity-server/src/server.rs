use std::net::SocketAddr;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use veracity_access::ExpirySweeper;

use crate::{config::AppConfig, handlers, middleware as app_middleware, state::AppState};

pub struct VeracityServer {
    addr: SocketAddr,
    app: Router,
    sweeper: Option<ExpirySweeper>,
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::system::root))
        .route("/healthz", get(handlers::system::healthz))
        .route("/readyz", get(handlers::system::readyz))
        // User directory
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        // Access grants
        .route(
            "/access",
            get(handlers::access::list_grants).post(handlers::access::create_grant),
        )
        .route("/access/check", get(handlers::access::check_access))
        .route(
            "/access/{id}",
            get(handlers::access::get_grant).delete(handlers::access::purge_grant),
        )
        .route("/access/{id}/revoke", post(handlers::access::revoke_grant))
        // Medical records
        .route(
            "/records",
            get(handlers::records::list_records).post(handlers::records::ingest_record),
        )
        .route(
            "/records/{id}",
            get(handlers::records::get_record).patch(handlers::records::amend_record),
        )
        .with_state(state)
        // Middleware stack (order: request id -> cors/compression/trace -> body limit)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %method,
                        http.target = %uri,
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    state: Option<AppState>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            state: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Provide pre-built state (tests use this to share stores with the
    /// assertions). Defaults to fresh in-memory stores.
    pub fn with_state(mut self, state: AppState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> VeracityServer {
        let state = self.state.unwrap_or_else(AppState::in_memory);
        let app = build_app(&self.config, state.clone());

        let sweeper = self.config.sweep.enabled.then(|| {
            ExpirySweeper::new(state.lifecycle.clone(), self.config.sweep_interval())
        });

        VeracityServer {
            addr: self.addr,
            app,
            sweeper,
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VeracityServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let sweep_handle = self.sweeper.map(|sweeper| sweeper.start());
        if sweep_handle.is_some() {
            tracing::info!("Expiry sweeper started");
        }

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(handle) = sweep_handle {
            handle.abort();
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
