//! API server initialization

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::{TcpListener, lookup_host};

use super::middleware::{self, AllowedOrigins};
use super::openapi::{openapi_json, swagger_ui_html};
use super::routes::{entities, health};
use crate::core::CoreApp;
use crate::core::constants::{DEFAULT_BODY_LIMIT, SHUTDOWN_TIMEOUT_SECS};

pub struct ApiServer {
    app: CoreApp,
    allowed_origins: AllowedOrigins,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        let allowed_origins = AllowedOrigins::new(&app.config.server.host, app.config.server.port);
        Self {
            app,
            allowed_origins,
        }
    }

    /// Build the full router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/openapi.json", get(openapi_json))
            .route("/api/docs", get(swagger_ui_html))
            .route("/api/docs/", get(swagger_ui_html))
            .nest("/api/v1/health", health::routes(self.app.reader.clone()))
            .nest("/api/v1/tenants", entities::routes(self.app.search.clone()))
            .fallback(middleware::handle_404)
            .layer(middleware::trace())
            .layer(middleware::cors(&self.allowed_origins))
            .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
    }

    /// Serve until shutdown; returns CoreApp once connections have drained or
    /// [`SHUTDOWN_TIMEOUT_SECS`] has passed since the shutdown signal
    pub async fn start(self) -> Result<CoreApp> {
        let router = self.router();
        let app = self.app;
        let shutdown = app.shutdown.clone();

        let addr = resolve_bind_addr(&app.config.server.host, app.config.server.port).await?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "Listening");

        let serve = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .into_future();
        let drain_deadline = async {
            shutdown.wait().await;
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS)).await;
        };

        tokio::select! {
            result = serve => result?,
            _ = drain_deadline => tracing::warn!(
                timeout_secs = SHUTDOWN_TIMEOUT_SECS,
                "Timeout waiting for open connections to drain"
            ),
        }

        Ok(app)
    }
}

/// Resolve the bind address; host names such as `localhost` go through DNS
async fn resolve_bind_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse() {
        return Ok(SocketAddr::new(ip, port));
    }
    lookup_host((host, port))
        .await
        .with_context(|| format!("Failed to resolve server host {}", host))?
        .next()
        .with_context(|| format!("Server host {} resolved to no addresses", host))
}
