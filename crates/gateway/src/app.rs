//! Application state and route registration

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use carimbo_cache::ArtifactCache;
use carimbo_core::{Error, Result};
use carimbo_fetch::ReleaseClient;
use tera::Tera;
use tower_http::compression::CompressionLayer;

use crate::handlers;

const SHELL_TEMPLATE: &str = include_str!("../templates/shell.html");

/// Everything the handlers need, constructed once at startup and injected.
pub struct AppState {
    /// Single-flight artifact cache, process-wide
    pub cache: ArtifactCache,
    /// Client for the remote release store
    pub fetcher: ReleaseClient,
    /// Compiled HTML shell template
    pub templates: Tera,
}

impl AppState {
    /// Build the application state around a release client.
    ///
    /// # Errors
    ///
    /// Fails only if the embedded shell template does not compile.
    pub fn new(fetcher: ReleaseClient) -> Result<Self> {
        let mut templates = Tera::default();
        templates
            .add_raw_template("shell", SHELL_TEMPLATE)
            .map_err(|e| Error::internal(format!("failed to compile shell template: {e}")))?;

        Ok(Self {
            cache: ArtifactCache::new(),
            fetcher,
            templates,
        })
    }
}

/// Build the gateway router.
///
/// Every response passes through gzip transport compression, mirroring the
/// deployment this gateway fronts.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/favicon.ico", get(handlers::favicon))
        .route("/{runtime}/{org}/{repo}/{release}/", get(handlers::shell))
        .route(
            "/{runtime}/{org}/{repo}/{release}/{artifact}",
            get(handlers::artifact),
        )
        .layer(CompressionLayer::new())
        .with_state(state)
}
