//! Server Module
//!
//! HTTP front-end over a shared engine.
//!
//! ## Architecture
//! - axum router on a tokio runtime
//! - One engine per process, injected through `AppState`
//! - Every request locks the engine for the duration of its storage calls
//!
//! ## Routes
//! ```text
//! GET    /                 welcome message
//! POST   /auth/register    create a user
//! POST   /auth/login       check credentials
//! GET    /auth/me          current user          (Basic auth)
//! GET    /keys             all public pairs      (Basic auth)
//! POST   /keys             create a pair         (Basic auth)
//! GET    /keys/{key}       read a pair           (Basic auth)
//! PUT    /keys/{key}       replace a pair        (Basic auth)
//! DELETE /keys/{key}       remove a pair         (Basic auth)
//! ```

pub mod auth;
mod error;
mod routes;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use crate::error::Result;

pub use auth::{AuthResponse, AuthUser, Credentials, USER_KEY_PREFIX};
pub use error::ApiError;
pub use routes::KvEntry;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    engine: Arc<Mutex<Engine>>,
}

impl AppState {
    /// Wrap an engine for sharing between requests
    pub fn new(engine: Engine) -> Self {
        Self::from_shared(Arc::new(Mutex::new(engine)))
    }

    /// Use an engine that is already shared
    pub fn from_shared(engine: Arc<Mutex<Engine>>) -> Self {
        Self { engine }
    }

    /// Get the shared engine
    pub fn engine(&self) -> &Arc<Mutex<Engine>> {
        &self.engine
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/keys", get(routes::list_keys).post(routes::create_key))
        .route(
            "/keys/{key}",
            get(routes::get_key)
                .put(routes::update_key)
                .delete(routes::delete_key),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve requests until `shutdown` resolves, then flush the engine
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on http://{}", addr);
    }

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped, flushing buckets");
    state.engine().lock().flush()
}
