//! docex-server - REST API server for docex.
//!
//! Exposes batch extraction with a server-sent-events progress stream,
//! single-document extraction, cache administration and history.
//!
//! # Example
//!
//! ```ignore
//! use docex_core::ExtractorConfig;
//! use docex_server::{create_server, create_state};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = create_state(ExtractorConfig::from_env()).await.unwrap();
//!     let app = create_server(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod error;
pub mod factory;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use factory::create_state;
pub use state::AppState;

use axum::{middleware as axum_middleware, Router};
use tower_http::trace::TraceLayer;

/// Create the server with all routes and middleware.
pub fn create_server(state: AppState) -> Router {
    routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}
