//! HTTP front door.
//!
//! `GET /resources/base.css` serves the bundled stylesheet. Any other `GET`
//! treats everything after the leading `/` (query string included) as the
//! source URL, renders it and answers `200 text/html`, or `500 text/plain`
//! with the failure description.

use crate::relay::Relay;
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Route of the bundled stylesheet.
pub const STYLESHEET_ROUTE: &str = "/resources/base.css";

/// The bundled stylesheet, embedded at compile time.
pub const BASE_CSS: &str = include_str!("../resources/base.css");

/// Build the router for `relay`.
pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route(STYLESHEET_ROUTE, get(stylesheet_handler))
        .route("/", get(article_handler))
        .route("/*url", get(article_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

/// Serve `relay` on an already bound listener until the process ends.
pub async fn serve(listener: TcpListener, relay: Arc<Relay>) -> std::io::Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(relay)).await
}

/// Source URL encoded in a request URI: the raw path and query, minus the
/// leading slash. No validation; a bad URL fails at fetch time.
pub fn source_url(uri: &Uri) -> String {
    let raw = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    raw.strip_prefix('/').unwrap_or(raw).to_string()
}

async fn stylesheet_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], BASE_CSS)
}

async fn article_handler(State(relay): State<Arc<Relay>>, uri: Uri) -> Response {
    let url = source_url(&uri);

    match relay.render(&url).await {
        Ok(output) => {
            for warning in &output.warnings {
                warn!("{}: {}", url, warning);
            }
            Html(output.html).into_response()
        }
        Err(e) => {
            error!("Error retrieving {}: {}", url, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("error retrieving post: {e}"),
            )
                .into_response()
        }
    }
}
