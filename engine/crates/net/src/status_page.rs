use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::error::NetError;

/// Bind `addr` and serve the status page until shutdown is signalled.
pub async fn run_status_page(addr: &str, shutdown_rx: watch::Receiver<bool>) -> Result<(), NetError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| NetError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    tracing::info!("Status page listening on {}", addr);
    serve_status_page(listener, shutdown_rx).await
}

/// Serve the status page on an already bound listener.
pub async fn serve_status_page(
    listener: TcpListener,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), NetError> {
    let app = router().into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow() {
                if shutdown_rx.changed().await.is_err() {
                    return;
                }
            }
            tracing::info!("Status page shutting down gracefully");
        })
        .await
        .map_err(NetError::Io)
}

fn router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/favicon.ico", get(favicon))
        .fallback(redirect_home)
}

async fn index(ConnectInfo(peer): ConnectInfo<SocketAddr>) -> Html<String> {
    tracing::debug!(%peer, "status page request");
    Html(format!(
        "<html><body><h1>Hello {}:{}</h1></body></html>",
        peer.ip(),
        peer.port()
    ))
}

async fn favicon() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn redirect_home() -> impl IntoResponse {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/")])
}
