//! HTTP load balancing server.
//!
//! # Responsibilities
//! - Create Axum Router forwarding every method and path
//! - Pick a target per request and forward the request to it
//! - Stream the backend response back unmodified
//! - Map selection and upstream failures to 503 / 502 / 504
//! - Abort response bodies that stall past the relay deadline
//! - Stop accepting on shutdown and give in-flight requests a bounded drain

use axum::{
    body::Body,
    extract::State,
    http::{header, uri::Scheme, HeaderValue, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tower_http::{timeout::TimeoutBody, trace::TraceLayer};

use crate::config::TimeoutConfig;
use crate::lifecycle::shutdown::DEFAULT_DRAIN_TIMEOUT;
use crate::load_balancer::Pool;
use crate::resilience::timeouts::with_deadline;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<Pool>,
    pub client: Client<HttpConnector, Body>,
    pub relay_timeout: Option<Duration>,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    drain_timeout: Duration,
}

impl HttpServer {
    pub fn new(pool: Arc<Pool>, timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(timeouts.connect());

        // A fresh backend connection per proxied request.
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(connector);

        let state = AppState {
            pool,
            client,
            relay_timeout: timeouts.relay(),
        };

        Self {
            router: Self::build_router(state),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Serve requests on `listener` until shutdown is signalled.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Loadbalancing via http");

        let (signalled_tx, signalled_rx) = oneshot::channel();
        let server = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal, no longer accepting");
                let _ = signalled_tx.send(());
            })
            .into_future();

        // Starts counting only once shutdown has begun.
        let drain_timeout = self.drain_timeout;
        let drain_deadline = async move {
            match signalled_rx.await {
                Ok(()) => tokio::time::sleep(drain_timeout).await,
                Err(_) => std::future::pending().await,
            }
        };

        tokio::select! {
            result = server => result?,
            _ = drain_deadline => {
                tracing::warn!("Drain timeout reached, abandoning in-flight requests");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward one request to the next healthy target.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let target = match state.pool.next() {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!(
                method = %method,
                path = %path,
                error = %e,
                "Error fetching next target"
            );
            return (StatusCode::SERVICE_UNAVAILABLE, "No healthy targets").into_response();
        }
    };

    let (mut parts, body) = request.into_parts();
    parts.uri = match backend_uri(&parts.uri, target.address()) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(backend = %target.address(), error = %e, "Invalid backend URI");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };
    if let Ok(host) = HeaderValue::from_str(target.address()) {
        parts.headers.insert(header::HOST, host);
    }
    // The backend client speaks HTTP/1.1 regardless of how the client arrived.
    parts.version = Version::HTTP_11;

    tracing::debug!(
        method = %method,
        path = %path,
        backend = %target.address(),
        "Loadbalancing to target"
    );

    let forwarded = Request::from_parts(parts, body);
    match with_deadline(state.relay_timeout, state.client.request(forwarded)).await {
        Ok(Ok(response)) => {
            let (parts, body) = response.into_parts();
            // Headers are already on their way; a stalled body can only be cut off.
            let body = match state.relay_timeout {
                Some(limit) => Body::new(TimeoutBody::new(limit, body)),
                None => Body::new(body),
            };
            Response::from_parts(parts, body)
        }
        Ok(Err(e)) => {
            tracing::warn!(backend = %target.address(), error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
        Err(_) => {
            tracing::warn!(backend = %target.address(), "Upstream timed out");
            (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
        }
    }
}

/// Point `original` at `authority` over plain HTTP, keeping path and query.
fn backend_uri(original: &Uri, authority: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(authority)
        .path_and_query(path_and_query)
        .build()
}
