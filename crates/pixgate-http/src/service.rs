//! Gate HTTP service implementing the hyper `Service` trait.
//!
//! Each request goes through:
//!
//! 1. Request body collection
//! 2. Request context construction
//! 3. The gate pipeline (IP, size, signature)
//! 4. Health check (`GET /healthcheck`, `/health`, `/_health`) or dispatch to
//!    the [`ImageHandler`] if every gate continued
//! 5. Common response headers (`x-request-id`, `Server`)

use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use hyper::service::Service;
use pixgate_core::SecurityConfig;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::body::PixGateResponseBody;
use crate::context::RequestContext;
use crate::dispatch::{ImageHandler, dispatch_request};
use crate::error::HttpError;
use crate::pipeline::{GatePipeline, PipelineOutcome};
use crate::response::{error_to_response, json_response, rejection_to_response};

/// Header carrying the per-request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared, read-only state of the service.
#[derive(Debug)]
struct ServiceState {
    pipeline: GatePipeline,
    trust_forwarded_headers: bool,
    started_at: DateTime<Utc>,
    started: Instant,
}

/// Hyper `Service` that runs the gate pipeline in front of an [`ImageHandler`].
///
/// One instance is built at start-up; [`with_peer_addr`](Self::with_peer_addr)
/// derives the per-connection copy that knows the TCP peer.
#[derive(Debug)]
pub struct GateHttpService<H: ImageHandler> {
    handler: Arc<H>,
    state: Arc<ServiceState>,
    peer_addr: Option<SocketAddr>,
}

impl<H: ImageHandler> GateHttpService<H> {
    /// Create a service with the standard pipeline built from `security`.
    #[must_use]
    pub fn new(handler: Arc<H>, security: &SecurityConfig) -> Self {
        Self::with_pipeline(
            handler,
            GatePipeline::from_config(security),
            security.trust_forwarded_headers,
        )
    }

    /// Create a service around an explicit pipeline.
    #[must_use]
    pub fn with_pipeline(
        handler: Arc<H>,
        pipeline: GatePipeline,
        trust_forwarded_headers: bool,
    ) -> Self {
        Self {
            handler,
            state: Arc::new(ServiceState {
                pipeline,
                trust_forwarded_headers,
                started_at: Utc::now(),
                started: Instant::now(),
            }),
            peer_addr: None,
        }
    }

    /// A copy of this service bound to one connection's peer address.
    #[must_use]
    pub fn with_peer_addr(&self, peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr: Some(peer_addr),
            ..self.clone()
        }
    }
}

impl<H: ImageHandler> Clone for GateHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            state: Arc::clone(&self.state),
            peer_addr: self.peer_addr,
        }
    }
}

impl<H, B> Service<http::Request<B>> for GateHttpService<H>
where
    H: ImageHandler,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: std::fmt::Display + Send,
{
    type Response = http::Response<PixGateResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let state = Arc::clone(&self.state);
        let peer_addr = self.peer_addr;

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let response =
                process_request(req, handler.as_ref(), &state, peer_addr, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    state: &ServiceState,
    peer_addr: Option<SocketAddr>,
    request_id: &str,
) -> http::Response<PixGateResponseBody>
where
    H: ImageHandler,
    B: http_body::Body,
    B::Error: std::fmt::Display,
{
    let (parts, body) = req.into_parts();
    let body = collect_body(body, request_id).await;
    let trust = state.trust_forwarded_headers;

    // An undecodable query runs the gates with no parameters. Its 400 is only
    // sent once every gate has continued.
    let parsed = RequestContext::from_parts(&parts, body.clone(), peer_addr, trust);
    let (ctx, malformed) = match parsed {
        Ok(ctx) => (ctx, None),
        Err(e) => (
            RequestContext::without_query(&parts, body, peer_addr, trust),
            Some(HttpError::BadRequest(e.to_string())),
        ),
    };

    if let PipelineOutcome::Rejected { gate, rejection } = state.pipeline.run(&ctx) {
        warn!(
            request_id,
            method = %ctx.method,
            path = %ctx.path,
            client_ip = ?ctx.client_ip,
            gate,
            status = rejection.status.as_u16(),
            "request rejected"
        );
        return rejection_to_response(&rejection);
    }

    if let Some(err) = malformed {
        warn!(request_id, path = %ctx.path, error = %err, "malformed query string");
        return error_to_response(&err);
    }

    if is_health_check(&ctx.method, &ctx.path) {
        return health_check_response(state, ctx.client_ip);
    }

    info!(
        request_id,
        method = %ctx.method,
        path = %ctx.path,
        client_ip = ?ctx.client_ip,
        "request accepted"
    );
    match dispatch_request(handler, ctx).await {
        Ok(response) => response,
        Err(err) => {
            warn!(request_id, error = %err, "handler failed");
            error_to_response(&err)
        }
    }
}

/// Collect the body. A transport failure yields `None` so that guarded
/// requests fail closed.
async fn collect_body<B>(body: B, request_id: &str) -> Option<Bytes>
where
    B: http_body::Body,
    B::Error: std::fmt::Display,
{
    match body.collect().await {
        Ok(collected) => Some(collected.to_bytes()),
        Err(e) => {
            warn!(request_id, error = %e, "failed to read request body");
            None
        }
    }
}

fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET
        && (path == "/healthcheck" || path == "/health" || path == "/_health")
}

fn health_check_response(
    state: &ServiceState,
    client_ip: Option<IpAddr>,
) -> http::Response<PixGateResponseBody> {
    debug!(client_ip = ?client_ip, "health check");
    json_response(
        http::StatusCode::OK,
        &serde_json::json!({
            "status": "Ok",
            "version": VERSION,
            "started_at": state.started_at.to_rfc3339(),
            "uptime_secs": state.started.elapsed().as_secs(),
            "ip_address": client_ip.map(|ip| ip.to_string()),
        }),
    )
}

fn add_common_headers(
    mut response: http::Response<PixGateResponseBody>,
    request_id: &str,
) -> http::Response<PixGateResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, hv);
    }
    headers.insert(
        http::header::SERVER,
        http::HeaderValue::from_static("pixgate"),
    );

    response
}
