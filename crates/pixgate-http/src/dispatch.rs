//! Downstream handler trait and dispatch.

use std::future::Future;
use std::pin::Pin;

use crate::body::PixGateResponseBody;
use crate::context::RequestContext;
use crate::error::HttpError;

/// Boxed future returned by [`ImageHandler::handle`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<PixGateResponseBody>, HttpError>> + Send>>;

/// The image service sitting behind the gates.
///
/// It only ever sees requests the pipeline accepted. This trait is the
/// boundary between the gate layer and whatever serves images.
pub trait ImageHandler: Send + Sync + 'static {
    /// Serve an accepted request.
    fn handle(&self, ctx: RequestContext) -> HandlerFuture;
}

/// Dispatch an accepted request to the handler.
pub async fn dispatch_request<H: ImageHandler>(
    handler: &H,
    ctx: RequestContext,
) -> Result<http::Response<PixGateResponseBody>, HttpError> {
    tracing::debug!(method = %ctx.method, path = %ctx.path, "dispatching accepted request");
    handler.handle(ctx).await
}

/// Default handler that answers every request with 501.
#[derive(Debug, Clone, Default)]
pub struct NotImplementedHandler;

impl ImageHandler for NotImplementedHandler {
    fn handle(&self, ctx: RequestContext) -> HandlerFuture {
        Box::pin(async move {
            Err(HttpError::NotImplemented {
                method: ctx.method,
                path: ctx.path,
            })
        })
    }
}
