//! Handler used when pixgate runs as a standalone gate.
//!
//! Accepted requests are acknowledged with a small JSON document instead of
//! being served; a deployment that embeds the gate swaps in its own
//! [`ImageHandler`].

use pixgate_http::response::json_response;
use pixgate_http::{HandlerFuture, ImageHandler, RequestContext};

/// Acknowledges every request that made it through the gates.
#[derive(Debug, Clone, Default)]
pub struct GateOnlyHandler;

impl ImageHandler for GateOnlyHandler {
    fn handle(&self, ctx: RequestContext) -> HandlerFuture {
        Box::pin(async move {
            let params: serde_json::Map<String, serde_json::Value> = ctx
                .params
                .iter()
                .map(|(name, value)| {
                    let values: Vec<&str> = value.values().collect();
                    (name.to_owned(), serde_json::json!(values))
                })
                .collect();

            Ok(json_response(
                http::StatusCode::OK,
                &serde_json::json!({
                    "status": "accepted",
                    "method": ctx.method.as_str(),
                    "path": ctx.path,
                    "parameters": params,
                    "body_size": ctx.body.as_ref().map_or(0, |b| b.len()),
                }),
            ))
        })
    }
}
