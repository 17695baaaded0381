//! Request gate pipeline and HTTP service for pixgate.
//!
//! This crate sits between the network and the image service:
//!
//! - **Context**: Builds a typed [`RequestContext`] from each request
//! - **Gates**: IP allowlist, dimension allowlist and signature check
//! - **Pipeline**: Runs the gates in order and stops at the first rejection
//! - **Service**: Hyper `Service` that answers rejections and forwards
//!   accepted requests to an [`ImageHandler`]

pub mod body;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod response;
pub mod service;

pub use body::PixGateResponseBody;
pub use context::RequestContext;
pub use dispatch::{HandlerFuture, ImageHandler, NotImplementedHandler};
pub use error::HttpError;
pub use gate::{
    Gate, GateDecision, IpRestrictionGate, Rejection, SignatureGate, SizeRestrictionGate,
};
pub use pipeline::{GatePipeline, PipelineOutcome};
pub use service::GateHttpService;
