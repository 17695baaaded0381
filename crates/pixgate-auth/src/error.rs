//! Error types for request signing and verification.

/// Errors that can occur while hashing a body or verifying a signature.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `sig` parameter was present where one was required.
    #[error("Missing signature parameter")]
    MissingSignature,

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// A query component does not decode to UTF-8.
    #[error("Malformed query component: {0}")]
    MalformedQuery(String),

    /// The request body could not be read for hashing.
    #[error("Request body could not be read")]
    BodyUnreadable(#[source] std::io::Error),
}
