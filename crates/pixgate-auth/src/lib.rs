//! Canonical request signing and verification for pixgate.
//!
//! Clients sign a request by canonicalizing its parameters together with three
//! pseudo-parameters (`_method`, `_url`, `_body_hash`), computing the
//! HMAC-SHA1 of the result with a shared key, and appending the lowercase hex
//! digest as a trailing `sig` parameter. The server repeats the computation
//! and compares.
//!
//! # Usage
//!
//! ```rust
//! use pixgate_auth::canonical::Params;
//! use pixgate_auth::{RequestTarget, SecretKey, hash_body, sign_request, verify_request};
//!
//! let key = SecretKey::new("secret");
//! let target = RequestTarget::new("GET", "/display", hash_body(&key, b""));
//! let mut params = Params::from_query("w=100&h=100").unwrap();
//!
//! let sig = sign_request(&key, &target, &params);
//! params.insert("sig", sig);
//! assert!(verify_request(&key, &target, &params).is_ok());
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Parameter sets and canonical string encoding
//! - [`error`] - Authentication error types
//! - [`key`] - The shared secret key
//! - [`sign`] - Signing, body hashing and offline signing helpers
//! - [`verify`] - Signature verification

pub mod canonical;
pub mod error;
pub mod key;
pub mod sign;
pub mod verify;

pub use error::AuthError;
pub use key::SecretKey;
pub use sign::{
    append_signature, hash_body, hash_body_reader, sign, sign_parameters, sign_raw, sign_request,
};
pub use verify::{
    BODY_HASH_PARAM, METHOD_PARAM, RequestTarget, SIGNATURE_PARAM, URL_PARAM, split_signature,
    verify_parameters, verify_request, verify_signed_string,
};
