//! HMAC-SHA1 signing and body hashing.
//!
//! A signature is the lowercase hex HMAC-SHA1 of a canonical string keyed with
//! the shared [`SecretKey`]. Full-request signatures add three pseudo-parameters
//! before canonicalization:
//!
//! ```text
//! _method    = HTTP method
//! _url       = request path without the query string
//! _body_hash = hex HMAC-SHA1 of the raw body
//! ```

use std::io::Read;

use hmac::{Hmac, KeyInit, Mac};
use sha1::Sha1;

use crate::canonical::{self, Params};
use crate::error::AuthError;
use crate::key::SecretKey;
use crate::verify::{RequestTarget, SIGNATURE_PARAM};

type HmacSha1 = Hmac<Sha1>;

/// Chunk size used when hashing a body from a reader.
const READ_CHUNK_SIZE: usize = 8 * 1024;

fn new_mac(key: &SecretKey) -> HmacSha1 {
    <HmacSha1 as KeyInit>::new_from_slice(key.as_bytes()).expect("HMAC can accept any key length")
}

/// Sign a canonical string.
///
/// ```
/// use pixgate_auth::{SecretKey, sign};
///
/// let key = SecretKey::new("key");
/// assert_eq!(
///     sign(&key, "The quick brown fox jumps over the lazy dog"),
///     "de7c9b85b8b78aa6bc8a7a36f70a90701c9db4d9"
/// );
/// ```
#[must_use]
pub fn sign(key: &SecretKey, canonical: &str) -> String {
    sign_bytes(key, canonical.as_bytes())
}

/// Hash a buffered request body.
///
/// An empty body has a well-defined, non-empty digest.
#[must_use]
pub fn hash_body(key: &SecretKey, body: &[u8]) -> String {
    sign_bytes(key, body)
}

fn sign_bytes(key: &SecretKey, bytes: &[u8]) -> String {
    let mut mac = new_mac(key);
    mac.update(bytes);
    hex::encode(mac.finalize().into_bytes())
}

/// Hash a request body read to completion from `reader`.
///
/// # Errors
///
/// Returns [`AuthError::BodyUnreadable`] if the reader fails. A partial read
/// never produces a digest.
pub fn hash_body_reader<R: Read>(key: &SecretKey, mut reader: R) -> Result<String, AuthError> {
    let mut mac = new_mac(key);
    let mut buf = [0u8; READ_CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(AuthError::BodyUnreadable(e)),
        };
        mac.update(&buf[..n]);
    }
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Append `sig=<signature>` as the last parameter of a query string.
///
/// The result is not re-sorted, so `sig` always ends the string.
///
/// ```
/// use pixgate_auth::append_signature;
///
/// assert_eq!(append_signature("h=1&w=2", "abc"), "h=1&w=2&sig=abc");
/// assert_eq!(append_signature("", "abc"), "sig=abc");
/// ```
#[must_use]
pub fn append_signature(query: &str, signature: &str) -> String {
    let encoded = canonical::form_encode(signature);
    if query.is_empty() {
        format!("{SIGNATURE_PARAM}={encoded}")
    } else {
        format!("{query}&{SIGNATURE_PARAM}={encoded}")
    }
}

/// Sign a parameter set, ignoring any `sig` entry it already carries.
#[must_use]
pub fn sign_parameters(key: &SecretKey, params: &Params) -> String {
    let mut params = params.clone();
    params.remove(SIGNATURE_PARAM);
    sign(key, &canonical::encode(&params))
}

/// Compute the full-request signature for `target` and `params`.
///
/// Pseudo-parameters replace client-supplied values of the same name.
#[must_use]
pub fn sign_request(key: &SecretKey, target: &RequestTarget, params: &Params) -> String {
    sign_parameters(key, &target.bind(params))
}

/// Sign a raw query string together with a method, a path and a body.
///
/// This is what a client computes before sending a request:
///
/// ```
/// use pixgate_auth::{SecretKey, sign_raw};
///
/// let key = SecretKey::new("secret");
/// let sig = sign_raw(&key, "GET", "/display", b"", "w=100&h=100").unwrap();
/// assert_eq!(sig.len(), 40);
/// ```
///
/// # Errors
///
/// Returns [`AuthError::MalformedQuery`] if `query` does not decode to UTF-8.
pub fn sign_raw(
    key: &SecretKey,
    method: &str,
    url: &str,
    body: &[u8],
    query: &str,
) -> Result<String, AuthError> {
    let target = RequestTarget::new(method, url, hash_body(key, body));
    Ok(sign_request(key, &target, &Params::from_query(query)?))
}
