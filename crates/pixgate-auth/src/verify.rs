//! Signature verification.
//!
//! The signature travels as the `sig` query parameter and MUST be the last
//! parameter of a signed string. Verification removes it, recomputes the
//! signature over what remains and compares the two in constant time.

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::Params;
use crate::error::AuthError;
use crate::key::SecretKey;
use crate::sign::{sign, sign_parameters};

/// Name of the parameter that carries the signature.
pub const SIGNATURE_PARAM: &str = "sig";
/// Pseudo-parameter binding the HTTP method.
pub const METHOD_PARAM: &str = "_method";
/// Pseudo-parameter binding the request path.
pub const URL_PARAM: &str = "_url";
/// Pseudo-parameter binding the body hash.
pub const BODY_HASH_PARAM: &str = "_body_hash";

static TRAILING_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|&)sig=([^&]*)$").expect("static regex is valid"));

/// The parts of a request bound into a full-request signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// HTTP method, e.g. `GET`.
    pub method: String,
    /// Request path without the query string.
    pub url: String,
    /// Hex digest produced by [`hash_body`](crate::hash_body).
    pub body_hash: String,
}

impl RequestTarget {
    /// Create a new target.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        body_hash: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body_hash: body_hash.into(),
        }
    }

    /// Copy `params` and inject the pseudo-parameters, replacing any
    /// client-supplied values with the same names.
    #[must_use]
    pub fn bind(&self, params: &Params) -> Params {
        let mut bound = params.clone();
        bound.insert(METHOD_PARAM, self.method.as_str());
        bound.insert(URL_PARAM, self.url.as_str());
        bound.insert(BODY_HASH_PARAM, self.body_hash.as_str());
        bound
    }
}

/// Split a signed string into its unsigned prefix and the decoded signature.
///
/// Only a trailing `sig` parameter is recognised.
///
/// ```
/// use pixgate_auth::split_signature;
///
/// assert_eq!(
///     split_signature("h=1&w=2&sig=abc"),
///     Some(("h=1&w=2", "abc".to_owned()))
/// );
/// assert_eq!(split_signature("sig=abc&w=2"), None);
/// ```
#[must_use]
pub fn split_signature(signed: &str) -> Option<(&str, String)> {
    let caps = TRAILING_SIGNATURE.captures(signed)?;
    let whole = caps.get(0)?;
    let raw = caps.get(1)?.as_str();
    let signature = percent_decode_str(raw).decode_utf8_lossy().into_owned();
    Some((&signed[..whole.start()], signature))
}

/// Verify a string whose last parameter is `sig`.
///
/// # Errors
///
/// [`AuthError::MissingSignature`] if there is no trailing `sig`,
/// [`AuthError::SignatureDoesNotMatch`] if it is wrong.
pub fn verify_signed_string(key: &SecretKey, signed: &str) -> Result<(), AuthError> {
    let (unsigned, provided) = split_signature(signed).ok_or(AuthError::MissingSignature)?;
    compare(&sign(key, unsigned), &provided)
}

/// Verify a parameter set carrying its own `sig` entry.
///
/// The entry is removed by name before the set is canonicalized.
pub fn verify_parameters(key: &SecretKey, params: &Params) -> Result<(), AuthError> {
    let provided = params
        .first(SIGNATURE_PARAM)
        .ok_or(AuthError::MissingSignature)?;
    compare(&sign_parameters(key, params), provided)
}

/// Verify a full request: method, path, body hash and parameters.
pub fn verify_request(
    key: &SecretKey,
    target: &RequestTarget,
    params: &Params,
) -> Result<(), AuthError> {
    debug!(method = %target.method, url = %target.url, "Verifying request signature");
    verify_parameters(key, &target.bind(params))
}

fn compare(expected: &str, provided: &str) -> Result<(), AuthError> {
    if expected.as_bytes().ct_eq(provided.as_bytes()).into() {
        Ok(())
    } else {
        debug!(provided = %provided, "Signature mismatch");
        Err(AuthError::SignatureDoesNotMatch)
    }
}

#[cfg(test)]
mod tests {
    use hmac::{Hmac, KeyInit, Mac};
    use sha1::Sha1;

    use super::*;
    use crate::canonical::encode;
    use crate::sign::{append_signature, hash_body, sign_request};

    fn reference_hmac(key: &str, data: &str) -> String {
        let mut mac = <Hmac<Sha1> as KeyInit>::new_from_slice(key.as_bytes()).unwrap();
        mac.update(data.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_should_roundtrip_signed_string() {
        let key = SecretKey::new("secret");
        for canonical in ["", "a=1", "h=100&w=100", "x=%2F&y=a+b"] {
            let signed = append_signature(canonical, &sign(&key, canonical));
            assert!(verify_signed_string(&key, &signed).is_ok(), "{signed}");
        }
    }

    #[test]
    fn test_should_detect_single_character_tampering() {
        let key = SecretKey::new("secret");
        let canonical = "h=100&w=100";
        let signed = append_signature(canonical, &sign(&key, canonical));

        for (i, c) in canonical.char_indices() {
            let replacement = if c == '1' { '2' } else { '1' };
            let mut tampered = signed.clone();
            tampered.replace_range(i..=i, &replacement.to_string());
            assert!(
                verify_signed_string(&key, &tampered).is_err(),
                "tampered at {i}: {tampered}"
            );
        }
    }

    #[test]
    fn test_should_reject_wrong_key() {
        let canonical = "w=1";
        let signed = append_signature(canonical, &sign(&SecretKey::new("a"), canonical));
        assert!(matches!(
            verify_signed_string(&SecretKey::new("b"), &signed),
            Err(AuthError::SignatureDoesNotMatch)
        ));
    }

    #[test]
    fn test_should_only_strip_trailing_signature() {
        assert_eq!(split_signature("w=1&sig=ab"), Some(("w=1", "ab".to_owned())));
        assert_eq!(split_signature("sig=ab"), Some(("", "ab".to_owned())));
        assert_eq!(split_signature("w=1&sig="), Some(("w=1", String::new())));
        assert_eq!(split_signature("w=1&xsig=ab"), None);
        assert_eq!(split_signature("sig=ab&w=1"), None);
        assert!(matches!(
            verify_signed_string(&SecretKey::new("k"), "sig=ab&w=1"),
            Err(AuthError::MissingSignature)
        ));
    }

    #[test]
    fn test_should_verify_parameters_with_embedded_signature() {
        let key = SecretKey::new("secret");
        let mut params = Params::from_query("w=100&h=100").unwrap();
        let sig = sign(&key, &encode(&params));
        params.insert(SIGNATURE_PARAM, sig);
        assert!(verify_parameters(&key, &params).is_ok());

        params.insert("w", "101");
        assert!(matches!(
            verify_parameters(&key, &params),
            Err(AuthError::SignatureDoesNotMatch)
        ));
    }

    #[test]
    fn test_should_require_signature_parameter() {
        let params = Params::from_query("w=100").unwrap();
        assert!(matches!(
            verify_parameters(&SecretKey::new("secret"), &params),
            Err(AuthError::MissingSignature)
        ));
    }

    #[test]
    fn test_should_produce_identical_signatures_for_permuted_sets() {
        let key = SecretKey::new("secret");
        let a: Params = [("w", "1"), ("h", "2"), ("url", "http://x")]
            .into_iter()
            .collect();
        let b: Params = [("url", "http://x"), ("h", "2"), ("w", "1")]
            .into_iter()
            .collect();
        let target = RequestTarget::new("GET", "/display", hash_body(&key, b""));
        assert_eq!(sign_request(&key, &target, &a), sign_request(&key, &target, &b));
    }

    #[test]
    fn test_should_match_reference_signature_for_display_request() {
        let key = SecretKey::new("secret");
        let body_hash = reference_hmac("secret", "");
        let expected = reference_hmac(
            "secret",
            &format!("_body_hash={body_hash}&_method=GET&_url=%2Fdisplay&h=100&w=100"),
        );

        let params = Params::from_query("w=100&h=100").unwrap();
        let target = RequestTarget::new("GET", "/display", hash_body(&key, b""));
        assert_eq!(sign_request(&key, &target, &params), expected);

        let mut signed = params.clone();
        signed.insert(SIGNATURE_PARAM, expected);
        assert!(verify_request(&key, &target, &signed).is_ok());
    }

    #[test]
    fn test_should_strip_and_reject_bogus_signature() {
        let key = SecretKey::new("secret");
        let target = RequestTarget::new("GET", "/display", hash_body(&key, b""));

        let params = Params::from_query("w=100&h=100&sig=deadbeef").unwrap();
        assert!(matches!(
            verify_request(&key, &target, &params),
            Err(AuthError::SignatureDoesNotMatch)
        ));

        let canonical = encode(&target.bind(&Params::from_query("w=100&h=100").unwrap()));
        let signed = format!("{canonical}&sig=deadbeef");
        let (unsigned, provided) = split_signature(&signed).unwrap();
        assert_eq!(unsigned, canonical);
        assert_eq!(provided, "deadbeef");
        assert!(matches!(
            verify_signed_string(&key, &signed),
            Err(AuthError::SignatureDoesNotMatch)
        ));
    }

    #[test]
    fn test_should_bind_body_into_request_signature() {
        let key = SecretKey::new("secret");
        let params = Params::from_query("a=1").unwrap();
        let one = RequestTarget::new("POST", "/upload", hash_body(&key, b"one"));
        let two = RequestTarget::new("POST", "/upload", hash_body(&key, b"two"));

        let mut signed = params.clone();
        signed.insert(SIGNATURE_PARAM, sign_request(&key, &one, &params));
        assert!(verify_request(&key, &one, &signed).is_ok());
        assert!(verify_request(&key, &two, &signed).is_err());
    }
}
