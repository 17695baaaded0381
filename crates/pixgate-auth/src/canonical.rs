//! Canonical string construction.
//!
//! A parameter set is serialized deterministically so that a client and the
//! server derive the same bytes to sign regardless of how the set was built:
//!
//! ```text
//! name=value&name=value&...
//! ```
//!
//! Every name and value is form-encoded, multi-valued parameters expand into
//! repeated pairs, and the pairs are sorted by encoded name, then encoded value.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::AuthError;

/// Characters that are percent-encoded in form values.
///
/// Everything except ASCII alphanumerics and `-`, `_`, `.`, `~`. Spaces are
/// rewritten to `+` afterwards.
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The value of a single named parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// A parameter that appears once.
    Single(String),
    /// A parameter with an ordered list of values.
    Multi(Vec<String>),
}

impl ParamValue {
    /// The first value, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(v) => Some(v),
            Self::Multi(values) => values.first().map(String::as_str),
        }
    }

    /// All values in order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Multi(values) => values,
        };
        slice.iter().map(String::as_str)
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Multi(vec![first, value]);
            }
            Self::Multi(values) => values.push(value),
        }
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

/// An owned set of named request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: BTreeMap<String, ParamValue>,
}

impl Params {
    /// Create an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw query string.
    ///
    /// A name seen once becomes [`ParamValue::Single`]; a name seen several
    /// times becomes [`ParamValue::Multi`] in query order.
    ///
    /// ```
    /// use pixgate_auth::canonical::{ParamValue, Params};
    ///
    /// let params = Params::from_query("w=100&tag=a&tag=b").unwrap();
    /// assert_eq!(params.first("w"), Some("100"));
    /// assert_eq!(
    ///     params.get("tag"),
    ///     Some(&ParamValue::Multi(vec!["a".into(), "b".into()]))
    /// );
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedQuery`] if a name or value does not
    /// decode to UTF-8. Such a component cannot be re-encoded to the bytes the
    /// client signed.
    pub fn from_query(query: &str) -> Result<Self, AuthError> {
        let mut params = Self::new();
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.append(form_decode(name)?, form_decode(value)?);
        }
        Ok(params)
    }

    /// Set a parameter, replacing any existing values.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.inner.insert(name.into(), value.into());
    }

    /// Add a value to a parameter, keeping existing values.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.inner.entry(name.into()) {
            Entry::Occupied(mut entry) => entry.get_mut().push(value),
            Entry::Vacant(entry) => {
                entry.insert(ParamValue::Single(value));
            }
        }
    }

    /// Remove a parameter and return its value.
    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.inner.remove(name)
    }

    /// Look up a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.inner.get(name)
    }

    /// The first value of a parameter.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.inner.get(name).and_then(ParamValue::first)
    }

    /// Whether the parameter is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Number of distinct parameter names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the set has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// Form-encode a single name or value.
///
/// ```
/// use pixgate_auth::canonical::form_encode;
///
/// assert_eq!(form_encode("/display"), "%2Fdisplay");
/// assert_eq!(form_encode("a b"), "a+b");
/// ```
#[must_use]
pub fn form_encode(input: &str) -> String {
    utf8_percent_encode(input, FORM_ENCODE_SET)
        .to_string()
        .replace("%20", "+")
}

/// Decode a single form-encoded name or value.
///
/// `+` becomes a space, then `%XX` escapes are decoded. Invalid escapes are
/// kept literally.
///
/// # Errors
///
/// Returns [`AuthError::MalformedQuery`] if the decoded bytes are not UTF-8.
pub fn form_decode(input: &str) -> Result<String, AuthError> {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| AuthError::MalformedQuery(input.to_owned()))
}

/// Serialize a parameter set into its canonical string.
#[must_use]
pub fn encode(params: &Params) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .flat_map(|(name, value)| {
            let name = form_encode(name);
            value
                .values()
                .map(move |v| (name.clone(), form_encode(v)))
        })
        .collect();

    pairs.sort_unstable();

    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_encode_empty_set_as_empty_string() {
        assert_eq!(encode(&Params::new()), "");
    }

    #[test]
    fn test_should_skip_empty_multi_value() {
        let mut params = Params::new();
        params.insert("a", Vec::<String>::new());
        params.insert("b", "1");
        assert_eq!(encode(&params), "b=1");
    }

    #[test]
    fn test_should_sort_by_name_then_value() {
        let mut params = Params::new();
        params.insert("w", "100");
        params.insert("h", "100");
        params.insert("tag", vec!["z".to_owned(), "a".to_owned()]);
        assert_eq!(encode(&params), "h=100&tag=a&tag=z&w=100");
    }

    #[test]
    fn test_should_be_independent_of_insertion_order() {
        let forward: Params = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        let backward: Params = [("c", "3"), ("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(encode(&forward), encode(&backward));

        let mut appended = Params::new();
        appended.append("x", "2");
        appended.append("x", "1");
        let mut reversed = Params::new();
        reversed.append("x", "1");
        reversed.append("x", "2");
        assert_eq!(encode(&appended), encode(&reversed));
    }

    #[test]
    fn test_should_sort_on_encoded_names() {
        // Raw "xa" < "x{", but the encoded "x%7B" sorts first.
        let params: Params = [("xa", "2"), ("x{", "1")].into_iter().collect();
        assert_eq!(encode(&params), "x%7B=1&xa=2");
    }

    #[test]
    fn test_should_form_encode_reserved_characters() {
        assert_eq!(form_encode("abcXYZ019"), "abcXYZ019");
        assert_eq!(form_encode("-_.~"), "-_.~");
        assert_eq!(form_encode("a b"), "a+b");
        assert_eq!(form_encode("a+b"), "a%2Bb");
        assert_eq!(form_encode("/x?y=1&z"), "%2Fx%3Fy%3D1%26z");
        assert_eq!(form_encode("*"), "%2A");
        assert_eq!(form_encode("é"), "%C3%A9");
    }

    #[test]
    fn test_should_parse_query_into_single_and_multi_values() {
        let params = Params::from_query("w=100&h=50&tag=a&tag=b&q=a+b%21").unwrap();
        assert_eq!(params.get("w"), Some(&ParamValue::Single("100".into())));
        assert_eq!(
            params.get("tag"),
            Some(&ParamValue::Multi(vec!["a".into(), "b".into()]))
        );
        assert_eq!(params.first("q"), Some("a b!"));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_should_parse_empty_query() {
        assert!(Params::from_query("").unwrap().is_empty());
        assert!(Params::from_query("&&").unwrap().is_empty());
    }

    #[test]
    fn test_should_decode_bare_names_and_literal_percent() {
        let params = Params::from_query("flag&pct=100%&x=%zz").unwrap();
        assert_eq!(params.first("flag"), Some(""));
        assert_eq!(params.first("pct"), Some("100%"));
        assert_eq!(params.first("x"), Some("%zz"));
    }

    #[test]
    fn test_should_roundtrip_utf8_components_through_encoding() {
        let params = Params::from_query("url=caf%C3%A9&q=a+b").unwrap();
        assert_eq!(params.first("url"), Some("café"));
        assert_eq!(encode(&params), "q=a+b&url=caf%C3%A9");
    }

    #[test]
    fn test_should_reject_non_utf8_escapes() {
        let err = Params::from_query("w=100&url=caf%E9").unwrap_err();
        assert!(matches!(err, AuthError::MalformedQuery(ref v) if v == "caf%E9"));
        assert!(Params::from_query("%FF=1").is_err());
        assert!(form_decode("caf%E9").is_err());
    }

    #[test]
    fn test_should_replace_on_insert_and_remove() {
        let mut params = Params::from_query("a=1&a=2").unwrap();
        params.insert("a", "3");
        assert_eq!(params.get("a"), Some(&ParamValue::Single("3".into())));
        assert_eq!(params.remove("a"), Some(ParamValue::Single("3".into())));
        assert!(!params.contains("a"));
    }
}
