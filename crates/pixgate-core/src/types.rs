//! Value types shared by the configuration and the gates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PixGateError;

/// A `(width, height)` pair permitted by the dimension allowlist.
///
/// The textual form used in environment variables is `WIDTHxHEIGHT`.
///
/// # Examples
///
/// ```
/// use pixgate_core::AllowedSize;
///
/// let size: AllowedSize = "100x200".parse().unwrap();
/// assert_eq!(size, AllowedSize::new(100, 200));
/// assert_eq!(size.to_string(), "100x200");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AllowedSize {
    /// Requested width in pixels.
    pub width: i64,
    /// Requested height in pixels.
    pub height: i64,
}

impl AllowedSize {
    /// Create a new allowlist entry.
    #[must_use]
    pub fn new(width: i64, height: i64) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for AllowedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl TryFrom<String> for AllowedSize {
    type Error = PixGateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AllowedSize> for String {
    fn from(size: AllowedSize) -> Self {
        size.to_string()
    }
}

impl FromStr for AllowedSize {
    type Err = PixGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PixGateError::Config(format!("invalid size {s:?}, expected WIDTHxHEIGHT"));

        let (width, height) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(invalid)?;
        let width = width.trim().parse().map_err(|_| invalid())?;
        let height = height.trim().parse().map_err(|_| invalid())?;

        Ok(Self { width, height })
    }
}

/// What the dimension gate does when `w`/`h` are present but unusable.
///
/// A request that carries neither parameter never reaches this policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SizePolicy {
    /// Let the request through unchecked.
    #[default]
    FailOpen,
    /// Reject the request as if the size were not allowed.
    FailClosed,
}

impl SizePolicy {
    /// The configuration spelling of this policy.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FailOpen => "fail-open",
            Self::FailClosed => "fail-closed",
        }
    }
}

impl fmt::Display for SizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizePolicy {
    type Err = PixGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "open" => Ok(Self::FailOpen),
            "fail-closed" | "closed" => Ok(Self::FailClosed),
            other => Err(PixGateError::Config(format!(
                "invalid size policy {other:?}, expected fail-open or fail-closed"
            ))),
        }
    }
}
