//! Device address — the stable hardware identity of a node (typically a MAC).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Characters that would corrupt a topic built from the address.
const RESERVED: [char; 3] = ['/', '+', '#'];

/// Normalized device address.
///
/// Addresses are trimmed and upper-cased so that `aa:bb:cc:dd:ee:01` and
/// `AA:BB:CC:DD:EE:01` name the same node, whichever path created it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceAddress(String);

impl DeviceAddress {
    /// Validate and normalize a raw address.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyAddress`] for blank input and
    /// [`ValidationError::InvalidAddress`] when a topic wildcard or separator is present.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }
        if trimmed.contains(RESERVED) {
            return Err(ValidationError::InvalidAddress(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeviceAddress> for String {
    fn from(value: DeviceAddress) -> Self {
        value.0
    }
}
