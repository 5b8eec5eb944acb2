//! # Value Objects
//!
//! Immutable domain primitives for the counter chaincode.
//! These types represent concepts that are defined by their value, not identity.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

// =============================================================================
// CHAINCODE ID (<AppId>:<Version>)
// =============================================================================

/// Parsed chaincode identifier of the form `<AppId>:<Version>`.
///
/// The host hands this string to the process at launch. Only the `AppId`
/// half takes part in authorization.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChaincodeId {
    app_id: String,
    version: Option<String>,
}

impl ChaincodeId {
    /// Creates an id from its parts.
    #[must_use]
    pub fn new(app_id: impl Into<String>, version: Option<String>) -> Self {
        Self {
            app_id: app_id.into(),
            version,
        }
    }

    /// Application identifier expected in the caller's `AppId` attribute.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Deployed version, if the id carried one.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl FromStr for ChaincodeId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (app_id, version) = match s.split_once(':') {
            Some((app, version)) => (app, Some(version)),
            None => (s, None),
        };
        let app_id = app_id.trim();
        if app_id.is_empty() {
            return Err(ConfigError::InvalidChaincodeId(s.to_string()));
        }
        let version = version
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Ok(Self::new(app_id, version))
    }
}

impl fmt::Display for ChaincodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}:{version}", self.app_id),
            None => f.write_str(&self.app_id),
        }
    }
}

// =============================================================================
// COUNTER VALUE
// =============================================================================

/// A counter's numeric value.
///
/// Stored on the ledger as a base-10 string. Anything that is not a number
/// (absent key, empty payload, garbage) reads as zero. A number outside the
/// signed 64-bit range is not a counter value at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CounterValue(pub i64);

impl CounterValue {
    /// The zero counter.
    pub const ZERO: Self = Self(0);

    /// Parses a stored payload, treating absent or non-numeric data as zero.
    ///
    /// Returns `None` for a decimal integer that does not fit in `i64`.
    #[must_use]
    pub fn from_payload(payload: Option<&[u8]>) -> Option<Self> {
        let Some(text) = payload.and_then(|bytes| std::str::from_utf8(bytes).ok()) else {
            return Some(Self::ZERO);
        };
        match text.trim().parse::<i64>() {
            Ok(value) => Some(Self(value)),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => None,
                _ => Some(Self::ZERO),
            },
        }
    }

    /// Returns true if the counter is zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Decimal string encoding written back to the ledger.
    #[must_use]
    pub fn to_payload(self) -> Vec<u8> {
        self.0.to_string().into_bytes()
    }
}

impl fmt::Display for CounterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CounterValue {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

// =============================================================================
// DECODED VALUE
// =============================================================================

/// A ledger value decoded for query results.
///
/// Values are read as UTF-8 text; text that parses as JSON is kept
/// structured, anything else is carried as raw text.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    /// Value parsed as a JSON document.
    Json(serde_json::Value),
    /// Value that is not valid JSON.
    Raw(String),
}

impl DecodedValue {
    /// Decodes raw ledger bytes.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        match serde_json::from_str(&text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Raw(text.into_owned()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
