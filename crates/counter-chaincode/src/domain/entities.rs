//! # Core Domain Entities
//!
//! Invocation context, ledger records and the response envelope.

use crate::domain::value_objects::DecodedValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// IDENTITY & INVOCATION
// =============================================================================

/// Identity of the client that submitted the invocation.
///
/// Attributes come from the caller's enrollment certificate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// Membership service provider of the caller.
    #[serde(default)]
    pub msp_id: String,
    /// Certificate attributes (name -> value).
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl ClientIdentity {
    /// Creates an identity with no attributes.
    #[must_use]
    pub fn new(msp_id: impl Into<String>) -> Self {
        Self {
            msp_id: msp_id.into(),
            attributes: HashMap::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Looks up an attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Returns true if the attribute is present and equals `expected`.
    #[must_use]
    pub fn assert_attribute_value(&self, name: &str, expected: &str) -> bool {
        self.attribute(name) == Some(expected)
    }
}

/// Everything the host tells the chaincode about one invocation.
///
/// Scoped to a single call and discarded after the response.
#[derive(Clone, Debug, Default)]
pub struct InvocationContext {
    /// Function name requested by the client.
    pub function: String,
    /// Positional string arguments.
    pub args: Vec<String>,
    /// Channel the invocation executes on.
    pub channel_id: String,
    /// Transaction id assigned by the host.
    pub tx_id: String,
    /// Invoking identity.
    pub identity: ClientIdentity,
}

impl InvocationContext {
    /// Creates a context for `function(args...)`.
    #[must_use]
    pub fn new(function: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            function: function.into(),
            args,
            ..Self::default()
        }
    }

    /// Sets the channel.
    #[must_use]
    pub fn on_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    /// Sets the invoking identity.
    #[must_use]
    pub fn with_identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the transaction id.
    #[must_use]
    pub fn with_tx_id(mut self, tx_id: impl Into<String>) -> Self {
        self.tx_id = tx_id.into();
        self
    }
}

// =============================================================================
// LEDGER RECORDS
// =============================================================================

/// A key with its current world-state value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    /// Ledger key.
    pub key: String,
    /// Raw stored bytes.
    pub value: Vec<u8>,
}

/// Commit timestamp of a transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxTimestamp {
    /// Seconds since the Unix epoch.
    pub seconds: i64,
    /// Sub-second nanoseconds.
    pub nanos: i32,
}

impl TxTimestamp {
    /// Current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let elapsed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            seconds: i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
            nanos: i32::try_from(elapsed.subsec_nanos()).unwrap_or(0),
        }
    }
}

/// One historical modification of a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyModification {
    /// Transaction that wrote the value.
    pub tx_id: String,
    /// Value written (empty for deletes).
    pub value: Vec<u8>,
    /// Commit timestamp.
    pub timestamp: TxTimestamp,
    /// Whether the modification deleted the key.
    pub is_delete: bool,
}

/// A decoded entry of a range or history query result.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryRecord {
    /// Current world-state entry.
    State {
        /// Ledger key.
        #[serde(rename = "Key")]
        key: String,
        /// Decoded value.
        #[serde(rename = "Record")]
        record: DecodedValue,
    },
    /// Historical modification of a single key.
    History {
        /// Transaction id.
        #[serde(rename = "TxId")]
        tx_id: String,
        /// Commit timestamp.
        #[serde(rename = "Timestamp")]
        timestamp: TxTimestamp,
        /// Delete flag as text ("true" / "false").
        #[serde(rename = "IsDelete")]
        is_delete: String,
        /// Decoded value.
        #[serde(rename = "Value")]
        value: DecodedValue,
    },
}

// =============================================================================
// RESPONSE ENVELOPE
// =============================================================================

/// Status codes understood by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum ResponseStatus {
    /// Invocation succeeded.
    Ok,
    /// Invocation failed (authorization, validation, business errors).
    ErrorThreshold,
    /// Unknown function.
    NotFound,
}

impl ResponseStatus {
    /// Numeric status code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::ErrorThreshold => 400,
            Self::NotFound => 404,
        }
    }
}

impl From<ResponseStatus> for u16 {
    fn from(status: ResponseStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u16> for ResponseStatus {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(Self::Ok),
            400 => Ok(Self::ErrorThreshold),
            404 => Ok(Self::NotFound),
            other => Err(format!("unknown response status {other}")),
        }
    }
}

/// Response envelope returned to the host for every invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Explicit success flag.
    pub success: bool,
    /// Status code.
    pub status: ResponseStatus,
    /// Failure message (empty on success).
    pub message: String,
    /// Success payload.
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Success envelope.
    #[must_use]
    pub fn success(payload: Option<Vec<u8>>) -> Self {
        Self {
            success: true,
            status: ResponseStatus::Ok,
            message: String::new(),
            payload,
        }
    }

    /// Failure envelope.
    #[must_use]
    pub fn error(status: ResponseStatus, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            message: message.into(),
            payload: None,
        }
    }

    /// Returns true for a success envelope.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_attribute_assertion() {
        let identity = ClientIdentity::new("Org1MSP")
            .with_attribute("AppId", "counter")
            .with_attribute("ChannelId", "mychannel");

        assert!(identity.assert_attribute_value("AppId", "counter"));
        assert!(!identity.assert_attribute_value("AppId", "other"));
        assert!(!identity.assert_attribute_value("Missing", ""));
    }

    #[test]
    fn test_state_record_serialization() {
        let record = QueryRecord::State {
            key: "CAR0".to_string(),
            record: DecodedValue::Json(json!(3)),
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"Key": "CAR0", "Record": 3})
        );
    }

    #[test]
    fn test_history_record_serialization() {
        let record = QueryRecord::History {
            tx_id: "tx1".to_string(),
            timestamp: TxTimestamp {
                seconds: 10,
                nanos: 5,
            },
            is_delete: "false".to_string(),
            value: DecodedValue::Raw("abc".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "TxId": "tx1",
                "Timestamp": {"seconds": 10, "nanos": 5},
                "IsDelete": "false",
                "Value": "abc"
            })
        );
    }

    #[test]
    fn test_response_status_codes() {
        assert_eq!(ResponseStatus::Ok.code(), 200);
        assert_eq!(ResponseStatus::ErrorThreshold.code(), 400);
        assert_eq!(ResponseStatus::NotFound.code(), 404);
        assert_eq!(ResponseStatus::try_from(404), Ok(ResponseStatus::NotFound));
        assert!(ResponseStatus::try_from(418).is_err());
    }

    #[test]
    fn test_response_envelope() {
        let ok = Response::success(Some(b"1".to_vec()));
        assert!(ok.is_success());
        assert_eq!(ok.status, ResponseStatus::Ok);

        let err = Response::error(ResponseStatus::NotFound, "missing");
        assert!(!err.is_success());
        assert!(err.payload.is_none());
        assert_eq!(serde_json::to_value(&err).unwrap()["status"], json!(404));
    }
}
