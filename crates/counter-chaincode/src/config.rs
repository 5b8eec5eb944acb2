//! # Chaincode Configuration
//!
//! Startup configuration handed to the access guard. The chaincode id comes
//! from the hosting environment once at launch and is passed in explicitly;
//! nothing reads the environment at invocation time.

use crate::domain::value_objects::ChaincodeId;
use crate::errors::ConfigError;

/// Environment variable carrying `<AppId>:<Version>`.
pub const CHAINCODE_ID_ENV: &str = "CORE_CHAINCODE_ID_NAME";

/// Identity attribute that must match the application id.
pub const APP_ID_ATTRIBUTE: &str = "AppId";

/// Identity attribute that must match the invocation channel.
pub const CHANNEL_ID_ATTRIBUTE: &str = "ChannelId";

/// Authorization configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaincodeConfig {
    /// Deployed chaincode id.
    pub chaincode_id: ChaincodeId,
    /// Attribute compared against the application id.
    pub app_id_attribute: String,
    /// Attribute compared against the channel id.
    pub channel_attribute: String,
}

impl ChaincodeConfig {
    /// Configuration for a chaincode id with the default attribute names.
    #[must_use]
    pub fn new(chaincode_id: ChaincodeId) -> Self {
        Self {
            chaincode_id,
            app_id_attribute: APP_ID_ATTRIBUTE.to_string(),
            channel_attribute: CHANNEL_ID_ATTRIBUTE.to_string(),
        }
    }

    /// Parses `<AppId>:<Version>` into a configuration.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(raw.parse()?))
    }

    /// Reads the chaincode id from [`CHAINCODE_ID_ENV`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var(CHAINCODE_ID_ENV)
            .map_err(|_| ConfigError::MissingChaincodeId(CHAINCODE_ID_ENV))?;
        Self::parse(&raw)
    }

    /// Application id expected in [`Self::app_id_attribute`].
    #[must_use]
    pub fn app_id(&self) -> &str {
        self.chaincode_id.app_id()
    }
}
