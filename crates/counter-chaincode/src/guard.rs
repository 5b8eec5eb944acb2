//! # Access Guard
//!
//! Identity checks run before any business logic.
//!
//! | Check | Attribute | Expected value |
//! |-------|-----------|----------------|
//! | Channel | `ChannelId` | Channel the invocation executes on |
//! | Application | `AppId` | `<AppId>` half of the chaincode id |
//!
//! Both must pass. The dispatcher runs the channel check first.

use crate::config::ChaincodeConfig;
use crate::domain::entities::InvocationContext;
use crate::errors::ChaincodeError;
use tracing::warn;

/// Validates the invoking identity against the configured policies.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    config: ChaincodeConfig,
}

impl AccessGuard {
    /// Create a guard from startup configuration.
    #[must_use]
    pub fn new(config: ChaincodeConfig) -> Self {
        Self { config }
    }

    /// Configuration the guard checks against.
    #[must_use]
    pub fn config(&self) -> &ChaincodeConfig {
        &self.config
    }

    /// The caller's channel attribute must equal the invocation channel.
    pub fn check_channel(&self, ctx: &InvocationContext) -> Result<(), ChaincodeError> {
        self.assert_attribute(ctx, &self.config.channel_attribute, &ctx.channel_id)
    }

    /// The caller's application attribute must equal the configured app id.
    pub fn check_app(&self, ctx: &InvocationContext) -> Result<(), ChaincodeError> {
        self.assert_attribute(ctx, &self.config.app_id_attribute, self.config.app_id())
    }

    /// Channel check, then application check.
    pub fn authorize(&self, ctx: &InvocationContext) -> Result<(), ChaincodeError> {
        self.check_channel(ctx)?;
        self.check_app(ctx)
    }

    fn assert_attribute(
        &self,
        ctx: &InvocationContext,
        attribute: &str,
        expected: &str,
    ) -> Result<(), ChaincodeError> {
        if ctx.identity.assert_attribute_value(attribute, expected) {
            return Ok(());
        }
        warn!(
            attribute,
            expected,
            actual = ?ctx.identity.attribute(attribute),
            msp_id = %ctx.identity.msp_id,
            "Identity attribute mismatch"
        );
        Err(ChaincodeError::Unauthorized {
            attribute: attribute.to_string(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ClientIdentity;

    fn guard() -> AccessGuard {
        AccessGuard::new(ChaincodeConfig::parse("counter:1.0").unwrap())
    }

    fn ctx(identity: ClientIdentity) -> InvocationContext {
        InvocationContext::new("get", vec!["k".into()])
            .on_channel("mychannel")
            .with_identity(identity)
    }

    #[test]
    fn test_authorized_identity_passes() {
        let identity = ClientIdentity::new("Org1MSP")
            .with_attribute("ChannelId", "mychannel")
            .with_attribute("AppId", "counter");
        assert!(guard().authorize(&ctx(identity)).is_ok());
    }

    #[test]
    fn test_wrong_channel_rejected() {
        let identity = ClientIdentity::new("Org1MSP")
            .with_attribute("ChannelId", "otherchannel")
            .with_attribute("AppId", "counter");
        let err = guard().authorize(&ctx(identity)).unwrap_err();
        assert!(matches!(
            err,
            ChaincodeError::Unauthorized { ref attribute } if attribute == "ChannelId"
        ));
        assert_eq!(err.to_string(), "Unauthorized");
    }

    #[test]
    fn test_wrong_app_rejected() {
        let identity = ClientIdentity::new("Org1MSP")
            .with_attribute("ChannelId", "mychannel")
            .with_attribute("AppId", "other-app");
        let err = guard().authorize(&ctx(identity)).unwrap_err();
        assert!(matches!(
            err,
            ChaincodeError::Unauthorized { ref attribute } if attribute == "AppId"
        ));
    }

    #[test]
    fn test_channel_checked_before_app() {
        // Both attributes missing: the channel failure is reported.
        let err = guard()
            .authorize(&ctx(ClientIdentity::new("Org1MSP")))
            .unwrap_err();
        assert!(matches!(
            err,
            ChaincodeError::Unauthorized { ref attribute } if attribute == "ChannelId"
        ));
    }

    #[test]
    fn test_version_is_not_part_of_app_check() {
        let identity = ClientIdentity::new("Org1MSP").with_attribute("AppId", "counter:1.0");
        assert!(guard().check_app(&ctx(identity)).is_err());
    }
}
