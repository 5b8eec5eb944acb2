//! # Driving Ports (API - Inbound)
//!
//! The interface the host calls into. One call per transaction proposal.

use crate::domain::entities::{InvocationContext, Response};
use crate::ports::outbound::LedgerStub;
use async_trait::async_trait;

/// Chaincode entry points.
///
/// Both methods always produce an envelope; failures are reported through
/// [`Response::error`], never as a Rust error.
///
/// ## Usage
///
/// ```ignore
/// let response = chaincode.invoke(&stub, &ctx).await;
/// if response.is_success() {
///     host.commit(stub);
/// }
/// ```
#[async_trait]
pub trait Chaincode: Send + Sync {
    /// Called once when the chaincode is instantiated or upgraded.
    async fn init(&self, stub: &dyn LedgerStub, ctx: &InvocationContext) -> Response;

    /// Called for every transaction proposal.
    async fn invoke(&self, stub: &dyn LedgerStub, ctx: &InvocationContext) -> Response;
}
