//! Outbound ports: interfaces for side effects outside the booking core
//!
//! Every call through these ports is best-effort from the caller's point of
//! view. A failure is logged by the reconciler and never rolls back the state
//! transition it follows.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Collaborator unreachable or timed out; worth retrying
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// Collaborator answered and refused the request
    #[error("Gateway rejected request: {0}")]
    Rejected(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result of a wallet credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    Applied,
    /// A credit with the same reference was recorded earlier
    AlreadyApplied,
}

/// Idempotent wallet ledger.
///
/// Crediting the same `reference` twice must not move money twice; the
/// second call reports [`CreditOutcome::AlreadyApplied`].
#[async_trait]
pub trait WalletLedger: Send + Sync {
    async fn credit(
        &self,
        user_id: i32,
        reference: &str,
        amount_minor: i64,
        reason: &str,
    ) -> Result<CreditOutcome, GatewayError>;
}

/// Push notification to a single user.
#[async_trait]
pub trait UserNotifier: Send + Sync {
    async fn notify(
        &self,
        user_id: i32,
        title: &str,
        body: &str,
        category: &str,
    ) -> Result<(), GatewayError>;
}

/// Broadcast to every operator (admin) channel.
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    async fn broadcast_to_operators(&self, message: &str, category: &str)
        -> Result<(), GatewayError>;
}
