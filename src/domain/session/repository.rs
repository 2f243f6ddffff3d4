//! Session repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Receipt, Session, SessionStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Session>>;

    /// The initiated or active session occupying a charger, if any
    async fn find_open_for_charger(&self, charger_id: i32) -> DomainResult<Option<Session>>;

    /// Insert an `initiated` session, plus its receipt when
    /// `paid_amount_minor > 0`, in one transaction. A second open session on
    /// the same charger surfaces as `DomainError::Conflict`.
    async fn create_initiated(
        &self,
        user_id: i32,
        charger_id: i32,
        paid_amount_minor: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Session>;

    /// `initiated` sessions created strictly before `cutoff`
    async fn find_stale(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Session>>;

    /// Conditional transition on the persisted status. Terminal targets
    /// stamp `ended_at = now`. Returns `None` when the row is no longer in
    /// `from`.
    async fn transition(
        &self,
        id: i32,
        from: SessionStatus,
        to: SessionStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Session>>;

    async fn find_receipt(&self, session_id: i32) -> DomainResult<Option<Receipt>>;

    /// Non-zero receipts of `failed` sessions not yet marked refunded
    async fn find_pending_refunds(&self) -> DomainResult<Vec<Receipt>>;

    /// Stamp `refunded_at` once. Returns false when it was already set.
    async fn mark_refunded(&self, receipt_id: i32, now: DateTime<Utc>) -> DomainResult<bool>;
}
