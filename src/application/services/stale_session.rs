//! Background task that fails sessions the charger never acknowledged.
//!
//! A session stuck in `initiated` past the timeout is moved to `failed`
//! through a guarded transition. Only the winner refunds the receipt,
//! notifies the user and alerts operators. A refund the ledger never
//! confirmed leaves the receipt without `refunded_at` and is retried on every
//! later run. Refunds carry the reference `session-timeout:<id>`, so a ledger
//! that has already seen it does not pay again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::application::ports::{CreditOutcome, OperatorNotifier, UserNotifier, WalletLedger};
use crate::domain::session::{Receipt, Session, SessionStatus};
use crate::domain::{DomainResult, RepositoryProvider};
use crate::shared::retry::{retry_with_backoff, RetryConfig};
use crate::shared::shutdown::ShutdownSignal;

pub const DEFAULT_STALE_CHECK_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_STALE_TIMEOUT_SECS: u64 = 300;

pub const REFUND_REASON: &str = "Refund: Session timed out (charger did not respond)";
const USER_TITLE: &str = "Session Timed Out";
const USER_CATEGORY: &str = "ERROR";
const OPERATOR_CATEGORY: &str = "STALE_SESSION_CLEANUP";
const REFUND_TITLE: &str = "Refund Issued";
const REFUND_CATEGORY: &str = "REFUND";

pub fn refund_reference(session_id: i32) -> String {
    format!("session-timeout:{}", session_id)
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaleSessionReport {
    pub scanned: usize,
    pub failed_sessions: usize,
    pub refunded: usize,
    /// Acknowledged or failed by someone else between scan and transition
    pub skipped: usize,
    /// Storage or gateway errors (the batch continued)
    pub errors: usize,
    /// Refunds attempted this run that are still owed
    pub refunds_pending: usize,
}

pub struct StaleSessionReconciler {
    repos: Arc<dyn RepositoryProvider>,
    wallet: Arc<dyn WalletLedger>,
    users: Arc<dyn UserNotifier>,
    operators: Arc<dyn OperatorNotifier>,
    timeout: chrono::Duration,
    retry: RetryConfig,
}

impl StaleSessionReconciler {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        wallet: Arc<dyn WalletLedger>,
        users: Arc<dyn UserNotifier>,
        operators: Arc<dyn OperatorNotifier>,
    ) -> Self {
        Self {
            repos,
            wallet,
            users,
            operators,
            timeout: chrono::Duration::seconds(DEFAULT_STALE_TIMEOUT_SECS as i64),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = chrono::Duration::from_std(timeout).unwrap_or(self.timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn timeout_minutes(&self) -> i64 {
        self.timeout.num_minutes().max(1)
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> DomainResult<StaleSessionReport> {
        let mut report = StaleSessionReport::default();

        // refunds owed from earlier runs go first, so a session failed in
        // this run gets exactly one round of attempts
        self.retry_pending_refunds(now, &mut report).await?;

        let cutoff = now - self.timeout;
        let stale = self.repos.sessions().find_stale(cutoff).await?;
        report.scanned = stale.len();
        if stale.is_empty() {
            return Ok(report);
        }

        info!(count = stale.len(), %cutoff, "Failing stale sessions");

        for session in stale {
            let transitioned = self
                .repos
                .sessions()
                .transition(session.id, SessionStatus::Initiated, SessionStatus::Failed, now)
                .await;

            match transitioned {
                Ok(Some(failed)) => {
                    report.failed_sessions += 1;
                    metrics::counter!("sessions_failed_total", "reason" => "timeout").increment(1);
                    warn!(
                        session_id = failed.id,
                        charger_id = failed.charger_id,
                        user_id = failed.user_id,
                        created_at = %failed.created_at,
                        "⚠️ Stale session auto-failed"
                    );
                    self.settle(&failed, now, &mut report).await;
                }
                Ok(None) => {
                    report.skipped += 1;
                    debug!(session_id = session.id, "Session left initiated before cleanup");
                }
                Err(e) => {
                    report.errors += 1;
                    warn!(session_id = session.id, error = %e, "Failed to fail stale session");
                }
            }
        }

        Ok(report)
    }

    /// Credit receipts of sessions failed in earlier runs whose refund never
    /// got through. The ledger reference keeps a repeat from paying twice.
    async fn retry_pending_refunds(
        &self,
        now: DateTime<Utc>,
        report: &mut StaleSessionReport,
    ) -> DomainResult<()> {
        let pending = self.repos.sessions().find_pending_refunds().await?;
        if pending.is_empty() {
            return Ok(());
        }
        info!(count = pending.len(), "Retrying pending refunds");

        for receipt in pending {
            if self.refund(&receipt, now, report).await == RefundState::Paid {
                let body = format!(
                    "The refund for your timed out charging session has been credited to your wallet ({} minor units).",
                    receipt.amount_minor
                );
                if let Err(e) = self
                    .users
                    .notify(receipt.user_id, REFUND_TITLE, &body, REFUND_CATEGORY)
                    .await
                {
                    warn!(session_id = receipt.session_id, error = %e, "User notification failed");
                }
            }
        }
        Ok(())
    }

    /// Credit the wallet for `receipt` and stamp it refunded.
    async fn refund(
        &self,
        receipt: &Receipt,
        now: DateTime<Utc>,
        report: &mut StaleSessionReport,
    ) -> RefundState {
        let reference = refund_reference(receipt.session_id);
        let credited = retry_with_backoff(
            &self.retry,
            || {
                self.wallet.credit(
                    receipt.user_id,
                    &reference,
                    receipt.amount_minor,
                    REFUND_REASON,
                )
            },
            |e| e.is_transient(),
            "wallet_credit",
        )
        .await;

        match credited {
            Ok(CreditOutcome::Applied) => {
                report.refunded += 1;
                metrics::counter!("refunds_issued_total").increment(1);
                info!(
                    session_id = receipt.session_id,
                    user_id = receipt.user_id,
                    amount_minor = receipt.amount_minor,
                    "💸 Refunded stale session"
                );
            }
            Ok(CreditOutcome::AlreadyApplied) => {
                debug!(session_id = receipt.session_id, %reference, "Refund already recorded");
            }
            Err(e) => {
                report.errors += 1;
                report.refunds_pending += 1;
                metrics::counter!("refunds_deferred_total").increment(1);
                warn!(
                    session_id = receipt.session_id,
                    error = %e,
                    "Refund failed, will retry next run"
                );
                return RefundState::Pending;
            }
        }

        // a failed stamp only costs a deduplicated credit next run
        if let Err(e) = self.repos.sessions().mark_refunded(receipt.id, now).await {
            report.errors += 1;
            warn!(session_id = receipt.session_id, error = %e, "Failed to mark receipt refunded");
        }
        RefundState::Paid
    }

    /// Refund and notify. Every step is best-effort.
    async fn settle(&self, session: &Session, now: DateTime<Utc>, report: &mut StaleSessionReport) {
        let refund = match self.repos.sessions().find_receipt(session.id).await {
            Ok(Some(receipt)) if receipt.is_refundable() => self.refund(&receipt, now, report).await,
            Ok(_) => {
                debug!(session_id = session.id, "Nothing to refund");
                RefundState::NothingOwed
            }
            Err(e) => {
                // the receipt is still unstamped, so the next run picks it up
                report.errors += 1;
                warn!(session_id = session.id, error = %e, "Receipt lookup failed");
                RefundState::Pending
            }
        };

        let minutes = self.timeout_minutes();
        let body = format!(
            "Your charging session could not be started. The charger did not respond within {} minutes.{}",
            minutes,
            refund.user_note()
        );
        if let Err(e) = self
            .users
            .notify(session.user_id, USER_TITLE, &body, USER_CATEGORY)
            .await
        {
            warn!(session_id = session.id, error = %e, "User notification failed");
        }

        let alert = format!(
            "Stale session auto-failed: sessionId={}, chargerId={}, userId={}. Charger did not respond within {} minutes.{}",
            session.id,
            session.charger_id,
            session.user_id,
            minutes,
            if refund == RefundState::Pending { " Refund pending." } else { "" }
        );
        if let Err(e) = self
            .operators
            .broadcast_to_operators(&alert, OPERATOR_CATEGORY)
            .await
        {
            warn!(session_id = session.id, error = %e, "Operator alert failed");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefundState {
    NothingOwed,
    Paid,
    /// Credit not confirmed yet; retried on the next run
    Pending,
}

impl RefundState {
    fn user_note(&self) -> &'static str {
        match self {
            Self::NothingOwed => "",
            Self::Paid => " The amount paid has been refunded to your wallet.",
            Self::Pending => " Your refund is being processed and will be credited to your wallet.",
        }
    }
}

/// Start the stale session background task.
pub fn start_stale_session_task(
    reconciler: Arc<StaleSessionReconciler>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(check_interval = check_interval_secs, "🧹 Stale session task started");

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = reconciler.run_once(Utc::now()).await {
                        warn!(error = %e, "Stale session check error");
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("🧹 Stale session task shutting down");
                    break;
                }
            }
        }

        info!("🧹 Stale session task stopped");
    })
}
