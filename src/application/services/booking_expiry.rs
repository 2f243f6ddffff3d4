//! Background task that periodically expires overdue bookings.
//!
//! A booking is overdue when it is still `booked` and its claimed occurrence
//! ended before now. Each record is expired through the guarded transition
//! (releasing the slot in the same transaction); only the winner notifies the
//! user.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::application::ports::UserNotifier;
use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::{DomainResult, RepositoryProvider};
use crate::shared::shutdown::ShutdownSignal;

pub const DEFAULT_EXPIRY_INTERVAL_SECS: u64 = 300;

const TITLE: &str = "Booking Expired";
const CATEGORY: &str = "BOOKING_EXPIRED";

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpiryReport {
    pub scanned: usize,
    pub expired: usize,
    /// Changed state between scan and transition (another writer won)
    pub skipped: usize,
    pub failed: usize,
}

pub struct BookingExpiryReconciler {
    repos: Arc<dyn RepositoryProvider>,
    notifier: Arc<dyn UserNotifier>,
}

impl BookingExpiryReconciler {
    pub fn new(repos: Arc<dyn RepositoryProvider>, notifier: Arc<dyn UserNotifier>) -> Self {
        Self { repos, notifier }
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> DomainResult<ExpiryReport> {
        let overdue = self.repos.bookings().find_overdue(now).await?;
        let mut report = ExpiryReport {
            scanned: overdue.len(),
            ..Default::default()
        };
        if overdue.is_empty() {
            return Ok(report);
        }

        info!(count = overdue.len(), "Expiring overdue bookings");

        for booking in overdue {
            let result = self
                .repos
                .bookings()
                .transition(
                    booking.id,
                    BookingStatus::Booked,
                    BookingStatus::Expired,
                    true,
                    now,
                )
                .await;

            match result {
                Ok(Some(expired)) => {
                    report.expired += 1;
                    metrics::counter!("bookings_expired_total").increment(1);
                    info!(
                        booking_id = expired.id,
                        slot_id = expired.slot_id,
                        user_id = expired.user_id,
                        "⌛ Booking expired and slot released"
                    );
                    self.notify(&expired).await;
                }
                Ok(None) => {
                    report.skipped += 1;
                    debug!(booking_id = booking.id, "Booking changed state before expiry");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(booking_id = booking.id, error = %e, "Failed to expire booking");
                }
            }
        }

        Ok(report)
    }

    async fn notify(&self, booking: &Booking) {
        let body = format!(
            "Your slot booking for {} - {} has expired because you did not start a charging session.",
            booking.window_start.format("%H:%M"),
            booking.window_end.format("%H:%M")
        );
        if let Err(e) = self
            .notifier
            .notify(booking.user_id, TITLE, &body, CATEGORY)
            .await
        {
            warn!(booking_id = booking.id, user_id = booking.user_id, error = %e, "Expiry notification failed");
        }
    }
}

/// Start the booking expiry background task.
///
/// Runs `run_once` every `check_interval_secs` until shutdown.
pub fn start_booking_expiry_task(
    reconciler: Arc<BookingExpiryReconciler>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(check_interval = check_interval_secs, "📅 Booking expiry task started");

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = reconciler.run_once(Utc::now()).await {
                        warn!(error = %e, "Booking expiry check error");
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("📅 Booking expiry task shutting down");
                    break;
                }
            }
        }

        info!("📅 Booking expiry task stopped");
    })
}
