//! Session Start Flow
//!
//! The charger-level decision the lock manager protects: is this charger
//! free to start a session for this user right now? The decision and the
//! `initiated` insert happen under the charger lock; the remote-start command
//! to the hardware is the caller's job and happens after the lock is gone.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::booking_service::BookingService;
use super::charger_lock::ChargerLockManager;
use crate::domain::session::{Session, SessionStatus};
use crate::domain::{ChargerKey, DomainError, DomainResult, RepositoryProvider};

fn refusal_reason(err: &DomainError) -> Option<&'static str> {
    match err {
        DomainError::ChargerBusy(_) => Some("busy"),
        DomainError::ChargerUnavailable { .. } => Some("unavailable"),
        DomainError::ResourceContention { .. } => Some("contention"),
        _ => None,
    }
}

pub struct SessionStartService {
    repos: Arc<dyn RepositoryProvider>,
    locks: Arc<ChargerLockManager>,
    bookings: Arc<BookingService>,
}

impl SessionStartService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        locks: Arc<ChargerLockManager>,
        bookings: Arc<BookingService>,
    ) -> Self {
        Self {
            repos,
            locks,
            bookings,
        }
    }

    /// Claim the charger for `user_id` with an `initiated` session.
    ///
    /// A receipt is stored with the session when `paid_amount_minor > 0`. The
    /// user's booking covering `now` on this charger is completed afterwards;
    /// failing to complete it does not fail the start.
    pub async fn start_session(
        &self,
        user_id: i32,
        key: ChargerKey,
        paid_amount_minor: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Session> {
        let session = self
            .locks
            .with_charger_lock(key, |charger| async move {
                if !charger.status.accepts_sessions() {
                    return Err(DomainError::ChargerUnavailable {
                        charger_id: charger.id,
                        status: charger.status.to_string(),
                    });
                }

                let sessions = self.repos.sessions();
                if let Some(open) = sessions.find_open_for_charger(charger.id).await? {
                    info!(charger_id = charger.id, session_id = open.id, "Charger already in use");
                    return Err(DomainError::ChargerBusy(charger.id));
                }

                sessions
                    .create_initiated(user_id, charger.id, paid_amount_minor, now)
                    .await
                    .map_err(|e| match e {
                        // another process won the partial unique index
                        DomainError::Conflict(_) => DomainError::ChargerBusy(charger.id),
                        other => other,
                    })
            })
            .await;

        let session = session.inspect_err(|e| {
            if let Some(reason) = refusal_reason(e) {
                metrics::counter!("session_start_refused_total", "reason" => reason).increment(1);
            }
        })?;

        metrics::counter!("sessions_started_total").increment(1);
        info!(
            session_id = session.id,
            charger_id = session.charger_id,
            user_id,
            paid_amount_minor,
            "⚡ Session initiated"
        );

        if let Err(e) = self.bookings.complete(user_id, session.charger_id, now).await {
            warn!(session_id = session.id, user_id, error = %e, "Could not complete booking for session");
        }

        Ok(session)
    }

    /// Charger confirmed the start: `initiated → active`.
    ///
    /// An acknowledgement for a session the stale-session reconciler already
    /// failed is rejected.
    pub async fn acknowledge(&self, session_id: i32, now: DateTime<Utc>) -> DomainResult<Session> {
        let transitioned = self
            .repos
            .sessions()
            .transition(session_id, SessionStatus::Initiated, SessionStatus::Active, now)
            .await?;
        if let Some(session) = transitioned {
            info!(session_id, charger_id = session.charger_id, "🔌 Session active");
            return Ok(session);
        }

        let current = self
            .repos
            .sessions()
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Session", "id", session_id))?;
        warn!(session_id, status = %current.status, "Late or duplicate session acknowledgement");
        Err(DomainError::InvalidSessionState {
            session_id,
            status: current.status.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Duration as ChronoDuration;

    use crate::domain::booking::BookingStatus;
    use crate::domain::slot::{NewSlot, SlotWindow};
    use crate::domain::ChargerStatus;
    use crate::test_support::{seed_charger, test_repos, utc};

    struct Fixture {
        repos: Arc<dyn RepositoryProvider>,
        bookings: Arc<BookingService>,
        sessions: Arc<SessionStartService>,
        charger_id: i32,
    }

    async fn fixture(ocpp_id: &str, lock_wait: Duration) -> Fixture {
        let repos = test_repos().await;
        let charger = seed_charger(repos.as_ref(), ocpp_id).await;
        let locks = Arc::new(ChargerLockManager::new(repos.clone(), lock_wait));
        let bookings = Arc::new(BookingService::new(repos.clone()));
        Fixture {
            sessions: Arc::new(SessionStartService::new(
                repos.clone(),
                locks,
                bookings.clone(),
            )),
            repos,
            bookings,
            charger_id: charger.id,
        }
    }

    fn now() -> DateTime<Utc> {
        utc(2030, 5, 1, 10, 0)
    }

    #[tokio::test]
    async fn concurrent_starts_by_id_and_ocpp_id_have_one_winner() {
        let fx = fixture("CP-START", Duration::from_secs(2)).await;

        let by_id = {
            let sessions = fx.sessions.clone();
            let charger_id = fx.charger_id;
            tokio::spawn(async move {
                sessions
                    .start_session(1, ChargerKey::Id(charger_id), 0, now())
                    .await
            })
        };
        let by_ocpp = {
            let sessions = fx.sessions.clone();
            tokio::spawn(async move {
                sessions
                    .start_session(2, ChargerKey::OcppId("CP-START".into()), 0, now())
                    .await
            })
        };

        let results = [by_id.await.unwrap(), by_ocpp.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        for result in &results {
            if let Err(e) = result {
                assert!(
                    matches!(
                        e,
                        DomainError::ChargerBusy(_) | DomainError::ResourceContention { .. }
                    ),
                    "unexpected error: {e}"
                );
            }
        }
    }

    #[tokio::test]
    async fn offline_charger_refuses_sessions() {
        let fx = fixture("CP-OFF", Duration::from_secs(1)).await;
        fx.repos
            .chargers()
            .update_status(fx.charger_id, ChargerStatus::Offline)
            .await
            .unwrap();

        let result = fx
            .sessions
            .start_session(1, ChargerKey::Id(fx.charger_id), 0, now())
            .await;
        assert!(matches!(result, Err(DomainError::ChargerUnavailable { .. })));
    }

    #[tokio::test]
    async fn start_completes_the_covering_booking_and_stores_the_receipt() {
        let fx = fixture("CP-FLOW", Duration::from_secs(1)).await;
        let start = utc(2030, 5, 1, 9, 45);
        let window = SlotWindow::dated(start, start + ChronoDuration::hours(1)).unwrap();
        let slot = fx
            .repos
            .slots()
            .insert(
                NewSlot {
                    charger_id: fx.charger_id,
                    window,
                },
                utc(2030, 5, 1, 8, 0),
            )
            .await
            .unwrap();
        let booking = fx
            .bookings
            .book(7, slot.id, utc(2030, 5, 1, 8, 0))
            .await
            .unwrap();

        let session = fx
            .sessions
            .start_session(7, ChargerKey::OcppId("CP-FLOW".into()), 12_500, now())
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Initiated);

        let receipt = fx
            .repos
            .sessions()
            .find_receipt(session.id)
            .await
            .unwrap()
            .expect("receipt stored");
        assert_eq!(receipt.amount_minor, 12_500);
        assert_eq!(
            fx.bookings.get(booking.id).await.unwrap().status,
            BookingStatus::Completed
        );
    }

    #[tokio::test]
    async fn second_start_after_the_first_is_busy() {
        let fx = fixture("CP-BUSY", Duration::from_secs(1)).await;
        fx.sessions
            .start_session(1, ChargerKey::Id(fx.charger_id), 0, now())
            .await
            .unwrap();

        let second = fx
            .sessions
            .start_session(2, ChargerKey::Id(fx.charger_id), 0, now())
            .await;
        assert!(matches!(second, Err(DomainError::ChargerBusy(id)) if id == fx.charger_id));
    }

    #[tokio::test]
    async fn storage_backstop_rejects_a_second_open_session() {
        let fx = fixture("CP-BACKSTOP", Duration::from_secs(1)).await;
        fx.repos
            .sessions()
            .create_initiated(1, fx.charger_id, 0, now())
            .await
            .unwrap();

        let direct = fx
            .repos
            .sessions()
            .create_initiated(2, fx.charger_id, 0, now())
            .await;
        assert!(matches!(direct, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn acknowledge_activates_once_and_rejects_late_acks() {
        let fx = fixture("CP-ACK", Duration::from_secs(1)).await;
        let session = fx
            .sessions
            .start_session(1, ChargerKey::Id(fx.charger_id), 0, now())
            .await
            .unwrap();

        let active = fx.sessions.acknowledge(session.id, now()).await.unwrap();
        assert_eq!(active.status, SessionStatus::Active);
        assert!(active.ended_at.is_none());

        let again = fx.sessions.acknowledge(session.id, now()).await;
        assert!(matches!(
            again,
            Err(DomainError::InvalidSessionState { ref status, .. }) if status == "active"
        ));

        let other = seed_charger(fx.repos.as_ref(), "CP-ACK-2").await;
        let failed = fx
            .sessions
            .start_session(1, ChargerKey::Id(other.id), 0, now())
            .await
            .unwrap();
        fx.repos
            .sessions()
            .transition(failed.id, SessionStatus::Initiated, SessionStatus::Failed, now())
            .await
            .unwrap();
        assert!(matches!(
            fx.sessions.acknowledge(failed.id, now()).await,
            Err(DomainError::InvalidSessionState { ref status, .. }) if status == "failed"
        ));
        assert!(matches!(
            fx.sessions.acknowledge(9999, now()).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
