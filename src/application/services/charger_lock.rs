//! Resource Lock Manager
//!
//! Exclusive, bounded-wait lock per charger. Callers may address a charger by
//! internal id or by OCPP id; both resolve to the canonical id first, so the
//! two keys contend for the same lock.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{Charger, ChargerKey, DomainError, DomainResult, RepositoryProvider};

pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

pub struct ChargerLockManager {
    repos: Arc<dyn RepositoryProvider>,
    locks: DashMap<i32, Arc<Mutex<()>>>,
    wait_timeout: Duration,
}

impl ChargerLockManager {
    pub fn new(repos: Arc<dyn RepositoryProvider>, wait_timeout: Duration) -> Self {
        Self {
            repos,
            locks: DashMap::new(),
            wait_timeout,
        }
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// Resolve either key to the stored charger.
    pub async fn resolve(&self, key: &ChargerKey) -> DomainResult<Charger> {
        self.repos
            .chargers()
            .find_by_key(key)
            .await?
            .ok_or_else(|| match key {
                ChargerKey::Id(id) => DomainError::not_found("Charger", "id", id),
                ChargerKey::OcppId(ocpp_id) => DomainError::not_found("Charger", "ocpp_id", ocpp_id),
            })
    }

    fn lock_for(&self, charger_id: i32) -> Arc<Mutex<()>> {
        let entry = self
            .locks
            .entry(charger_id)
            .or_insert_with(|| Arc::new(Mutex::new(())));
        entry.value().clone()
    }

    /// Run `f` while holding the charger's lock.
    ///
    /// The charger is re-read after the lock is acquired, so `f` sees the
    /// state as of lock time. The guard is dropped when `f` returns, fails or
    /// unwinds. Waiting longer than the configured bound fails with
    /// `ResourceContention`.
    pub async fn with_charger_lock<T, F, Fut>(&self, key: ChargerKey, f: F) -> DomainResult<T>
    where
        F: FnOnce(Charger) -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        let charger_id = self.resolve(&key).await?.id;
        let lock = self.lock_for(charger_id);

        let started = Instant::now();
        let _guard = match tokio::time::timeout(self.wait_timeout, lock.lock_owned()).await {
            Ok(guard) => guard,
            Err(_) => {
                let waited_ms = started.elapsed().as_millis() as u64;
                metrics::counter!("charger_lock_contention_total").increment(1);
                warn!(charger_id, %key, waited_ms, "⏳ Charger lock wait timed out");
                return Err(DomainError::ResourceContention {
                    charger_id,
                    waited_ms,
                });
            }
        };
        debug!(
            charger_id,
            %key,
            waited_ms = started.elapsed().as_millis() as u64,
            "🔒 Charger lock acquired"
        );

        let charger = self
            .repos
            .chargers()
            .find_by_id(charger_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Charger", "id", charger_id))?;

        let result = f(charger).await;
        debug!(charger_id, ok = result.is_ok(), "🔓 Charger lock released");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use tokio::sync::oneshot;

    use crate::test_support::{seed_charger, test_repos};

    #[tokio::test]
    async fn id_and_ocpp_id_share_one_lock() {
        let repos = test_repos().await;
        let charger = seed_charger(repos.as_ref(), "CP-LOCK-1").await;
        let locks = ChargerLockManager::new(repos, Duration::from_secs(2));
        let inside = AtomicBool::new(false);
        let inside = &inside;

        let critical = move |_c: Charger| async move {
            assert!(!inside.swap(true, Ordering::SeqCst), "two holders at once");
            tokio::time::sleep(Duration::from_millis(30)).await;
            inside.store(false, Ordering::SeqCst);
            Ok::<_, DomainError>(())
        };

        let (a, b) = tokio::join!(
            locks.with_charger_lock(ChargerKey::Id(charger.id), critical),
            locks.with_charger_lock(ChargerKey::OcppId("CP-LOCK-1".into()), critical),
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn bounded_wait_fails_with_contention() {
        let repos = test_repos().await;
        let charger = seed_charger(repos.as_ref(), "CP-LOCK-2").await;
        let locks = ChargerLockManager::new(repos, Duration::from_millis(20));
        let (held_tx, held_rx) = oneshot::channel::<()>();

        let holder = locks.with_charger_lock(ChargerKey::Id(charger.id), |_c| async move {
            let _ = held_tx.send(());
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        });
        let waiter = async {
            held_rx.await.expect("holder acquired");
            locks
                .with_charger_lock(ChargerKey::OcppId("CP-LOCK-2".into()), |_c| async {
                    Ok(())
                })
                .await
        };

        let (held, waited) = tokio::join!(holder, waiter);
        assert!(held.is_ok());
        match waited {
            Err(DomainError::ResourceContention { charger_id, waited_ms }) => {
                assert_eq!(charger_id, charger.id);
                assert!(waited_ms >= 15);
            }
            other => panic!("expected contention, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn lock_is_released_when_the_closure_fails() {
        let repos = test_repos().await;
        let charger = seed_charger(repos.as_ref(), "CP-LOCK-3").await;
        let locks = ChargerLockManager::new(repos, Duration::from_millis(50));

        let failed: DomainResult<()> = locks
            .with_charger_lock(ChargerKey::Id(charger.id), |_c| async {
                Err(DomainError::Validation("boom".into()))
            })
            .await;
        assert!(matches!(failed, Err(DomainError::Validation(_))));

        let next = locks
            .with_charger_lock(ChargerKey::Id(charger.id), |c| async move { Ok(c.ocpp_id) })
            .await
            .expect("lock free again");
        assert_eq!(next, "CP-LOCK-3");
    }

    #[tokio::test]
    async fn unknown_charger_is_not_found() {
        let repos = test_repos().await;
        let locks = ChargerLockManager::new(repos, DEFAULT_LOCK_WAIT);

        let by_id = locks
            .with_charger_lock(ChargerKey::Id(404), |_c| async { Ok(()) })
            .await;
        assert!(matches!(by_id, Err(DomainError::NotFound { field: "id", .. })));

        let by_ocpp = locks
            .with_charger_lock(ChargerKey::OcppId("nope".into()), |_c| async { Ok(()) })
            .await;
        assert!(matches!(
            by_ocpp,
            Err(DomainError::NotFound { field: "ocpp_id", .. })
        ));
    }
}
