//! Shared fixtures for the in-module test suites

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::application::ports::{
    CreditOutcome, GatewayError, OperatorNotifier, UserNotifier, WalletLedger,
};
use crate::domain::{Charger, ChargerStatus, RepositoryProvider};
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::database::repositories::SeaOrmRepositoryProvider;

/// Fresh, migrated in-memory SQLite database.
///
/// A single pooled connection keeps the in-memory database alive and shared.
pub async fn test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.expect("connect in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

pub async fn test_repos() -> Arc<dyn RepositoryProvider> {
    Arc::new(SeaOrmRepositoryProvider::new(test_db().await))
}

pub async fn seed_charger(repos: &dyn RepositoryProvider, ocpp_id: &str) -> Charger {
    let station = repos
        .stations()
        .create(&format!("Station {}", ocpp_id))
        .await
        .expect("create station");
    repos
        .chargers()
        .create(station.id, ocpp_id, ChargerStatus::Available)
        .await
        .expect("create charger")
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub user_id: i32,
    pub title: String,
    pub body: String,
    pub category: String,
}

/// Records user and operator notifications; can be switched to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    fail: AtomicBool,
    user: Mutex<Vec<SentNotification>>,
    operator: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn user_notifications(&self) -> Vec<SentNotification> {
        self.user.lock().unwrap().clone()
    }

    pub fn operator_messages(&self) -> Vec<(String, String)> {
        self.operator.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserNotifier for RecordingNotifier {
    async fn notify(
        &self,
        user_id: i32,
        title: &str,
        body: &str,
        category: &str,
    ) -> Result<(), GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("push service down".into()));
        }
        self.user.lock().unwrap().push(SentNotification {
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            category: category.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl OperatorNotifier for RecordingNotifier {
    async fn broadcast_to_operators(&self, message: &str, category: &str) -> Result<(), GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("operator channel down".into()));
        }
        self.operator
            .lock()
            .unwrap()
            .push((message.to_string(), category.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCredit {
    pub user_id: i32,
    pub reference: String,
    pub amount_minor: i64,
    pub reason: String,
}

/// In-memory ledger deduplicating by reference, with injectable failures.
#[derive(Default)]
pub struct RecordingWallet {
    transient_failures: AtomicU32,
    reject: AtomicBool,
    attempts: AtomicU32,
    references: Mutex<HashSet<String>>,
    credits: Mutex<Vec<RecordedCredit>>,
}

impl RecordingWallet {
    /// Fails with `Unavailable` for the first `n` calls
    pub fn flaky(n: u32) -> Self {
        let wallet = Self::default();
        wallet.transient_failures.store(n, Ordering::SeqCst);
        wallet
    }

    pub fn rejecting() -> Self {
        let wallet = Self::default();
        wallet.reject.store(true, Ordering::SeqCst);
        wallet
    }

    pub fn credits(&self) -> Vec<RecordedCredit> {
        self.credits.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletLedger for RecordingWallet {
    async fn credit(
        &self,
        user_id: i32,
        reference: &str,
        amount_minor: i64,
        reason: &str,
    ) -> Result<CreditOutcome, GatewayError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected("wallet frozen".into()));
        }
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(GatewayError::Unavailable("ledger timeout".into()));
        }
        if !self.references.lock().unwrap().insert(reference.to_string()) {
            return Ok(CreditOutcome::AlreadyApplied);
        }
        self.credits.lock().unwrap().push(RecordedCredit {
            user_id,
            reference: reference.to_string(),
            amount_minor,
            reason: reason.to_string(),
        });
        Ok(CreditOutcome::Applied)
    }
}
