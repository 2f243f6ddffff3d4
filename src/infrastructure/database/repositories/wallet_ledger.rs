//! SeaORM-backed wallet ledger
//!
//! Credits are keyed by a unique business reference, so a retried refund
//! lands at most once.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use tracing::{debug, info};

use crate::application::ports::{CreditOutcome, GatewayError, WalletLedger};
use crate::infrastructure::database::entities::wallet_credit;

pub struct SeaOrmWalletLedger {
    db: DatabaseConnection,
}

impl SeaOrmWalletLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Sum of every credit recorded for a user (minor units)
    pub async fn total_credited(&self, user_id: i32) -> Result<i64, DbErr> {
        let credits = wallet_credit::Entity::find()
            .filter(wallet_credit::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;
        Ok(credits.iter().map(|c| c.amount_minor).sum())
    }
}

#[async_trait]
impl WalletLedger for SeaOrmWalletLedger {
    async fn credit(
        &self,
        user_id: i32,
        reference: &str,
        amount_minor: i64,
        reason: &str,
    ) -> Result<CreditOutcome, GatewayError> {
        if amount_minor <= 0 {
            return Err(GatewayError::Rejected(format!(
                "credit amount must be positive, got {}",
                amount_minor
            )));
        }

        let model = wallet_credit::ActiveModel {
            user_id: Set(user_id),
            reference: Set(reference.to_string()),
            amount_minor: Set(amount_minor),
            reason: Set(reason.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        match model.insert(&self.db).await {
            Ok(_) => {
                info!(user_id, reference, amount_minor, "💰 Wallet credited");
                Ok(CreditOutcome::Applied)
            }
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    debug!(user_id, reference, "Credit already recorded");
                    Ok(CreditOutcome::AlreadyApplied)
                }
                _ => Err(GatewayError::Unavailable(e.to_string())),
            },
        }
    }
}
