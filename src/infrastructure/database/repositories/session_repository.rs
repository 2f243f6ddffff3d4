//! SeaORM implementation of SessionRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::debug;

use super::{db_err, write_err};
use crate::domain::session::{Receipt, Session, SessionRepository, SessionStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{receipt, session};

pub struct SeaOrmSessionRepository {
    db: DatabaseConnection,
}

impl SeaOrmSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: session::Model) -> DomainResult<Session> {
    let status = SessionStatus::from_str(&m.status).ok_or_else(|| {
        DomainError::Storage(format!("session {} has unknown status '{}'", m.id, m.status))
    })?;

    Ok(Session {
        id: m.id,
        user_id: m.user_id,
        charger_id: m.charger_id,
        status,
        created_at: m.created_at,
        ended_at: m.ended_at,
    })
}

fn receipt_to_domain(m: receipt::Model) -> Receipt {
    Receipt {
        id: m.id,
        session_id: m.session_id,
        user_id: m.user_id,
        amount_minor: m.amount_minor,
        created_at: m.created_at,
        refunded_at: m.refunded_at,
    }
}

#[async_trait]
impl SessionRepository for SeaOrmSessionRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Session>> {
        session::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_open_for_charger(&self, charger_id: i32) -> DomainResult<Option<Session>> {
        session::Entity::find()
            .filter(session::Column::ChargerId.eq(charger_id))
            .filter(session::Column::Status.is_in([
                SessionStatus::Initiated.as_str(),
                SessionStatus::Active.as_str(),
            ]))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn create_initiated(
        &self,
        user_id: i32,
        charger_id: i32,
        paid_amount_minor: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Session> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let model = session::ActiveModel {
            user_id: Set(user_id),
            charger_id: Set(charger_id),
            status: Set(SessionStatus::Initiated.as_str().to_string()),
            created_at: Set(now),
            ended_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(write_err)?;

        if paid_amount_minor > 0 {
            receipt::ActiveModel {
                session_id: Set(model.id),
                user_id: Set(user_id),
                amount_minor: Set(paid_amount_minor),
                created_at: Set(now),
                refunded_at: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(write_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        debug!(
            session_id = model.id,
            charger_id,
            user_id,
            paid_amount_minor,
            "Session initiated"
        );
        model_to_domain(model)
    }

    async fn find_stale(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Session>> {
        let models = session::Entity::find()
            .filter(session::Column::Status.eq(SessionStatus::Initiated.as_str()))
            .filter(session::Column::CreatedAt.lt(cutoff))
            .order_by_asc(session::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn transition(
        &self,
        id: i32,
        from: SessionStatus,
        to: SessionStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Session>> {
        let mut update = session::Entity::update_many()
            .col_expr(session::Column::Status, Expr::value(to.as_str()))
            .filter(session::Column::Id.eq(id))
            .filter(session::Column::Status.eq(from.as_str()));
        if !to.is_open() {
            update = update.col_expr(session::Column::EndedAt, Expr::value(now));
        }

        let changed = update.exec(&self.db).await.map_err(db_err)?.rows_affected;
        if changed == 0 {
            return Ok(None);
        }

        debug!(session_id = id, from = %from, to = %to, "Session transitioned");
        self.find_by_id(id).await
    }

    async fn find_receipt(&self, session_id: i32) -> DomainResult<Option<Receipt>> {
        let model = receipt::Entity::find()
            .filter(receipt::Column::SessionId.eq(session_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(receipt_to_domain))
    }

    async fn find_pending_refunds(&self) -> DomainResult<Vec<Receipt>> {
        let failed_sessions = Query::select()
            .column(session::Column::Id)
            .from(session::Entity)
            .and_where(session::Column::Status.eq(SessionStatus::Failed.as_str()))
            .to_owned();

        let models = receipt::Entity::find()
            .filter(receipt::Column::RefundedAt.is_null())
            .filter(receipt::Column::AmountMinor.gt(0))
            .filter(receipt::Column::SessionId.in_subquery(failed_sessions))
            .order_by_asc(receipt::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(receipt_to_domain).collect())
    }

    async fn mark_refunded(&self, receipt_id: i32, now: DateTime<Utc>) -> DomainResult<bool> {
        let result = receipt::Entity::update_many()
            .col_expr(receipt::Column::RefundedAt, Expr::value(Some(now)))
            .filter(receipt::Column::Id.eq(receipt_id))
            .filter(receipt::Column::RefundedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }
}
