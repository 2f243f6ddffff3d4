//! SeaORM implementation of SlotRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use super::{db_err, write_err};
use crate::domain::booking::BookingStatus;
use crate::domain::slot::{NewSlot, Slot, SlotRepository, SlotWindow};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{slot, slot_booking};

pub struct SeaOrmSlotRepository {
    db: DatabaseConnection,
}

impl SeaOrmSlotRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn corrupt(id: i32) -> DomainError {
    DomainError::Storage(format!("slot {} has an incomplete time window", id))
}

fn minute(value: Option<i32>, id: i32) -> DomainResult<u32> {
    value
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| corrupt(id))
}

pub(crate) fn model_to_domain(m: slot::Model) -> DomainResult<Slot> {
    let window = if m.all_day {
        SlotWindow::Recurring {
            start_minute: minute(m.start_minute, m.id)?,
            end_minute: minute(m.end_minute, m.id)?,
        }
    } else {
        match (m.start_at, m.end_at) {
            (Some(start), Some(end)) => SlotWindow::Dated { start, end },
            _ => return Err(corrupt(m.id)),
        }
    };

    Ok(Slot {
        id: m.id,
        charger_id: m.charger_id,
        window,
        is_booked: m.is_booked,
        created_at: m.created_at,
    })
}

fn models_to_domain(models: Vec<slot::Model>) -> DomainResult<Vec<Slot>> {
    models.into_iter().map(model_to_domain).collect()
}

fn new_active_model(new: &NewSlot, now: DateTime<Utc>) -> slot::ActiveModel {
    let mut model = slot::ActiveModel {
        charger_id: Set(new.charger_id),
        is_booked: Set(false),
        created_at: Set(now),
        ..Default::default()
    };
    match new.window {
        SlotWindow::Dated { start, end } => {
            model.all_day = Set(false);
            model.start_at = Set(Some(start));
            model.end_at = Set(Some(end));
            model.start_minute = Set(None);
            model.end_minute = Set(None);
        }
        SlotWindow::Recurring {
            start_minute,
            end_minute,
        } => {
            model.all_day = Set(true);
            model.start_at = Set(None);
            model.end_at = Set(None);
            model.start_minute = Set(Some(start_minute as i32));
            model.end_minute = Set(Some(end_minute as i32));
        }
    }
    model
}

/// Guarded `is_booked` flip. Returns true when the row changed.
pub(crate) async fn flip_booked<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    from: bool,
    to: bool,
) -> DomainResult<bool> {
    let result = slot::Entity::update_many()
        .col_expr(slot::Column::IsBooked, Expr::value(to))
        .filter(slot::Column::Id.eq(id))
        .filter(slot::Column::IsBooked.eq(from))
        .exec(conn)
        .await
        .map_err(db_err)?;
    Ok(result.rows_affected == 1)
}

// ── SlotRepository impl ─────────────────────────────────────────

#[async_trait]
impl SlotRepository for SeaOrmSlotRepository {
    async fn insert(&self, new: NewSlot, now: DateTime<Utc>) -> DomainResult<Slot> {
        let model = new_active_model(&new, now)
            .insert(&self.db)
            .await
            .map_err(write_err)?;
        debug!(slot_id = model.id, charger_id = model.charger_id, "Slot inserted");
        model_to_domain(model)
    }

    async fn insert_batch(&self, slots: Vec<NewSlot>, now: DateTime<Utc>) -> DomainResult<Vec<Slot>> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let mut inserted = Vec::with_capacity(slots.len());
        for new in &slots {
            let model = new_active_model(new, now)
                .insert(&txn)
                .await
                .map_err(write_err)?;
            inserted.push(model_to_domain(model)?);
        }

        txn.commit().await.map_err(db_err)?;
        debug!(count = inserted.len(), "Slot batch inserted");
        Ok(inserted)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Slot>> {
        slot::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_charger(&self, charger_id: i32) -> DomainResult<Vec<Slot>> {
        let models = slot::Entity::find()
            .filter(slot::Column::ChargerId.eq(charger_id))
            .order_by_desc(slot::Column::AllDay)
            .order_by_asc(slot::Column::StartMinute)
            .order_by_asc(slot::Column::StartAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }

    async fn find_overlapping(
        &self,
        charger_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Slot>> {
        let models = slot::Entity::find()
            .filter(slot::Column::ChargerId.eq(charger_id))
            .filter(slot::Column::AllDay.eq(false))
            .filter(slot::Column::StartAt.lt(end))
            .filter(slot::Column::EndAt.gt(start))
            .order_by_asc(slot::Column::StartAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }

    async fn find_starting_between(
        &self,
        charger_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Slot>> {
        let models = slot::Entity::find()
            .filter(slot::Column::ChargerId.eq(charger_id))
            .filter(slot::Column::AllDay.eq(false))
            .filter(slot::Column::StartAt.gte(from))
            .filter(slot::Column::StartAt.lt(to))
            .order_by_asc(slot::Column::StartAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }

    async fn find_recurring(&self, charger_id: i32) -> DomainResult<Vec<Slot>> {
        let models = slot::Entity::find()
            .filter(slot::Column::ChargerId.eq(charger_id))
            .filter(slot::Column::AllDay.eq(true))
            .order_by_asc(slot::Column::StartMinute)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }

    async fn find_available(&self, charger_id: i32, now: DateTime<Utc>) -> DomainResult<Vec<Slot>> {
        let recurring = slot::Entity::find()
            .filter(slot::Column::ChargerId.eq(charger_id))
            .filter(slot::Column::AllDay.eq(true))
            .filter(slot::Column::IsBooked.eq(false))
            .order_by_asc(slot::Column::StartMinute)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let dated = slot::Entity::find()
            .filter(slot::Column::ChargerId.eq(charger_id))
            .filter(slot::Column::AllDay.eq(false))
            .filter(slot::Column::IsBooked.eq(false))
            .filter(slot::Column::StartAt.gt(now))
            .order_by_asc(slot::Column::StartAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        models_to_domain(recurring.into_iter().chain(dated).collect())
    }

    async fn mark_booked(&self, id: i32) -> DomainResult<bool> {
        flip_booked(&self.db, id, false, true).await
    }

    async fn mark_free(&self, id: i32) -> DomainResult<bool> {
        flip_booked(&self.db, id, true, false).await
    }

    async fn delete_with_history(&self, id: i32) -> DomainResult<u64> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let live = slot_booking::Entity::find()
            .filter(slot_booking::Column::SlotId.eq(id))
            .filter(slot_booking::Column::Status.eq(BookingStatus::Booked.as_str()))
            .count(&txn)
            .await
            .map_err(db_err)?;
        if live > 0 {
            return Err(DomainError::SlotHasActiveBooking(id));
        }

        let purged = slot_booking::Entity::delete_many()
            .filter(slot_booking::Column::SlotId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?
            .rows_affected;

        // the booked flag alone does not block: a consumed dated slot keeps it
        let deleted = slot::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?
            .rows_affected;
        if deleted == 0 {
            return Err(DomainError::not_found("Slot", "id", id));
        }

        txn.commit().await.map_err(db_err)?;
        debug!(slot_id = id, purged_bookings = purged, "Slot deleted");
        Ok(purged)
    }
}
