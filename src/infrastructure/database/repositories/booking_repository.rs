//! SeaORM implementation of BookingRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use super::slot_repository::flip_booked;
use super::{db_err, write_err};
use crate::domain::booking::{Booking, BookingRepository, BookingStatus, NewBooking};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::slot_booking;
use crate::infrastructure::database::migrator::UQ_ACTIVE_USER_CHARGER;

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_where(
        &self,
        query: sea_orm::Select<slot_booking::Entity>,
    ) -> DomainResult<Vec<Booking>> {
        let models = query
            .order_by_desc(slot_booking::Column::CreatedAt)
            .order_by_desc(slot_booking::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: slot_booking::Model) -> DomainResult<Booking> {
    let status = BookingStatus::from_str(&m.status).ok_or_else(|| {
        DomainError::Storage(format!("booking {} has unknown status '{}'", m.id, m.status))
    })?;

    Ok(Booking {
        id: m.id,
        slot_id: m.slot_id,
        user_id: m.user_id,
        charger_id: m.charger_id,
        station_id: m.station_id,
        status,
        window_start: m.window_start,
        window_end: m.window_end,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

/// SQLite names the violated columns, Postgres the index.
fn insert_conflict(e: sea_orm::DbErr, booking: &NewBooking) -> DomainError {
    match write_err(e) {
        DomainError::Conflict(msg)
            if msg.contains(UQ_ACTIVE_USER_CHARGER) || msg.contains("user_id") =>
        {
            DomainError::DuplicateActiveBooking {
                user_id: booking.user_id,
                charger_id: booking.charger_id,
            }
        }
        DomainError::Conflict(_) => DomainError::SlotAlreadyBooked(booking.slot_id),
        other => other,
    }
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>> {
        slot_booking::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_user(&self, user_id: i32) -> DomainResult<Vec<Booking>> {
        self.find_where(
            slot_booking::Entity::find().filter(slot_booking::Column::UserId.eq(user_id)),
        )
        .await
    }

    async fn find_by_user_and_status(
        &self,
        user_id: i32,
        status: BookingStatus,
    ) -> DomainResult<Vec<Booking>> {
        self.find_where(
            slot_booking::Entity::find()
                .filter(slot_booking::Column::UserId.eq(user_id))
                .filter(slot_booking::Column::Status.eq(status.as_str())),
        )
        .await
    }

    async fn find_by_station(&self, station_id: i32) -> DomainResult<Vec<Booking>> {
        self.find_where(
            slot_booking::Entity::find().filter(slot_booking::Column::StationId.eq(station_id)),
        )
        .await
    }

    async fn find_by_charger(&self, charger_id: i32) -> DomainResult<Vec<Booking>> {
        self.find_where(
            slot_booking::Entity::find().filter(slot_booking::Column::ChargerId.eq(charger_id)),
        )
        .await
    }

    async fn find_by_slot(&self, slot_id: i32) -> DomainResult<Vec<Booking>> {
        self.find_where(
            slot_booking::Entity::find().filter(slot_booking::Column::SlotId.eq(slot_id)),
        )
        .await
    }

    async fn has_active_booking(&self, user_id: i32, charger_id: i32) -> DomainResult<bool> {
        let count = slot_booking::Entity::find()
            .filter(slot_booking::Column::UserId.eq(user_id))
            .filter(slot_booking::Column::ChargerId.eq(charger_id))
            .filter(slot_booking::Column::Status.eq(BookingStatus::Booked.as_str()))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn find_active_for_user_and_charger(
        &self,
        user_id: i32,
        charger_id: i32,
    ) -> DomainResult<Vec<Booking>> {
        self.find_where(
            slot_booking::Entity::find()
                .filter(slot_booking::Column::UserId.eq(user_id))
                .filter(slot_booking::Column::ChargerId.eq(charger_id))
                .filter(slot_booking::Column::Status.eq(BookingStatus::Booked.as_str())),
        )
        .await
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        let models = slot_booking::Entity::find()
            .filter(slot_booking::Column::Status.eq(BookingStatus::Booked.as_str()))
            .filter(slot_booking::Column::WindowEnd.lt(now))
            .order_by_asc(slot_booking::Column::WindowEnd)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn create_booked(&self, booking: NewBooking, now: DateTime<Utc>) -> DomainResult<Booking> {
        let txn = self.db.begin().await.map_err(db_err)?;

        if !flip_booked(&txn, booking.slot_id, false, true).await? {
            return Err(DomainError::SlotAlreadyBooked(booking.slot_id));
        }

        let model = slot_booking::ActiveModel {
            slot_id: Set(booking.slot_id),
            user_id: Set(booking.user_id),
            charger_id: Set(booking.charger_id),
            station_id: Set(booking.station_id),
            status: Set(BookingStatus::Booked.as_str().to_string()),
            window_start: Set(booking.window_start),
            window_end: Set(booking.window_end),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| insert_conflict(e, &booking))?;

        txn.commit().await.map_err(db_err)?;
        debug!(
            booking_id = model.id,
            slot_id = model.slot_id,
            user_id = model.user_id,
            "Booking inserted"
        );
        model_to_domain(model)
    }

    async fn transition(
        &self,
        id: i32,
        from: BookingStatus,
        to: BookingStatus,
        release_slot: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Booking>> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let changed = slot_booking::Entity::update_many()
            .col_expr(slot_booking::Column::Status, Expr::value(to.as_str()))
            .col_expr(slot_booking::Column::UpdatedAt, Expr::value(now))
            .filter(slot_booking::Column::Id.eq(id))
            .filter(slot_booking::Column::Status.eq(from.as_str()))
            .exec(&txn)
            .await
            .map_err(db_err)?
            .rows_affected;
        if changed == 0 {
            return Ok(None);
        }

        let model = slot_booking::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("Booking", "id", id))?;

        if release_slot && !flip_booked(&txn, model.slot_id, true, false).await? {
            debug!(booking_id = id, slot_id = model.slot_id, "Slot was already free");
        }

        txn.commit().await.map_err(db_err)?;
        debug!(booking_id = id, from = %from, to = %to, release_slot, "Booking transitioned");
        model_to_domain(model).map(Some)
    }
}
