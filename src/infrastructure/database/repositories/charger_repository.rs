//! SeaORM implementation of ChargerRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::debug;

use super::{db_err, write_err};
use crate::domain::charger::{Charger, ChargerRepository, ChargerStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::charger;

pub struct SeaOrmChargerRepository {
    db: DatabaseConnection,
}

impl SeaOrmChargerRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: charger::Model) -> Charger {
    Charger {
        id: m.id,
        station_id: m.station_id,
        ocpp_id: m.ocpp_id,
        status: ChargerStatus::from_str(&m.status),
        created_at: m.created_at,
    }
}

#[async_trait]
impl ChargerRepository for SeaOrmChargerRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Charger>> {
        let model = charger::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_ocpp_id(&self, ocpp_id: &str) -> DomainResult<Option<Charger>> {
        let model = charger::Entity::find()
            .filter(charger::Column::OcppId.eq(ocpp_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn create(
        &self,
        station_id: i32,
        ocpp_id: &str,
        status: ChargerStatus,
    ) -> DomainResult<Charger> {
        debug!(station_id, ocpp_id, "Registering charger");

        let model = charger::ActiveModel {
            station_id: Set(station_id),
            ocpp_id: Set(ocpp_id.to_string()),
            status: Set(status.as_str().to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let model = model.insert(&self.db).await.map_err(write_err)?;
        Ok(model_to_domain(model))
    }

    async fn update_status(&self, id: i32, status: ChargerStatus) -> DomainResult<()> {
        let existing = charger::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("Charger", "id", id))?;

        let mut active: charger::ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}
