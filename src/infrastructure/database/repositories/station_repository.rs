//! SeaORM implementation of StationRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use super::{db_err, write_err};
use crate::domain::station::{Station, StationRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{dealer_station, station};

pub struct SeaOrmStationRepository {
    db: DatabaseConnection,
}

impl SeaOrmStationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: station::Model) -> Station {
    Station {
        id: m.id,
        name: m.name,
        created_at: m.created_at,
    }
}

#[async_trait]
impl StationRepository for SeaOrmStationRepository {
    async fn create(&self, name: &str) -> DomainResult<Station> {
        let model = station::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let model = model.insert(&self.db).await.map_err(write_err)?;
        Ok(model_to_domain(model))
    }

    async fn find_all(&self) -> DomainResult<Vec<Station>> {
        let models = station::Entity::find()
            .order_by_asc(station::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn exists(&self, id: i32) -> DomainResult<bool> {
        let count = station::Entity::find()
            .filter(station::Column::Id.eq(id))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn count(&self) -> DomainResult<u64> {
        station::Entity::find().count(&self.db).await.map_err(db_err)
    }

    async fn find_for_dealer(&self, dealer_email: &str) -> DomainResult<Vec<Station>> {
        let assignments = dealer_station::Entity::find()
            .filter(dealer_station::Column::DealerEmail.eq(dealer_email))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        if assignments.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = assignments.into_iter().map(|a| a.station_id).collect();
        let models = station::Entity::find()
            .filter(station::Column::Id.is_in(ids))
            .order_by_asc(station::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn assign_dealer(&self, dealer_email: &str, station_id: i32) -> DomainResult<()> {
        if !self.exists(station_id).await? {
            return Err(DomainError::not_found("Station", "id", station_id));
        }

        let model = dealer_station::ActiveModel {
            dealer_email: Set(dealer_email.to_string()),
            station_id: Set(station_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        match model.insert(&self.db).await.map_err(write_err) {
            Ok(_) | Err(DomainError::Conflict(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
