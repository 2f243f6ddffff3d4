//! Charger repository interface

use async_trait::async_trait;

use super::model::{Charger, ChargerKey, ChargerStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait ChargerRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Charger>>;

    async fn find_by_ocpp_id(&self, ocpp_id: &str) -> DomainResult<Option<Charger>>;

    /// Register a charger (used for seeding; management CRUD is external)
    async fn create(&self, station_id: i32, ocpp_id: &str, status: ChargerStatus) -> DomainResult<Charger>;

    async fn update_status(&self, id: i32, status: ChargerStatus) -> DomainResult<()>;

    async fn find_by_key(&self, key: &ChargerKey) -> DomainResult<Option<Charger>> {
        match key {
            ChargerKey::Id(id) => self.find_by_id(*id).await,
            ChargerKey::OcppId(ocpp_id) => self.find_by_ocpp_id(ocpp_id).await,
        }
    }
}
