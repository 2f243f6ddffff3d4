//! Station repository interface

use async_trait::async_trait;

use super::model::Station;
use crate::domain::DomainResult;

#[async_trait]
pub trait StationRepository: Send + Sync {
    async fn create(&self, name: &str) -> DomainResult<Station>;

    async fn find_all(&self) -> DomainResult<Vec<Station>>;

    async fn exists(&self, id: i32) -> DomainResult<bool>;

    async fn count(&self) -> DomainResult<u64>;

    /// Stations assigned to a dealer
    async fn find_for_dealer(&self, dealer_email: &str) -> DomainResult<Vec<Station>>;

    async fn assign_dealer(&self, dealer_email: &str, station_id: i32) -> DomainResult<()>;
}
