//! Station Access Registry
//!
//! Role-keyed capability lookup: which stations may a principal see.
//! Admins see every station, dealers see the stations assigned to their
//! email. New roles plug in by registering another [`StationAccess`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::station::Station;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

#[async_trait]
pub trait StationAccess: Send + Sync {
    /// Role name this strategy serves (upper case, e.g. "ADMIN")
    fn role(&self) -> &'static str;

    async fn accessible_stations(&self, email: &str) -> DomainResult<Vec<Station>>;

    async fn has_access(&self, email: &str, station_id: i32) -> DomainResult<bool>;

    async fn count_accessible(&self, email: &str) -> DomainResult<u64>;
}

pub struct AdminStationAccess {
    repos: Arc<dyn RepositoryProvider>,
}

impl AdminStationAccess {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }
}

#[async_trait]
impl StationAccess for AdminStationAccess {
    fn role(&self) -> &'static str {
        "ADMIN"
    }

    async fn accessible_stations(&self, _email: &str) -> DomainResult<Vec<Station>> {
        self.repos.stations().find_all().await
    }

    async fn has_access(&self, _email: &str, station_id: i32) -> DomainResult<bool> {
        self.repos.stations().exists(station_id).await
    }

    async fn count_accessible(&self, _email: &str) -> DomainResult<u64> {
        self.repos.stations().count().await
    }
}

pub struct DealerStationAccess {
    repos: Arc<dyn RepositoryProvider>,
}

impl DealerStationAccess {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }
}

#[async_trait]
impl StationAccess for DealerStationAccess {
    fn role(&self) -> &'static str {
        "DEALER"
    }

    async fn accessible_stations(&self, email: &str) -> DomainResult<Vec<Station>> {
        self.repos.stations().find_for_dealer(email).await
    }

    async fn has_access(&self, email: &str, station_id: i32) -> DomainResult<bool> {
        let stations = self.repos.stations().find_for_dealer(email).await?;
        Ok(stations.iter().any(|s| s.id == station_id))
    }

    async fn count_accessible(&self, email: &str) -> DomainResult<u64> {
        Ok(self.repos.stations().find_for_dealer(email).await?.len() as u64)
    }
}

#[derive(Default)]
pub struct StationAccessRegistry {
    strategies: HashMap<&'static str, Arc<dyn StationAccess>>,
}

impl StationAccessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the admin and dealer strategies
    pub fn with_defaults(repos: Arc<dyn RepositoryProvider>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AdminStationAccess::new(repos.clone())));
        registry.register(Arc::new(DealerStationAccess::new(repos)));
        registry
    }

    pub fn register(&mut self, strategy: Arc<dyn StationAccess>) {
        info!(role = strategy.role(), "Registered station access strategy");
        self.strategies.insert(strategy.role(), strategy);
    }

    pub fn supports(&self, role: &str) -> bool {
        self.strategies.contains_key(role.trim().to_ascii_uppercase().as_str())
    }

    /// Strategy for `role` (case-insensitive)
    pub fn resolve(&self, role: &str) -> DomainResult<Arc<dyn StationAccess>> {
        let normalized = role.trim().to_ascii_uppercase();
        match self.strategies.get(normalized.as_str()) {
            Some(strategy) => {
                debug!(role = %normalized, "Resolved station access strategy");
                Ok(strategy.clone())
            }
            None => {
                warn!(role, "No station access strategy for role");
                Err(DomainError::UnknownRole(role.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::test_support::test_repos;

    async fn seeded() -> (StationAccessRegistry, Vec<Station>) {
        let repos = test_repos().await;
        let mut stations = Vec::new();
        for name in ["North", "South", "East"] {
            stations.push(repos.stations().create(name).await.unwrap());
        }
        repos
            .stations()
            .assign_dealer("dealer@example.com", stations[1].id)
            .await
            .unwrap();
        (StationAccessRegistry::with_defaults(repos), stations)
    }

    #[tokio::test]
    async fn admin_sees_every_station() {
        let (registry, stations) = seeded().await;
        let admin = registry.resolve("ADMIN").unwrap();

        assert_eq!(admin.accessible_stations("root@example.com").await.unwrap(), stations);
        assert_eq!(admin.count_accessible("root@example.com").await.unwrap(), 3);
        assert!(admin.has_access("root@example.com", stations[2].id).await.unwrap());
        assert!(!admin.has_access("root@example.com", 9999).await.unwrap());
    }

    #[tokio::test]
    async fn dealer_sees_only_assigned_stations() {
        let (registry, stations) = seeded().await;
        let dealer = registry.resolve("dealer").unwrap();

        let visible = dealer.accessible_stations("dealer@example.com").await.unwrap();
        assert_eq!(visible, vec![stations[1].clone()]);
        assert!(dealer.has_access("dealer@example.com", stations[1].id).await.unwrap());
        assert!(!dealer.has_access("dealer@example.com", stations[0].id).await.unwrap());
        assert_eq!(dealer.count_accessible("other@example.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_role_is_an_authorization_error() {
        let (registry, _) = seeded().await;
        assert!(registry.supports(" Admin "));
        assert!(!registry.supports("GUEST"));

        let err = registry.resolve("GUEST").err().expect("unknown role");
        assert!(matches!(err, DomainError::UnknownRole(ref r) if r == "GUEST"));
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }
}
