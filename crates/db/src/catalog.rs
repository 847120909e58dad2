use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use tably_core::domain::menu::{MenuItem, MenuItemId};

use crate::repositories::{MenuRepository, RepositoryError};

struct Snapshot {
    items: Vec<MenuItem>,
    fetched_at: Option<Instant>,
}

/// Read-only snapshot of the available menu, refreshed on a TTL. A
/// failed refresh keeps serving the previous snapshot; an empty or
/// stale menu degrades to "no matches", never to an error on the
/// caller's turn.
pub struct MenuCatalogCache {
    repository: Arc<dyn MenuRepository>,
    ttl: Duration,
    snapshot: RwLock<Snapshot>,
}

impl MenuCatalogCache {
    pub fn new(repository: Arc<dyn MenuRepository>, ttl: Duration) -> Self {
        Self {
            repository,
            ttl,
            snapshot: RwLock::new(Snapshot { items: Vec::new(), fetched_at: None }),
        }
    }

    /// Current item snapshot, refreshing first when the TTL has lapsed.
    pub async fn items(&self) -> Vec<MenuItem> {
        if self.is_stale().await {
            // Stale data is tolerated when the store is unreachable.
            let _ = self.refresh_now().await;
        }
        self.snapshot.read().await.items.clone()
    }

    pub async fn find_by_id(&self, id: &MenuItemId) -> Option<MenuItem> {
        let snapshot = self.snapshot.read().await;
        snapshot.items.iter().find(|item| &item.id == id).cloned()
    }

    pub async fn refresh_now(&self) -> Result<(), RepositoryError> {
        let items = self.repository.list_available().await?;
        let mut snapshot = self.snapshot.write().await;
        snapshot.items = items;
        snapshot.fetched_at = Some(Instant::now());
        Ok(())
    }

    async fn is_stale(&self) -> bool {
        let snapshot = self.snapshot.read().await;
        match snapshot.fetched_at {
            Some(fetched_at) => fetched_at.elapsed() >= self.ttl,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;

    use tably_core::domain::menu::{MenuItem, MenuItemId};

    use crate::repositories::{InMemoryMenuRepository, MenuRepository};

    use super::MenuCatalogCache;

    #[tokio::test]
    async fn first_read_populates_the_snapshot() {
        let repo = Arc::new(
            InMemoryMenuRepository::with_items(vec![MenuItem::new(
                "m1",
                "Burger",
                "Main Course",
                Decimal::new(500, 2),
            )])
            .await,
        );
        let cache = MenuCatalogCache::new(repo, Duration::from_secs(300));

        let items = cache.items().await;
        assert_eq!(items.len(), 1);
        assert!(cache.find_by_id(&MenuItemId("m1".to_string())).await.is_some());
    }

    #[tokio::test]
    async fn snapshot_is_served_within_the_ttl() {
        let repo = Arc::new(
            InMemoryMenuRepository::with_items(vec![MenuItem::new(
                "m1",
                "Burger",
                "Main Course",
                Decimal::new(500, 2),
            )])
            .await,
        );
        let cache = MenuCatalogCache::new(repo.clone(), Duration::from_secs(300));
        assert_eq!(cache.items().await.len(), 1);

        // A change inside the TTL window is not visible until refresh.
        repo.set_availability(&MenuItemId("m1".to_string()), false).await.expect("toggle");
        assert_eq!(cache.items().await.len(), 1);

        cache.refresh_now().await.expect("refresh");
        assert!(cache.items().await.is_empty());
    }

    #[tokio::test]
    async fn zero_ttl_refreshes_every_read() {
        let repo = Arc::new(
            InMemoryMenuRepository::with_items(vec![MenuItem::new(
                "m1",
                "Burger",
                "Main Course",
                Decimal::new(500, 2),
            )])
            .await,
        );
        let cache = MenuCatalogCache::new(repo.clone(), Duration::from_secs(0));
        assert_eq!(cache.items().await.len(), 1);

        repo.set_availability(&MenuItemId("m1".to_string()), false).await.expect("toggle");
        assert!(cache.items().await.is_empty());
    }
}
