use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use tably_core::domain::menu::{MenuItem, MenuItemId};
use tably_core::domain::order::{Order, OrderId, OrderStatus};
use tably_core::domain::session::CallId;

use super::{
    ConversationRepository, MenuRepository, OrderRepository, RepositoryError, TranscriptTurn,
};

#[derive(Default)]
pub struct InMemoryMenuRepository {
    items: RwLock<HashMap<String, MenuItem>>,
}

impl InMemoryMenuRepository {
    pub async fn with_items(items: Vec<MenuItem>) -> Self {
        let repo = Self::default();
        {
            let mut map = repo.items.write().await;
            for item in items {
                map.insert(item.id.0.clone(), item);
            }
        }
        repo
    }
}

#[async_trait::async_trait]
impl MenuRepository for InMemoryMenuRepository {
    async fn list_available(&self) -> Result<Vec<MenuItem>, RepositoryError> {
        let items = self.items.read().await;
        let mut available: Vec<MenuItem> =
            items.values().filter(|item| item.available).cloned().collect();
        available.sort_by(|left, right| {
            left.category.cmp(&right.category).then_with(|| left.name.cmp(&right.name))
        });
        Ok(available)
    }

    async fn find_by_id(&self, id: &MenuItemId) -> Result<Option<MenuItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.get(&id.0).cloned())
    }

    async fn save(&self, item: MenuItem) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        items.insert(item.id.0.clone(), item);
        Ok(())
    }

    async fn set_availability(
        &self,
        id: &MenuItemId,
        available: bool,
    ) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        if let Some(item) = items.get_mut(&id.0) {
            item.available = available;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
    fail_next_create: AtomicBool,
}

impl InMemoryOrderRepository {
    /// Makes the next `create` call fail, for exercising the
    /// store-failure recovery path.
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    pub async fn count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: Order) -> Result<(), RepositoryError> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Decode("simulated store failure".to_string()));
        }
        let mut orders = self.orders.write().await;
        orders.insert(order.id.0.clone(), order);
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id.0).cloned())
    }

    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut listed: Vec<Order> = orders
            .values()
            .filter(|order| status.map(|wanted| order.status == wanted).unwrap_or(true))
            .cloned()
            .collect();
        listed.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(listed)
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&id.0) {
            Some(order) => {
                order.status = status;
                Ok(())
            }
            None => Err(RepositoryError::OrderNotFound(id.0.clone())),
        }
    }
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    turns: RwLock<Vec<TranscriptTurn>>,
    ended: RwLock<HashMap<String, Option<String>>>,
}

impl InMemoryConversationRepository {
    pub async fn turns_for(&self, call_id: &CallId) -> Vec<TranscriptTurn> {
        let turns = self.turns.read().await;
        turns.iter().filter(|turn| turn.call_id == *call_id).cloned().collect()
    }
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn start_conversation(
        &self,
        _call_id: &CallId,
        _caller_phone: Option<&str>,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn append_turn(&self, turn: TranscriptTurn) -> Result<(), RepositoryError> {
        let mut turns = self.turns.write().await;
        turns.push(turn);
        Ok(())
    }

    async fn end_conversation(
        &self,
        call_id: &CallId,
        order_id: Option<&OrderId>,
    ) -> Result<(), RepositoryError> {
        let mut ended = self.ended.write().await;
        ended.insert(call_id.0.clone(), order_id.map(|id| id.0.clone()));
        Ok(())
    }

    async fn find_by_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<TranscriptTurn>, RepositoryError> {
        let ended = self.ended.read().await;
        let Some(call_id) = ended
            .iter()
            .find(|(_, linked)| linked.as_deref() == Some(order_id.0.as_str()))
            .map(|(call_id, _)| CallId(call_id.clone()))
        else {
            return Ok(Vec::new());
        };
        drop(ended);
        Ok(self.turns_for(&call_id).await)
    }
}
