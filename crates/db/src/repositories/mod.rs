use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use tably_core::domain::intent::Intent;
use tably_core::domain::menu::{MenuItem, MenuItemId};
use tably_core::domain::order::{Order, OrderId, OrderStatus};
use tably_core::domain::session::{CallId, TurnRole};

pub mod conversation;
pub mod memory;
pub mod menu;
pub mod order;

pub use conversation::SqlConversationRepository;
pub use memory::{InMemoryConversationRepository, InMemoryMenuRepository, InMemoryOrderRepository};
pub use menu::SqlMenuRepository;
pub use order::SqlOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("order `{0}` not found")]
    OrderNotFound(String),
}

#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn list_available(&self) -> Result<Vec<MenuItem>, RepositoryError>;
    async fn find_by_id(&self, id: &MenuItemId) -> Result<Option<MenuItem>, RepositoryError>;
    async fn save(&self, item: MenuItem) -> Result<(), RepositoryError>;
    async fn set_availability(
        &self,
        id: &MenuItemId,
        available: bool,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Writes the order and all its lines as one transaction; either
    /// everything lands or nothing does.
    async fn create(&self, order: Order) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError>;
    async fn update_status(&self, id: &OrderId, status: OrderStatus)
        -> Result<(), RepositoryError>;
}

/// A persisted transcript line, written asynchronously off the
/// response path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptTurn {
    pub call_id: CallId,
    pub role: TurnRole,
    pub text: String,
    pub intent: Option<Intent>,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn start_conversation(
        &self,
        call_id: &CallId,
        caller_phone: Option<&str>,
    ) -> Result<(), RepositoryError>;
    async fn append_turn(&self, turn: TranscriptTurn) -> Result<(), RepositoryError>;
    async fn end_conversation(
        &self,
        call_id: &CallId,
        order_id: Option<&OrderId>,
    ) -> Result<(), RepositoryError>;
    /// Transcript of the call that produced the order, oldest turn
    /// first. Serves the dashboard's order-detail view.
    async fn find_by_order(&self, order_id: &OrderId)
        -> Result<Vec<TranscriptTurn>, RepositoryError>;
}

pub(crate) fn cents_from_decimal(value: Decimal) -> Result<i64, RepositoryError> {
    (value * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| RepositoryError::Decode(format!("amount out of range: {value}")))
}

pub(crate) fn decimal_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
