//! Commit coordination: re-validate the cart against live menu rows,
//! then write the order exactly once. Every lookup goes to the
//! repository rather than the cached snapshot so a mid-call 86 is
//! caught here.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use tably_core::commit::{validate_cart, CommitValidationError};
use tably_core::domain::order::{Order, OrderId, OrderStatus};
use tably_core::domain::session::Session;
use tably_core::generate_order_id;
use tably_db::repositories::{MenuRepository, OrderRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum CommitError {
    #[error(transparent)]
    Validation(#[from] CommitValidationError),
    #[error("order store failure: {0}")]
    Store(#[from] RepositoryError),
}

pub struct CommitCoordinator {
    menu: Arc<dyn MenuRepository>,
    orders: Arc<dyn OrderRepository>,
}

impl CommitCoordinator {
    pub fn new(menu: Arc<dyn MenuRepository>, orders: Arc<dyn OrderRepository>) -> Self {
        Self { menu, orders }
    }

    /// Validates and persists the session's cart as a pending order.
    /// Validation failures leave no trace in the store; a store failure
    /// after validation is retryable because no id was spoken yet.
    pub async fn commit(&self, session: &Session) -> Result<Order, CommitError> {
        let mut live = HashMap::new();
        for line in &session.cart {
            if let Some(item) = self.menu.find_by_id(&line.menu_item_id).await? {
                live.insert(line.menu_item_id.0.clone(), item);
            }
        }

        let validated = validate_cart(&session.cart, |id| live.get(&id.0).cloned())?;

        let order = Order {
            id: OrderId(generate_order_id()),
            customer_name: session.customer.name.clone().unwrap_or_else(|| "Guest".to_string()),
            customer_phone: session.customer.phone.clone(),
            lines: validated.lines,
            total: validated.total,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        self.orders.create(order.clone()).await?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use tably_core::commit::CommitValidationError;
    use tably_core::domain::menu::{MenuItem, MenuItemId};
    use tably_core::domain::session::{CallId, CartLine, CustomerInfo, Session};
    use tably_db::repositories::{
        InMemoryMenuRepository, InMemoryOrderRepository, MenuRepository,
    };

    use super::{CommitCoordinator, CommitError};

    fn session_with_cart() -> Session {
        let mut session = Session::new(CallId("CA-1".to_string()));
        session.customer =
            CustomerInfo { name: Some("John".to_string()), phone: Some("5551234567".to_string()) };
        session
            .push_cart_line(CartLine {
                raw_text: "two burgers".to_string(),
                normalized_text: "burgers".to_string(),
                menu_item_id: MenuItemId("m1".to_string()),
                menu_item_name: "Burger".to_string(),
                unit_price: Decimal::new(500, 2),
                quantity: 2,
                match_confidence: 0.95,
            })
            .expect("push");
        session
    }

    async fn menu_with_burger() -> Arc<InMemoryMenuRepository> {
        Arc::new(
            InMemoryMenuRepository::with_items(vec![MenuItem::new(
                "m1",
                "Burger",
                "Main Course",
                Decimal::new(500, 2),
            )])
            .await,
        )
    }

    #[tokio::test]
    async fn a_valid_cart_becomes_a_pending_order() {
        let menu = menu_with_burger().await;
        let orders = Arc::new(InMemoryOrderRepository::default());
        let coordinator = CommitCoordinator::new(menu, orders.clone());

        let order = coordinator.commit(&session_with_cart()).await.expect("commit");
        assert!(order.id.0.starts_with("ORD-"));
        assert_eq!(order.customer_name, "John");
        assert_eq!(order.total, Decimal::new(1000, 2));
        order.validate().expect("total matches lines");
        assert_eq!(orders.count().await, 1);
    }

    #[tokio::test]
    async fn an_item_gone_unavailable_fails_without_writing() {
        let menu = menu_with_burger().await;
        menu.set_availability(&MenuItemId("m1".to_string()), false).await.expect("86 the burger");
        let orders = Arc::new(InMemoryOrderRepository::default());
        let coordinator = CommitCoordinator::new(menu, orders.clone());

        let error = coordinator.commit(&session_with_cart()).await.expect_err("unavailable");
        assert!(matches!(
            error,
            CommitError::Validation(CommitValidationError::UnavailableItems(names))
                if names == ["Burger"]
        ));
        assert_eq!(orders.count().await, 0);
    }

    #[tokio::test]
    async fn an_empty_cart_is_rejected_before_the_store() {
        let menu = menu_with_burger().await;
        let orders = Arc::new(InMemoryOrderRepository::default());
        let coordinator = CommitCoordinator::new(menu, orders.clone());

        let session = Session::new(CallId("CA-1".to_string()));
        let error = coordinator.commit(&session).await.expect_err("empty cart");
        assert!(matches!(error, CommitError::Validation(CommitValidationError::EmptyCart)));
    }

    #[tokio::test]
    async fn a_store_failure_is_retryable() {
        let menu = menu_with_burger().await;
        let orders = Arc::new(InMemoryOrderRepository::default());
        orders.fail_next_create();
        let coordinator = CommitCoordinator::new(menu, orders.clone());

        let session = session_with_cart();
        let error = coordinator.commit(&session).await.expect_err("store down");
        assert!(matches!(error, CommitError::Store(_)));

        coordinator.commit(&session).await.expect("retry succeeds");
        assert_eq!(orders.count().await, 1);
    }
}
