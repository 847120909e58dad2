use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::menu::MenuItemId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    /// Character-by-character rendering so text-to-speech reads the id
    /// out unambiguously.
    pub fn spoken(&self) -> String {
        let mut spoken = String::with_capacity(self.0.len() * 2);
        for (index, character) in self.0.chars().enumerate() {
            if index > 0 {
                spoken.push(' ');
            }
            spoken.push(character);
        }
        spoken
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<OrderStatus> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "preparing" => Some(OrderStatus::Preparing),
            "ready" => Some(OrderStatus::Ready),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub menu_item_id: MenuItemId,
    pub menu_item_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub special_instructions: Option<String>,
}

/// Durable record produced exactly once per successful commit. The
/// engine only ever creates orders in `Pending`; later status changes
/// belong to the dashboard surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.lines.is_empty() {
            return Err(DomainError::InvariantViolation(
                "order must contain at least one line".to_string(),
            ));
        }
        let expected: Decimal =
            self.lines.iter().map(|line| line.unit_price * Decimal::from(line.quantity)).sum();
        if expected != self.total {
            return Err(DomainError::InvariantViolation(format!(
                "order total {} does not match line sum {}",
                self.total, expected
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::menu::MenuItemId;

    use super::{Order, OrderId, OrderLine, OrderStatus};

    #[test]
    fn spoken_order_id_spaces_every_character() {
        assert_eq!(OrderId("ORD-12".to_string()).spoken(), "O R D - 1 2");
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("eaten"), None);
    }

    #[test]
    fn order_validation_checks_total_against_lines() {
        let order = Order {
            id: OrderId("ORD-1".into()),
            customer_name: "Ada".into(),
            customer_phone: Some("5551234567".into()),
            lines: vec![OrderLine {
                menu_item_id: MenuItemId("m1".into()),
                menu_item_name: "Burger".into(),
                quantity: 2,
                unit_price: Decimal::new(500, 2),
                special_instructions: None,
            }],
            total: Decimal::new(1000, 2),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        order.validate().expect("total matches");

        let mut wrong = order;
        wrong.total = Decimal::new(999, 2);
        assert!(wrong.validate().is_err());
    }
}
