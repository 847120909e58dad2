use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::intent::Intent;
use crate::domain::menu::MenuItemId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Empty,
    AddingItems,
    CollectingInfo,
    Confirmation,
    PlacingOrder,
}

/// One resolved, quantified addition to the in-progress order.
///
/// Lines are never deduplicated by item identity; two separate
/// "one burger" utterances yield two lines. The id/name/price triple is
/// a snapshot taken at match time so a mid-call catalog price change
/// cannot alter what the caller was quoted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub raw_text: String,
    pub normalized_text: String,
    pub menu_item_id: MenuItemId,
    pub menu_item_name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub match_confidence: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl CustomerInfo {
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.phone.is_some()
    }

    /// Fills in fields the other extraction produced, never overwriting
    /// values the caller already confirmed.
    pub fn merge(&mut self, other: CustomerInfo) {
        if self.name.is_none() {
            self.name = other.name;
        }
        if self.phone.is_none() {
            self.phone = other.phone;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    Caller,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub role: TurnRole,
    pub text: String,
    pub intent: Option<Intent>,
    pub at: DateTime<Utc>,
}

/// A single-item offer made by the assistant ("Would you like to order
/// it?"). A following affirmative is treated as ordering this item, so
/// the caller never has to repeat the name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingOffer {
    pub menu_item_id: MenuItemId,
    pub menu_item_name: String,
    pub unit_price: Decimal,
}

/// Per-call mutable state; exactly one exists per live call identifier
/// and the session store exclusively owns every instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub call_id: CallId,
    pub status: SessionStatus,
    pub cart: Vec<CartLine>,
    pub customer: CustomerInfo,
    pub turns: Vec<TurnRecord>,
    pub pending_offer: Option<PendingOffer>,
    pub last_reply: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(call_id: CallId) -> Self {
        let now = Utc::now();
        Self {
            call_id,
            status: SessionStatus::Empty,
            cart: Vec::new(),
            customer: CustomerInfo::default(),
            turns: Vec::new(),
            pending_offer: None,
            last_reply: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_idle(&self, now: DateTime<Utc>, idle_window: Duration) -> bool {
        now - self.updated_at >= idle_window
    }

    fn cart_is_mutable(&self) -> bool {
        matches!(self.status, SessionStatus::Empty | SessionStatus::AddingItems)
    }

    /// Appends a line. The cart is append/remove-only while adding
    /// items and frozen from CONFIRMATION onward until a correction
    /// explicitly reopens it.
    pub fn push_cart_line(&mut self, line: CartLine) -> Result<(), DomainError> {
        if !self.cart_is_mutable() {
            return Err(DomainError::CartFrozen { status: self.status });
        }
        self.cart.push(line);
        self.status = SessionStatus::AddingItems;
        self.touch();
        Ok(())
    }

    /// Most-recent-item-only rollback used by spoken corrections.
    pub fn remove_last_cart_line(&mut self) -> Result<Option<CartLine>, DomainError> {
        if !self.cart_is_mutable() {
            return Err(DomainError::CartFrozen { status: self.status });
        }
        let removed = self.cart.pop();
        self.touch();
        Ok(removed)
    }

    /// Reopens item collection, e.g. after a failed commit validation.
    pub fn reopen_for_items(&mut self) {
        self.status = SessionStatus::AddingItems;
        self.touch();
    }

    pub fn record_caller_turn(&mut self, text: impl Into<String>, intent: Option<Intent>) {
        self.turns.push(TurnRecord {
            role: TurnRole::Caller,
            text: text.into(),
            intent,
            at: Utc::now(),
        });
        self.touch();
    }

    pub fn record_assistant_turn(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.last_reply = Some(text.clone());
        self.turns.push(TurnRecord { role: TurnRole::Assistant, text, intent: None, at: Utc::now() });
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use crate::domain::menu::MenuItemId;
    use crate::errors::DomainError;

    use super::{CallId, CartLine, CustomerInfo, Session, SessionStatus};

    fn line(name: &str) -> CartLine {
        CartLine {
            raw_text: name.to_lowercase(),
            normalized_text: name.to_lowercase(),
            menu_item_id: MenuItemId(format!("id-{name}")),
            menu_item_name: name.to_string(),
            unit_price: Decimal::new(500, 2),
            quantity: 1,
            match_confidence: 0.95,
        }
    }

    #[test]
    fn pushing_a_line_enters_adding_items() {
        let mut session = Session::new(CallId("CA1".into()));
        session.push_cart_line(line("Burger")).expect("push");
        assert_eq!(session.status, SessionStatus::AddingItems);
        assert_eq!(session.cart.len(), 1);
    }

    #[test]
    fn cart_is_frozen_once_confirmation_is_reached() {
        let mut session = Session::new(CallId("CA1".into()));
        session.push_cart_line(line("Burger")).expect("push");
        session.status = SessionStatus::Confirmation;

        let error = session.push_cart_line(line("Lemonade")).expect_err("frozen");
        assert!(matches!(error, DomainError::CartFrozen { status: SessionStatus::Confirmation }));

        session.reopen_for_items();
        session.push_cart_line(line("Lemonade")).expect("reopened cart accepts lines");
        assert_eq!(session.cart.len(), 2);
    }

    #[test]
    fn correction_removes_exactly_the_most_recent_line() {
        let mut session = Session::new(CallId("CA1".into()));
        session.push_cart_line(line("Burger")).expect("push");
        session.push_cart_line(line("Lemonade")).expect("push");

        let removed = session.remove_last_cart_line().expect("pop").expect("non-empty");
        assert_eq!(removed.menu_item_name, "Lemonade");
        assert_eq!(session.cart.len(), 1);
        assert_eq!(session.cart[0].menu_item_name, "Burger");
    }

    #[test]
    fn customer_merge_never_overwrites_known_fields() {
        let mut info = CustomerInfo { name: Some("Ada".into()), phone: None };
        info.merge(CustomerInfo { name: Some("Bob".into()), phone: Some("5551234567".into()) });
        assert_eq!(info.name.as_deref(), Some("Ada"));
        assert_eq!(info.phone.as_deref(), Some("5551234567"));
        assert!(info.is_complete());
    }

    #[test]
    fn idle_detection_uses_last_update() {
        let mut session = Session::new(CallId("CA1".into()));
        session.updated_at = Utc::now() - Duration::seconds(700);
        assert!(session.is_idle(Utc::now(), Duration::seconds(600)));
        assert!(!session.is_idle(Utc::now(), Duration::seconds(900)));
    }
}
