//! Commit-time cart validation. The cached id/name/price on each cart
//! line is what the caller was quoted; the live catalog is what the
//! kitchen can actually make. Final commit always trusts the latter.

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::menu::{MenuItem, MenuItemId};
use crate::domain::order::OrderLine;
use crate::domain::session::CartLine;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommitValidationError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("items no longer available: {0:?}")]
    UnavailableItems(Vec<String>),
}

/// A cart that re-validated against the live catalog, priced with the
/// fresh catalog prices rather than the quoted ones.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedCart {
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
}

/// Re-validates every line; all-or-nothing. A single unavailable line
/// fails the whole cart and reports every offending name so the caller
/// can substitute in one turn.
pub fn validate_cart<F>(cart: &[CartLine], lookup: F) -> Result<ValidatedCart, CommitValidationError>
where
    F: Fn(&MenuItemId) -> Option<MenuItem>,
{
    if cart.is_empty() {
        return Err(CommitValidationError::EmptyCart);
    }

    let mut lines = Vec::with_capacity(cart.len());
    let mut unavailable = Vec::new();

    for cart_line in cart {
        match lookup(&cart_line.menu_item_id) {
            Some(item) if item.available => {
                lines.push(OrderLine {
                    menu_item_id: item.id,
                    menu_item_name: item.name,
                    quantity: cart_line.quantity,
                    unit_price: item.price,
                    special_instructions: None,
                });
            }
            _ => unavailable.push(cart_line.menu_item_name.clone()),
        }
    }

    if !unavailable.is_empty() {
        return Err(CommitValidationError::UnavailableItems(unavailable));
    }

    let total = lines
        .iter()
        .map(|line| line.unit_price * Decimal::from(line.quantity))
        .sum();

    Ok(ValidatedCart { lines, total })
}

/// Best-effort unique, human-speakable identifier. Time-based prefix
/// plus a random suffix; collisions are negligible, not impossible, and
/// the store's unique constraint is the real backstop.
pub fn generate_order_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u16 = rand::thread_rng().gen_range(1000..10000);
    format!("ORD-{millis}-{suffix}")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::menu::{MenuItem, MenuItemId};
    use crate::domain::session::CartLine;

    use super::{generate_order_id, validate_cart, CommitValidationError};

    fn cart_line(id: &str, name: &str, quantity: u32, cents: i64) -> CartLine {
        CartLine {
            raw_text: name.to_lowercase(),
            normalized_text: name.to_lowercase(),
            menu_item_id: MenuItemId(id.to_string()),
            menu_item_name: name.to_string(),
            unit_price: Decimal::new(cents, 2),
            quantity,
            match_confidence: 0.95,
        }
    }

    fn live_item(id: &str, name: &str, cents: i64, available: bool) -> MenuItem {
        let mut item = MenuItem::new(id, name, "Main Course", Decimal::new(cents, 2));
        item.available = available;
        item
    }

    #[test]
    fn valid_cart_totals_with_fresh_prices() {
        let cart = vec![cart_line("m1", "Burger", 2, 500), cart_line("m2", "Lemonade", 1, 299)];
        // The burger price changed since it was quoted.
        let catalog = [live_item("m1", "Burger", 550, true), live_item("m2", "Lemonade", 299, true)];

        let validated = validate_cart(&cart, |id| {
            catalog.iter().find(|item| &item.id == id).cloned()
        })
        .expect("all lines valid");

        assert_eq!(validated.lines.len(), 2);
        assert_eq!(validated.total, Decimal::new(1399, 2));
    }

    #[test]
    fn empty_cart_is_rejected() {
        let result = validate_cart(&[], |_| None);
        assert_eq!(result.expect_err("empty"), CommitValidationError::EmptyCart);
    }

    #[test]
    fn any_unavailable_line_fails_the_whole_cart() {
        let cart = vec![cart_line("m1", "Burger", 1, 500), cart_line("m2", "Lemonade", 1, 299)];
        let catalog = [live_item("m1", "Burger", 500, false), live_item("m2", "Lemonade", 299, true)];

        let error = validate_cart(&cart, |id| catalog.iter().find(|item| &item.id == id).cloned())
            .expect_err("burger unavailable");

        assert_eq!(error, CommitValidationError::UnavailableItems(vec!["Burger".to_string()]));
    }

    #[test]
    fn deleted_catalog_rows_count_as_unavailable() {
        let cart = vec![cart_line("gone", "Ghost Dish", 1, 999)];
        let error = validate_cart(&cart, |_| None).expect_err("missing item");
        assert!(matches!(error, CommitValidationError::UnavailableItems(names) if names == ["Ghost Dish"]));
    }

    #[test]
    fn order_ids_are_speakable_and_distinct() {
        let first = generate_order_id();
        let second = generate_order_id();
        assert!(first.starts_with("ORD-"));
        assert_ne!(first, second);
    }
}
