//! Spoken response rendering. Every prompt the engine can emit lives
//! here so wording stays consistent and the dispatch logic stays free
//! of string formatting.

use rust_decimal::Decimal;

use crate::domain::menu::{self, MenuItem};
use crate::domain::order::Order;
use crate::domain::session::CartLine;
use crate::resolver::MatchCandidate;

pub fn greeting() -> String {
    "Hello! Thanks for calling. What can I get for you today?".to_string()
}

pub fn did_not_catch() -> String {
    "Sorry, I didn't catch that. Could you say it again?".to_string()
}

pub fn what_would_you_like() -> String {
    "What would you like to order?".to_string()
}

pub fn item_added(quantity: u32, item_name: &str) -> String {
    format!("Got it, {quantity} {item_name}. Anything else?")
}

pub fn item_replaced(removed_name: &str, quantity: u32, item_name: &str) -> String {
    format!("No problem, I took off the {removed_name}. Got it, {quantity} {item_name}. Anything else?")
}

pub fn clarify(candidates: &[MatchCandidate]) -> String {
    format!("Did you mean {}?", spoken_list(candidates.iter().map(|c| c.menu_item_name.as_str())))
}

pub fn show_alternatives(candidates: &[MatchCandidate]) -> String {
    format!(
        "I couldn't find that one. We do have {}. Would any of those work?",
        spoken_list(candidates.iter().map(|c| c.menu_item_name.as_str()))
    )
}

pub fn no_match() -> String {
    "I'm sorry, I couldn't find that on our menu. Would you like to hear what we have?".to_string()
}

pub fn ask_name() -> String {
    "Great! Can I get your name, please?".to_string()
}

pub fn ask_name_again() -> String {
    "Sorry, I still need your name for the order. What name should I put it under?".to_string()
}

pub fn ask_phone(name: &str) -> String {
    format!("Thanks, {name}! And what's the best phone number for you?")
}

/// Enumerates every cart line exactly once in insertion order.
/// Rendering is pure, so re-rendering an unchanged cart is
/// byte-identical.
pub fn order_summary(cart: &[CartLine]) -> String {
    format!("So your order is: {}. Is that correct?", cart_line_list(cart))
}

pub fn cart_line_list(cart: &[CartLine]) -> String {
    let rendered: Vec<String> = cart
        .iter()
        .map(|line| format!("{} {}", line.quantity, line.menu_item_name))
        .collect();
    rendered.join(", ")
}

pub fn placing_order() -> String {
    "Perfect, one moment while I place your order.".to_string()
}

pub fn order_placed(order: &Order) -> String {
    format!(
        "Your order is placed! The total is ${}. Your order number is {}. We'll have it ready for you soon. Thanks for calling!",
        order.total,
        order.id.spoken()
    )
}

pub fn unavailable_items(names: &[String]) -> String {
    format!(
        "I'm so sorry, it looks like {} {} not available right now. Would you like something else instead?",
        spoken_list_and(names.iter().map(String::as_str)),
        if names.len() == 1 { "is" } else { "are" }
    )
}

pub fn store_trouble() -> String {
    "I'm sorry, I'm having trouble placing the order right now. Could you say confirm once more and I'll try again?".to_string()
}

pub fn confirmation_reopened() -> String {
    "No problem, what would you like to change?".to_string()
}

pub fn menu_overview(catalog: &[MenuItem]) -> String {
    if catalog.is_empty() {
        return "I'm sorry, I can't see our menu right now. Could you try again in a moment?"
            .to_string();
    }
    let categories = menu::categories(catalog);
    format!(
        "We have {}. Which would you like to hear more about?",
        spoken_list(categories.iter().map(String::as_str))
    )
}

pub fn category_listing(category: &str, items: &[&MenuItem]) -> String {
    if items.is_empty() {
        return format!("I'm sorry, I don't see anything under {category} right now.");
    }
    let rendered: Vec<String> =
        items.iter().map(|item| format!("{} for ${}", item.name, item.price)).collect();
    format!("For {category} we have {}.", spoken_list_and(rendered.iter().map(String::as_str)))
}

/// Single-item inquiry answer that doubles as an offer; an affirmative
/// on the next turn orders this item.
pub fn item_offer(item_name: &str, price: Decimal) -> String {
    format!("{item_name} is ${price}. Would you like to order it?")
}

pub fn info_noted() -> String {
    "Thanks, I've got that. Anything else for your order?".to_string()
}

pub fn general_help() -> String {
    "I can tell you about our menu or take your order. What would you like?".to_string()
}

pub fn empathy() -> String {
    "I'm really sorry about that, and I completely understand your frustration. Let me help make it right."
        .to_string()
}

pub fn order_status_found(order: &Order) -> String {
    format!(
        "Order {} for {} is currently {}. The total is ${}.",
        order.id.spoken(),
        order.customer_name,
        order.status.as_str(),
        order.total
    )
}

pub fn order_not_placed_yet(cart: &[CartLine]) -> String {
    format!(
        "Your order isn't placed yet. So far I have {}. Would you like to finish it?",
        cart_line_list(cart)
    )
}

pub fn order_status_ask_id() -> String {
    "Sure, I can check on that. Could you read me your order number?".to_string()
}

pub fn order_status_not_found() -> String {
    "I'm sorry, I couldn't find an order with that number. Could you double-check it?".to_string()
}

/// Consecutive assistant prompts must never be verbatim-identical.
/// Prefixing alternates the wording, so a prompt and its re-ask always
/// differ even when the engine lands on the same branch twice.
pub fn vary(reply: String, last_reply: Option<&str>) -> String {
    match last_reply {
        Some(previous) if previous == reply => {
            format!("Just so we're on the same page: {reply}")
        }
        _ => reply,
    }
}

fn spoken_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    join_spoken(names, "or")
}

fn spoken_list_and<'a>(names: impl Iterator<Item = &'a str>) -> String {
    join_spoken(names, "and")
}

fn join_spoken<'a>(names: impl Iterator<Item = &'a str>, conjunction: &str) -> String {
    let collected: Vec<&str> = names.collect();
    match collected.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [head @ .., last] => format!("{} {conjunction} {last}", head.join(", ")),
    }
}
