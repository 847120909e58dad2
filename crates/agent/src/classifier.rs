//! Turn classification adapters. The engine consumes a closed
//! [`Intent`] set; these adapters map a raw transcript onto it, either
//! through a chat model or through the built-in keyword heuristics.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use tably_core::domain::intent::Intent;
use tably_core::parser;
use tably_core::resolver::normalize::{normalize_text, tokenize};

use crate::llm::LlmClient;

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, utterance: &str) -> Result<Intent>;
}

pub struct LlmIntentClassifier {
    client: Arc<dyn LlmClient>,
}

impl LlmIntentClassifier {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    fn build_prompt(utterance: &str) -> String {
        let labels: Vec<&str> = Intent::ALL.iter().map(|intent| intent.as_label()).collect();
        format!(
            "You classify one caller utterance from a restaurant phone call.\n\
             Answer with exactly one of these labels and nothing else:\n{}\n\n\
             Utterance: {utterance:?}\nLabel:",
            labels.join("\n")
        )
    }
}

/// Pulls a known label out of a model reply that may carry quotes,
/// punctuation, or a JSON wrapper around the label itself.
fn label_from_reply(reply: &str) -> Intent {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(reply.trim()) {
        if let Some(label) = value.get("intent").and_then(|intent| intent.as_str()) {
            return Intent::from_label_or_default(label);
        }
    }
    let cleaned: String = reply
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .find_map(Intent::parse_label)
        .unwrap_or(Intent::GeneralQuestion)
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, utterance: &str) -> Result<Intent> {
        let reply = self.client.complete(&Self::build_prompt(utterance)).await?;
        Ok(label_from_reply(&reply))
    }
}

const COMPLAINT_MARKERS: [&str; 11] = [
    "terrible",
    "awful",
    "horrible",
    "disgusting",
    "worst",
    "angry",
    "furious",
    "ridiculous",
    "unacceptable",
    "complaint",
    "manager",
];

const STATUS_MARKERS: [&str; 5] = [
    "where is my order",
    "order status",
    "status of my order",
    "is my order ready",
    "check on my order",
];

const MENU_MARKERS: [&str; 4] =
    ["menu", "what do you have", "what do you serve", "what can i order"];

const CATEGORY_WORDS: [&str; 11] = [
    "appetizers",
    "starters",
    "snacks",
    "mains",
    "main course",
    "entrees",
    "breads",
    "desserts",
    "sweets",
    "drinks",
    "beverages",
];

const ITEM_INQUIRY_STARTS: [&str; 5] =
    ["how much", "do you have", "what is", "is there", "whats in"];

const ORDER_STARTS: [&str; 13] = [
    "i want",
    "i would like",
    "i d like",
    "i ll have",
    "i will have",
    "i ll take",
    "can i get",
    "can i have",
    "could i get",
    "could i have",
    "give me",
    "get me",
    "let me get",
];

const INFO_MARKERS: [&str; 5] =
    ["my name is", "name is", "this is", "my number is", "phone number"];

const AFFIRMATIVE_WORDS: [&str; 10] =
    ["yes", "yeah", "yep", "yup", "sure", "correct", "confirm", "okay", "ok", "perfect"];

const NEGATIVE_WORDS: [&str; 3] = ["no", "nope", "nah"];

fn longest_digit_run(utterance: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in utterance.chars() {
        if c.is_ascii_digit() {
            current += 1;
            longest = longest.max(current);
        } else if !matches!(c, ' ' | '-' | '(' | ')' | '.' | '+') {
            current = 0;
        }
    }
    longest
}

/// Keyword classifier used when no chat model is configured, and as the
/// behavior baseline the tests pin down. Rules are ordered from the
/// most specific signal to the least.
#[derive(Clone, Debug, Default)]
pub struct HeuristicIntentClassifier;

#[async_trait]
impl IntentClassifier for HeuristicIntentClassifier {
    async fn classify(&self, utterance: &str) -> Result<Intent> {
        Ok(heuristic_intent(utterance))
    }
}

fn heuristic_intent(utterance: &str) -> Intent {
    let normalized = normalize_text(utterance);
    let tokens = tokenize(&normalized);

    if COMPLAINT_MARKERS.iter().any(|marker| normalized.contains(marker)) {
        return Intent::AngryComplaint;
    }
    if STATUS_MARKERS.iter().any(|marker| normalized.contains(marker))
        || normalized.contains("ord ")
    {
        return Intent::OrderStatus;
    }
    if let Some(first) = tokens.first() {
        let short = tokens.len() <= 4;
        if short && (AFFIRMATIVE_WORDS.contains(first) || NEGATIVE_WORDS.contains(first)) {
            return Intent::ConfirmOrder;
        }
    }
    if INFO_MARKERS.iter().any(|marker| normalized.contains(marker))
        || longest_digit_run(utterance) >= 7
    {
        return Intent::ProvideInfo;
    }
    if ORDER_STARTS.iter().any(|start| starts_with_phrase(&normalized, start)) {
        return Intent::OrderItem;
    }
    if MENU_MARKERS.iter().any(|marker| normalized.contains(marker)) {
        return Intent::MenuInquiry;
    }
    if CATEGORY_WORDS.iter().any(|word| normalized.contains(word)) {
        return Intent::CategoryInquiry;
    }
    if ITEM_INQUIRY_STARTS.iter().any(|start| starts_with_phrase(&normalized, start)) {
        return Intent::ItemInquiry;
    }
    // A quantity or an article up front reads as an order even without
    // ordering boilerplate, e.g. "two burgers" or "a lemonade".
    let parsed = parser::parse(utterance);
    if parsed.quantity > 1 {
        return Intent::OrderItem;
    }
    if matches!(tokens.first(), Some(&"a") | Some(&"an") | Some(&"and")) && tokens.len() > 1 {
        return Intent::OrderItem;
    }

    Intent::GeneralQuestion
}

fn starts_with_phrase(normalized: &str, phrase: &str) -> bool {
    normalized == phrase
        || normalized.strip_prefix(phrase).map(|rest| rest.starts_with(' ')).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use tably_core::domain::intent::Intent;

    use super::{heuristic_intent, label_from_reply};

    #[test]
    fn ordering_phrases_classify_as_order_item() {
        assert_eq!(heuristic_intent("I want two burgers"), Intent::OrderItem);
        assert_eq!(heuristic_intent("can I get a garlic naan please"), Intent::OrderItem);
        assert_eq!(heuristic_intent("two samosas"), Intent::OrderItem);
        assert_eq!(heuristic_intent("a lemonade"), Intent::OrderItem);
    }

    #[test]
    fn menu_and_category_questions_split_correctly() {
        assert_eq!(heuristic_intent("What do you have on the menu?"), Intent::MenuInquiry);
        assert_eq!(heuristic_intent("what desserts do you have"), Intent::CategoryInquiry);
        assert_eq!(heuristic_intent("how much is the lemonade"), Intent::ItemInquiry);
    }

    #[test]
    fn short_yes_and_no_turns_are_confirmations() {
        assert_eq!(heuristic_intent("yes"), Intent::ConfirmOrder);
        assert_eq!(heuristic_intent("yes that's correct"), Intent::ConfirmOrder);
        assert_eq!(heuristic_intent("no that's all"), Intent::ConfirmOrder);
    }

    #[test]
    fn contact_details_classify_as_provide_info() {
        assert_eq!(heuristic_intent("My name is John"), Intent::ProvideInfo);
        assert_eq!(heuristic_intent("555-123-4567"), Intent::ProvideInfo);
        assert_eq!(heuristic_intent("you can reach me at (555) 123 4567"), Intent::ProvideInfo);
    }

    #[test]
    fn complaints_and_status_checks_win_over_other_rules() {
        assert_eq!(heuristic_intent("this is unacceptable, I want a manager"), Intent::AngryComplaint);
        assert_eq!(heuristic_intent("where is my order"), Intent::OrderStatus);
        assert_eq!(heuristic_intent("checking order status for ORD-17"), Intent::OrderStatus);
    }

    #[test]
    fn unknown_turns_fall_back_to_general_question() {
        assert_eq!(heuristic_intent("hello there"), Intent::GeneralQuestion);
        assert_eq!(heuristic_intent("do you deliver"), Intent::GeneralQuestion);
    }

    #[test]
    fn model_replies_are_tolerated_in_several_shapes() {
        assert_eq!(label_from_reply("order_item"), Intent::OrderItem);
        assert_eq!(label_from_reply("  \"menu_inquiry\".\n"), Intent::MenuInquiry);
        assert_eq!(label_from_reply(r#"{"intent": "confirm_order"}"#), Intent::ConfirmOrder);
        assert_eq!(label_from_reply("beats me"), Intent::GeneralQuestion);
    }
}
