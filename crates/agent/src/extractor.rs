//! Customer name and phone extraction from a provide_info turn. The
//! heuristic adapter is an ordered strategy chain: digit runs first,
//! then introduction phrases, then a bare spoken name.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use tably_core::domain::session::CustomerInfo;
use tably_core::resolver::normalize::normalize_text;

use crate::llm::LlmClient;

#[async_trait]
pub trait CustomerInfoExtractor: Send + Sync {
    async fn extract(&self, utterance: &str) -> Result<CustomerInfo>;
}

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

const NAME_PREFIXES: [&str; 6] =
    ["my name is", "the name is", "name is", "this is", "i am", "it s for"];

/// Words that end a spoken name or disqualify a bare utterance from
/// being one.
const NAME_STOP_WORDS: [&str; 14] = [
    "and", "my", "number", "phone", "yes", "no", "okay", "ok", "please", "thanks", "thank",
    "hello", "hi", "order",
];

#[derive(Clone, Debug, Default)]
pub struct HeuristicCustomerInfoExtractor;

#[async_trait]
impl CustomerInfoExtractor for HeuristicCustomerInfoExtractor {
    async fn extract(&self, utterance: &str) -> Result<CustomerInfo> {
        Ok(heuristic_customer_info(utterance))
    }
}

fn heuristic_customer_info(utterance: &str) -> CustomerInfo {
    CustomerInfo { name: extract_name(utterance), phone: extract_phone(utterance) }
}

/// Longest run of digits, tolerating the separators speech-to-text and
/// callers put inside a number. Runs outside 7..=15 digits are ignored
/// so a quantity or an order number is never mistaken for a phone.
fn extract_phone(utterance: &str) -> Option<String> {
    let mut best: Option<String> = None;
    let mut current = String::new();

    let push_current = |current: &mut String, best: &mut Option<String>| {
        let digits = current.len();
        if (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
            && best.as_ref().map(|b| b.len() < digits).unwrap_or(true)
        {
            *best = Some(current.clone());
        }
        current.clear();
    };

    for c in utterance.chars() {
        if c.is_ascii_digit() {
            current.push(c);
        } else if !matches!(c, ' ' | '-' | '(' | ')' | '.' | '+') {
            push_current(&mut current, &mut best);
        }
    }
    push_current(&mut current, &mut best);
    best
}

fn extract_name(utterance: &str) -> Option<String> {
    let normalized = normalize_text(utterance);

    for prefix in NAME_PREFIXES {
        if let Some(rest) = normalized.strip_prefix(prefix) {
            if rest.starts_with(' ') {
                let words = name_words(rest.trim_start());
                if !words.is_empty() {
                    return Some(title_case(&words));
                }
            }
        }
        if let Some(index) = normalized.find(&format!(" {prefix} ")) {
            let rest = &normalized[index + prefix.len() + 2..];
            let words = name_words(rest);
            if !words.is_empty() {
                return Some(title_case(&words));
            }
        }
    }

    // A bare one-to-three-word alphabetic reply is taken as the name
    // itself; the runtime only asks for it when collecting info.
    let words: Vec<&str> = normalized.split_whitespace().collect();
    if (1..=3).contains(&words.len())
        && words.iter().all(|word| {
            word.chars().all(|c| c.is_ascii_alphabetic()) && !NAME_STOP_WORDS.contains(word)
        })
    {
        return Some(title_case(&words));
    }

    None
}

fn name_words(rest: &str) -> Vec<&str> {
    rest.split_whitespace()
        .take_while(|word| {
            word.chars().all(|c| c.is_ascii_alphabetic()) && !NAME_STOP_WORDS.contains(word)
        })
        .take(3)
        .collect()
}

fn title_case(words: &[&str]) -> String {
    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub struct LlmCustomerInfoExtractor {
    client: Arc<dyn LlmClient>,
}

impl LlmCustomerInfoExtractor {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    fn build_prompt(utterance: &str) -> String {
        format!(
            "Extract the customer's name and phone number from this restaurant \
             call utterance. Reply with JSON only, in the shape \
             {{\"name\": string or null, \"phone\": string or null}}.\n\n\
             Utterance: {utterance:?}"
        )
    }
}

#[derive(Deserialize)]
struct ExtractedInfo {
    name: Option<String>,
    phone: Option<String>,
}

/// Accepts the JSON object anywhere in the reply; models often wrap it
/// in prose or code fences.
fn info_from_reply(reply: &str) -> Option<CustomerInfo> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    let parsed: ExtractedInfo = serde_json::from_str(&reply[start..=end]).ok()?;

    let name = parsed.name.map(|name| name.trim().to_string()).filter(|name| !name.is_empty());
    let phone = parsed
        .phone
        .map(|phone| phone.chars().filter(char::is_ascii_digit).collect::<String>())
        .filter(|digits| (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()));

    Some(CustomerInfo { name, phone })
}

#[async_trait]
impl CustomerInfoExtractor for LlmCustomerInfoExtractor {
    async fn extract(&self, utterance: &str) -> Result<CustomerInfo> {
        let reply = self.client.complete(&Self::build_prompt(utterance)).await?;
        match info_from_reply(&reply) {
            Some(info) => Ok(info),
            // A malformed model reply degrades to the heuristics rather
            // than losing the turn.
            None => Ok(heuristic_customer_info(utterance)),
        }
    }
}
