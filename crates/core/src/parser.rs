//! Quantity and correction grammar for inbound utterances. Kept as an
//! isolated token-table module so the dispatch logic never needs to
//! know how "too burgers" becomes quantity 2.

use crate::resolver::normalize::{normalize_text, tokenize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedUtterance {
    /// Always >= 1; defaults to 1 when no quantity token is present.
    pub quantity: u32,
    /// What remains after stripping quantity tokens and ordering
    /// boilerplate; this is what the menu resolver sees.
    pub residual: String,
    pub is_correction: bool,
}

const MAX_SPOKEN_QUANTITY: u32 = 12;

/// Number words a transcript can contain verbatim.
const NUMBER_WORDS: [(&str, u32); 12] = [
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
];

/// Speech-to-text homophones of number words. The transcription layer
/// regularly emits these in place of the number the caller said.
const NUMBER_HOMOPHONES: [(&str, u32); 7] = [
    ("too", 2),
    ("to", 2),
    ("won", 1),
    ("tree", 3),
    ("free", 3),
    ("for", 4),
    ("ate", 8),
];

/// Homophones that double as everyday function words. These only count
/// as quantities at utterance start, otherwise "naan to go" and
/// "samosa for me" would gain phantom counts.
const AMBIGUOUS_HOMOPHONES: [&str; 3] = ["to", "for", "free"];

/// Leading phrases that retract the most recently added cart line.
const CORRECTION_PREFIXES: [&str; 7] = [
    "no i meant",
    "i meant",
    "no wait",
    "actually",
    "not that",
    "no",
    "just",
];

/// Ordering filler stripped before resolution; longest first so "can i
/// get" wins over "can i".
const BOILERPLATE_PHRASES: [&str; 12] = [
    "can i please get",
    "could i please have",
    "i would like to order",
    "i would like",
    "can i please have",
    "could i have",
    "can i have",
    "can i get",
    "i want to order",
    "i want",
    "i will have",
    "give me",
];

const TRAILING_FILLER: [&str; 3] = ["please", "thanks", "thank you"];

pub fn parse(utterance: &str) -> ParsedUtterance {
    let normalized = normalize_text(utterance);
    let (is_correction, after_correction) = strip_correction_prefix(&normalized);
    let after_boilerplate = strip_boilerplate(after_correction);

    let tokens = tokenize(&after_boilerplate);
    let mut quantity: Option<u32> = None;
    let mut residual_tokens: Vec<&str> = Vec::with_capacity(tokens.len());

    for (position, token) in tokens.iter().enumerate() {
        if quantity.is_none() {
            if let Some(value) = quantity_from_token(token, position == 0) {
                quantity = Some(value);
                continue;
            }
        }
        residual_tokens.push(token);
    }

    strip_trailing_filler(&mut residual_tokens);

    ParsedUtterance {
        quantity: quantity.unwrap_or(1),
        residual: residual_tokens.join(" "),
        is_correction,
    }
}

/// Filler entries may span several words, so each is matched as a
/// phrase against the token tail rather than one token at a time.
fn strip_trailing_filler(residual_tokens: &mut Vec<&str>) {
    loop {
        let mut stripped = false;
        for phrase in TRAILING_FILLER {
            let phrase_tokens: Vec<&str> = phrase.split(' ').collect();
            if phrase_tokens.len() > residual_tokens.len() {
                continue;
            }
            let tail_start = residual_tokens.len() - phrase_tokens.len();
            if residual_tokens[tail_start..] == phrase_tokens[..] {
                residual_tokens.truncate(tail_start);
                stripped = true;
                break;
            }
        }
        if !stripped {
            return;
        }
    }
}

fn strip_correction_prefix(normalized: &str) -> (bool, String) {
    for prefix in CORRECTION_PREFIXES {
        if normalized == prefix {
            return (true, String::new());
        }
        if let Some(rest) = normalized.strip_prefix(prefix) {
            if rest.starts_with(' ') {
                return (true, rest.trim_start().to_string());
            }
        }
    }
    (false, normalized.to_string())
}

fn strip_boilerplate(text: String) -> String {
    let mut current = text;
    loop {
        let mut stripped = false;
        for phrase in BOILERPLATE_PHRASES {
            if current == phrase {
                current.clear();
                stripped = true;
                break;
            }
            if let Some(rest) = current.strip_prefix(phrase) {
                if rest.starts_with(' ') {
                    current = rest.trim_start().to_string();
                    stripped = true;
                    break;
                }
            }
        }
        if !stripped {
            return current;
        }
    }
}

fn quantity_from_token(token: &str, at_start: bool) -> Option<u32> {
    if let Ok(digits) = token.parse::<u32>() {
        if (1..=MAX_SPOKEN_QUANTITY).contains(&digits) {
            return Some(digits);
        }
        return None;
    }

    for (word, value) in NUMBER_WORDS {
        if token == word {
            return Some(value);
        }
    }

    for (word, value) in NUMBER_HOMOPHONES {
        if token == word {
            if AMBIGUOUS_HOMOPHONES.contains(&token) && !at_start {
                return None;
            }
            return Some(value);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::parse;

    #[test]
    fn defaults_to_quantity_one_without_a_number_token() {
        let parsed = parse("butter chicken");
        assert_eq!(parsed.quantity, 1);
        assert_eq!(parsed.residual, "butter chicken");
        assert!(!parsed.is_correction);
    }

    #[test]
    fn extracts_number_words_and_digits() {
        assert_eq!(parse("two burgers").quantity, 2);
        assert_eq!(parse("3 naan").quantity, 3);
        assert_eq!(parse("twelve samosas").quantity, 12);
    }

    #[test]
    fn strips_ordering_boilerplate_before_resolution() {
        let parsed = parse("I want two burgers");
        assert_eq!(parsed.quantity, 2);
        assert_eq!(parsed.residual, "burgers");

        let parsed = parse("can I get a lemonade please");
        assert_eq!(parsed.residual, "a lemonade");
    }

    #[test]
    fn normalizes_speech_homophones_of_number_words() {
        let parsed = parse("too burgers");
        assert_eq!(parsed.quantity, 2);
        assert_eq!(parsed.residual, "burgers");

        assert_eq!(parse("tree samosas").quantity, 3);
        assert_eq!(parse("ate naan").quantity, 8);
    }

    #[test]
    fn ambiguous_homophones_only_count_at_utterance_start() {
        // "naan to go" keeps quantity 1 and the full residual.
        let parsed = parse("naan to go");
        assert_eq!(parsed.quantity, 1);
        assert_eq!(parsed.residual, "naan to go");

        // At utterance start the same token is a quantity.
        let parsed = parse("to burgers");
        assert_eq!(parsed.quantity, 2);
        assert_eq!(parsed.residual, "burgers");

        let parsed = parse("samosa for me");
        assert_eq!(parsed.quantity, 1);
        assert_eq!(parsed.residual, "samosa for me");
    }

    #[test]
    fn detects_correction_prefixes() {
        let parsed = parse("no, I meant lemonade");
        assert!(parsed.is_correction);
        assert_eq!(parsed.residual, "lemonade");

        let parsed = parse("just one samosa");
        assert!(parsed.is_correction);
        assert_eq!(parsed.quantity, 1);
        assert_eq!(parsed.residual, "samosa");

        let parsed = parse("actually make that two lassi");
        assert!(parsed.is_correction);
        assert_eq!(parsed.quantity, 2);
    }

    #[test]
    fn correction_word_inside_an_item_name_is_not_a_correction() {
        let parsed = parse("notable special");
        assert!(!parsed.is_correction);
        assert_eq!(parsed.residual, "notable special");
    }

    #[test]
    fn out_of_range_digits_are_left_in_the_residual() {
        let parsed = parse("99 burgers");
        assert_eq!(parsed.quantity, 1);
        assert_eq!(parsed.residual, "99 burgers");
    }

    #[test]
    fn only_the_first_quantity_token_is_consumed() {
        let parsed = parse("two three cheese pizza");
        assert_eq!(parsed.quantity, 2);
        assert_eq!(parsed.residual, "three cheese pizza");
    }

    #[test]
    fn trailing_filler_is_removed_from_the_residual() {
        let parsed = parse("two samosas thank you");
        assert_eq!(parsed.quantity, 2);
        assert_eq!(parsed.residual, "samosas");

        // Stacked filler strips phrase by phrase.
        let parsed = parse("a burger please thank you");
        assert_eq!(parsed.residual, "a burger");

        // A filler word in the middle of the utterance is left alone.
        let parsed = parse("thank you burger");
        assert_eq!(parsed.residual, "thank you burger");
    }
}
