use crate::resolver::normalize::tokenize;

/// Words shorter than this never participate in the substring
/// fallback; short prepositions would otherwise match everything.
const MIN_SUBSTRING_LEN: usize = 4;

pub fn levenshtein(left: &str, right: &str) -> usize {
    let left_chars: Vec<char> = left.chars().collect();
    let right_chars: Vec<char> = right.chars().collect();
    if left_chars.is_empty() {
        return right_chars.len();
    }
    if right_chars.is_empty() {
        return left_chars.len();
    }

    let mut previous_row: Vec<usize> = (0..=right_chars.len()).collect();
    let mut current_row = vec![0usize; right_chars.len() + 1];

    for (row, left_char) in left_chars.iter().enumerate() {
        current_row[0] = row + 1;
        for (column, right_char) in right_chars.iter().enumerate() {
            let substitution_cost = usize::from(left_char != right_char);
            current_row[column + 1] = (previous_row[column] + substitution_cost)
                .min(previous_row[column + 1] + 1)
                .min(current_row[column] + 1);
        }
        std::mem::swap(&mut previous_row, &mut current_row);
    }

    previous_row[right_chars.len()]
}

/// Normalized similarity in 0.0..=1.0; 1.0 is an exact match.
pub fn similarity(left: &str, right: &str) -> f64 {
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    let longest = left.chars().count().max(right.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(left, right) as f64 / longest as f64
}

/// Phrase-level score merging whole-string similarity with the best
/// per-token alignment, so "samosa" still scores well against
/// "vegetable samosa".
pub fn phrase_similarity(query: &str, candidate: &str) -> f64 {
    let whole = similarity(query, candidate);
    let token_level = token_set_similarity(query, candidate);
    whole.max(token_level)
}

fn token_set_similarity(query: &str, candidate: &str) -> f64 {
    let query_tokens = tokenize(query);
    let candidate_tokens = tokenize(candidate);
    if query_tokens.is_empty() || candidate_tokens.is_empty() {
        return 0.0;
    }

    let mut total = 0.0;
    for query_token in &query_tokens {
        let best = candidate_tokens
            .iter()
            .map(|candidate_token| similarity(query_token, candidate_token))
            .fold(0.0_f64, f64::max);
        total += best;
    }
    // Dampen when the candidate has many tokens the query never
    // mentioned, so "chicken" does not fully match every chicken dish.
    let coverage = query_tokens.len() as f64 / candidate_tokens.len().max(query_tokens.len()) as f64;
    (total / query_tokens.len() as f64) * (0.75 + 0.25 * coverage)
}

/// Direct substring fallback: recovers matches fuzzy scoring alone
/// misses for short words. The shared length is judged against the
/// candidate's whole normalized name, not just the containing word, so
/// one generic word shared by several multi-word items cannot reach the
/// confident tier on its own. Returns None when no word pair qualifies.
pub fn substring_confidence(query: &str, candidate: &str) -> Option<f64> {
    let candidate_tokens = tokenize(candidate);
    let candidate_len: usize = candidate_tokens.iter().map(|token| token.chars().count()).sum();
    if candidate_len == 0 {
        return None;
    }

    let mut best: Option<f64> = None;
    for query_token in tokenize(query) {
        for candidate_token in &candidate_tokens {
            let (shorter, longer) = if query_token.len() <= candidate_token.len() {
                (query_token, *candidate_token)
            } else {
                (*candidate_token, query_token)
            };
            if shorter.len() < MIN_SUBSTRING_LEN || !longer.contains(shorter) {
                continue;
            }
            let span = candidate_len.max(longer.chars().count());
            let ratio = shorter.chars().count() as f64 / span as f64;
            if ratio < 0.5 {
                continue;
            }
            let confidence = 0.6 + 0.4 * ratio;
            if best.map_or(true, |current| confidence > current) {
                best = Some(confidence);
            }
        }
    }
    best
}
