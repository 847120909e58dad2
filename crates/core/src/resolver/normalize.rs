/// Speech transcripts carry inconsistent casing and punctuation that
/// must not affect matching: lowercase, punctuation to spaces, collapse
/// whitespace.
pub fn normalize_text(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut pending_space = false;

    for character in text.chars() {
        if character.is_alphanumeric() {
            if pending_space && !normalized.is_empty() {
                normalized.push(' ');
            }
            pending_space = false;
            for lowered in character.to_lowercase() {
                normalized.push(lowered);
            }
        } else {
            pending_space = true;
        }
    }

    normalized
}

pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}
