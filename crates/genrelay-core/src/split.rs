//! Splitting long replies into transport-sized messages.

/// Maximum length of one outbound message. The transport allows 4096;
/// 96 characters are reserved for possible markup escaping.
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Split `text` into chunks each at most `MAX_MESSAGE_LEN` bytes.
///
/// Prefers splitting at the last newline within the budget, then the last
/// space, then a hard cut. Cuts always land on char boundaries.
pub fn split_to_messages(text: &str) -> Vec<String> {
    split_with_limit(text, MAX_MESSAGE_LEN)
}

fn split_with_limit(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > limit {
        let head = &rest[..floor_char_boundary(rest, limit)];
        let (cut, skip_separator) = match head.rfind('\n').or_else(|| head.rfind(' ')) {
            Some(idx) => (idx, true),
            None => (head.len(), false),
        };
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut + usize::from(skip_separator)..];
    }
    chunks.push(rest.to_string());
    chunks
}

/// Largest index <= `max` that lies on a char boundary of `s`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut idx = max.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
