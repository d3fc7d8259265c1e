//! Context window selection over the ambient log.
//!
//! Pure pieces of the windower: the serialized-size model, the cutoff
//! computation, and the line format handed to the backend. The atomic
//! read-and-prune lives behind `ConversationRepository::take_window`, whose
//! implementations call [`cutoff_timestamp`] inside their transaction.

use chrono::{DateTime, Utc};

use genrelay_types::message::AmbientLogEntry;

/// Serialized length of one entry: sender, addressee, and text, plus one
/// separator byte after each of the three fields.
pub fn serialized_len(from_name: &str, to_name: Option<&str>, text: &str) -> usize {
    from_name.len() + 1 + to_name.unwrap_or("").len() + 1 + text.len() + 1
}

/// Earliest timestamp `T` such that all entries with timestamp >= `T`
/// together stay below `budget` bytes.
///
/// `sizes` lists `(timestamp, serialized_len)` pairs newest first. Returns
/// `None` when not even the newest entry fits (or the log is empty); when
/// the whole log fits, returns the oldest timestamp.
pub fn cutoff_timestamp(
    sizes: &[(DateTime<Utc>, usize)],
    budget: usize,
) -> Option<DateTime<Utc>> {
    let mut total = 0usize;
    let mut cutoff = None;
    for (ts, len) in sizes {
        total += len;
        if total >= budget {
            break;
        }
        cutoff = Some(*ts);
    }
    cutoff
}

/// Concatenation format of one entry for backend consumption.
pub fn format_entry(entry: &AmbientLogEntry) -> String {
    format!(
        "{},{},{}",
        entry.from_name,
        entry.to_name.as_deref().unwrap_or(""),
        entry.text
    )
}

/// Join a window (oldest first) into the digest payload, one entry per line.
pub fn join_window(entries: &[AmbientLogEntry]) -> String {
    entries
        .iter()
        .map(format_entry)
        .collect::<Vec<_>>()
        .join("\n")
}
