//! Intent classification for inbound messages.
//!
//! Decides whether a message requests text generation, image generation, or
//! nothing, and extracts the effective prompt. The priority order is fixed:
//! ignore list, empty text, reply-context continuation, trigger prefixes
//! (longest first), direct-chat default, none. Reorderings silently change
//! which messages get dropped without feedback, so keep it exactly as is.

use genrelay_types::event::InboundMessage;
use genrelay_types::intent::{Classification, Intent};

/// Which generation kind a trigger prefix maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrefixKind {
    Text,
    Art,
}

#[derive(Debug, Clone)]
struct TriggerPrefix {
    /// Lowercased prefix used for matching.
    lowered: String,
    kind: PrefixKind,
}

/// Configured trigger and ignore lists, prepared once.
///
/// Trigger prefixes are lowercased and sorted longest-first at construction
/// (stable sort, so declaration order breaks length ties); a longer trigger
/// is never shadowed by a shorter one sharing the same start.
#[derive(Debug, Clone)]
pub struct PrefixSet {
    triggers: Vec<TriggerPrefix>,
    ignore_prefixes: Vec<String>,
    ignore_postfixes: Vec<String>,
}

impl PrefixSet {
    pub fn new(
        text_prefixes: impl IntoIterator<Item = String>,
        art_prefixes: impl IntoIterator<Item = String>,
        ignore_prefixes: impl IntoIterator<Item = String>,
        ignore_postfixes: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut triggers: Vec<TriggerPrefix> = text_prefixes
            .into_iter()
            .map(|p| (p, PrefixKind::Text))
            .chain(art_prefixes.into_iter().map(|p| (p, PrefixKind::Art)))
            .map(|(p, kind)| TriggerPrefix {
                lowered: p.to_lowercase(),
                kind,
            })
            .collect();
        triggers.sort_by_key(|p| std::cmp::Reverse(p.lowered.chars().count()));
        Self {
            triggers,
            ignore_prefixes: ignore_prefixes.into_iter().collect(),
            ignore_postfixes: ignore_postfixes.into_iter().collect(),
        }
    }

    /// Whether the ignore lists match the message text.
    fn should_ignore(&self, text: &str) -> bool {
        self.ignore_prefixes.iter().any(|p| text.starts_with(p.as_str()))
            || self.ignore_postfixes.iter().any(|p| text.ends_with(p.as_str()))
    }
}

/// Strip `lowered_prefix` off the front of `text`, comparing the lowercase
/// form of each char of `text` against the prefix.
///
/// Matching and stripping both walk `text` char by char, so prefixes whose
/// lowercase form has a different char count (`İ` lowercases to two chars)
/// still strip exactly the matched region.
fn strip_prefix_caseless<'a>(text: &'a str, lowered_prefix: &str) -> Option<&'a str> {
    let mut wanted = lowered_prefix.chars();
    let mut next = wanted.next();
    for (idx, ch) in text.char_indices() {
        if next.is_none() {
            return Some(&text[idx..]);
        }
        for lc in ch.to_lowercase() {
            match next {
                Some(want) if want == lc => next = wanted.next(),
                _ => return None,
            }
        }
    }
    if next.is_none() { Some("") } else { None }
}

/// Classify one inbound message against the configured prefix set.
pub fn classify(message: &InboundMessage, prefixes: &PrefixSet) -> Classification {
    let text = message.effective_text();

    // 1. Ignore list: skip silently, no side effects downstream.
    if prefixes.should_ignore(text) {
        return Classification::Skip;
    }

    // 2. Empty text: a plain None; the orchestrator decides the feedback.
    if text.is_empty() {
        return Classification::Intent(Intent::None {
            prompt: String::new(),
        });
    }

    // 3. Reply to the bot's own non-image message: always a continuation of
    // text generation, prefixes notwithstanding.
    if message.replies_to_own_text() {
        return Classification::Intent(Intent::TextGeneration {
            prompt: text.to_string(),
        });
    }

    // 4. Trigger prefixes, case-insensitive, longest first.
    for trigger in &prefixes.triggers {
        let Some(rest) = strip_prefix_caseless(text, &trigger.lowered) else {
            continue;
        };
        let mut prompt = rest.trim_matches([',', ' ']).to_string();
        if prompt.is_empty() {
            return Classification::EmptyPrompt;
        }
        // A command-style trigger may be addressed to a specific bot
        // ("/gen@relay_bot prompt"); drop the mention token.
        if trigger.lowered.starts_with('/') && prompt.starts_with('@') {
            match prompt.find(' ') {
                Some(space) => prompt = prompt[space + 1..].to_string(),
                None => return Classification::EmptyPrompt,
            }
        }
        let intent = match trigger.kind {
            PrefixKind::Text => Intent::TextGeneration { prompt },
            PrefixKind::Art => Intent::ArtGeneration { prompt },
        };
        return Classification::Intent(intent);
    }

    // 5. Direct chats assume every unmatched message is a text request.
    if message.is_direct {
        return Classification::Intent(Intent::TextGeneration {
            prompt: text.to_string(),
        });
    }

    // 6. Nothing matched.
    Classification::Intent(Intent::None {
        prompt: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use genrelay_types::event::ReplyContext;

    fn prefixes() -> PrefixSet {
        PrefixSet::new(
            vec!["bot,".to_string(), "/gen".to_string()],
            vec!["Alice, нарисуй".to_string(), "/art".to_string()],
            vec!["#nobot".to_string()],
            vec!["-quiet".to_string()],
        )
    }

    fn message(text: &str, is_direct: bool) -> InboundMessage {
        InboundMessage {
            chat_id: 1,
            message_id: 100,
            author_id: 5,
            author_name: "alice".to_string(),
            author_is_bot: false,
            reply: None,
            text: Some(text.to_string()),
            caption: None,
            is_direct,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn ignore_prefix_skips_silently() {
        let c = classify(&message("#nobot just chatting", false), &prefixes());
        assert_eq!(c, Classification::Skip);
    }

    #[test]
    fn ignore_postfix_skips_silently() {
        let c = classify(&message("late thought -quiet", true), &prefixes());
        assert_eq!(c, Classification::Skip);
    }

    #[test]
    fn empty_text_is_plain_none() {
        let c = classify(&message("", true), &prefixes());
        assert_eq!(
            c,
            Classification::Intent(Intent::None {
                prompt: String::new()
            })
        );
    }

    #[test]
    fn reply_to_own_text_continues_generation_without_prefix() {
        let mut msg = message("tell me more", false);
        msg.reply = Some(ReplyContext {
            message_id: 99,
            author_is_self: true,
            is_image: false,
            author_name: None,
        });
        let c = classify(&msg, &prefixes());
        assert_eq!(
            c,
            Classification::Intent(Intent::TextGeneration {
                prompt: "tell me more".to_string()
            })
        );
    }

    #[test]
    fn reply_to_own_image_does_not_continue() {
        let mut msg = message("nice picture", false);
        msg.reply = Some(ReplyContext {
            message_id: 99,
            author_is_self: true,
            is_image: true,
            author_name: None,
        });
        let c = classify(&msg, &prefixes());
        assert_eq!(
            c,
            Classification::Intent(Intent::None {
                prompt: "nice picture".to_string()
            })
        );
    }

    #[test]
    fn longest_prefix_wins_over_declaration_order() {
        // "a" declared before "ab": input starting with "ab" must match "ab".
        let set = PrefixSet::new(
            vec!["a".to_string()],
            vec!["ab".to_string()],
            vec![],
            vec![],
        );
        let c = classify(&message("ab test", false), &set);
        assert_eq!(
            c,
            Classification::Intent(Intent::ArtGeneration {
                prompt: "test".to_string()
            })
        );
    }

    #[test]
    fn prefix_with_expanding_lowercase_strips_exactly() {
        // "İ" lowercases to "i\u{307}" (two chars); the strip must still end
        // right after the matched region.
        let set = PrefixSet::new(
            vec!["i\u{307}x".to_string()],
            vec![],
            vec![],
            vec![],
        );
        let c = classify(&message("İxhello", false), &set);
        assert_eq!(
            c,
            Classification::Intent(Intent::TextGeneration {
                prompt: "hello".to_string()
            })
        );
    }

    #[test]
    fn prefix_ending_inside_a_lowercase_expansion_does_not_match() {
        // Prefix "i" against "İx": the match would end mid-expansion of "İ".
        let set = PrefixSet::new(vec!["i".to_string()], vec![], vec![], vec![]);
        let c = classify(&message("İx", false), &set);
        assert_eq!(
            c,
            Classification::Intent(Intent::None {
                prompt: "İx".to_string()
            })
        );
    }

    #[test]
    fn prefix_match_is_case_insensitive() {
        let c = classify(&message("BOT, what now", false), &prefixes());
        assert_eq!(
            c,
            Classification::Intent(Intent::TextGeneration {
                prompt: "what now".to_string()
            })
        );
    }

    #[test]
    fn multibyte_art_prefix_extracts_prompt() {
        let c = classify(
            &message("Alice, нарисуй a dog:2.0, city", false),
            &prefixes(),
        );
        assert_eq!(
            c,
            Classification::Intent(Intent::ArtGeneration {
                prompt: "a dog:2.0, city".to_string()
            })
        );
    }

    #[test]
    fn empty_after_trigger_signals_empty_prompt() {
        assert_eq!(
            classify(&message("bot, ", false), &prefixes()),
            Classification::EmptyPrompt
        );
        assert_eq!(
            classify(&message("bot,,, ", false), &prefixes()),
            Classification::EmptyPrompt
        );
    }

    #[test]
    fn command_prefix_strips_mention() {
        let c = classify(&message("/gen @relay_bot draw me a map", false), &prefixes());
        assert_eq!(
            c,
            Classification::Intent(Intent::TextGeneration {
                prompt: "draw me a map".to_string()
            })
        );
    }

    #[test]
    fn command_mention_without_following_text_is_empty_prompt() {
        let c = classify(&message("/gen @relay_bot", false), &prefixes());
        assert_eq!(c, Classification::EmptyPrompt);
    }

    #[test]
    fn direct_chat_defaults_to_text_generation() {
        let c = classify(&message("how are you", true), &prefixes());
        assert_eq!(
            c,
            Classification::Intent(Intent::TextGeneration {
                prompt: "how are you".to_string()
            })
        );
    }

    #[test]
    fn group_chat_without_trigger_is_none() {
        let c = classify(&message("how are you", false), &prefixes());
        assert_eq!(
            c,
            Classification::Intent(Intent::None {
                prompt: "how are you".to_string()
            })
        );
    }
}
