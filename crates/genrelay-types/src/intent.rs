//! Classified purpose of an inbound message.
//!
//! Computed once per inbound message by the intent classifier and consumed
//! by the pipeline orchestrator; never persisted.

/// What an inbound message asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// No generation requested. Carries the effective prompt text so the
    /// orchestrator can still decide downstream behavior (empty prompt in a
    /// direct chat gets explicit feedback).
    None { prompt: String },
    /// Text generation with the extracted prompt.
    TextGeneration { prompt: String },
    /// Image generation with the extracted prompt.
    ArtGeneration { prompt: String },
}

impl Intent {
    /// The extracted prompt text, whatever the intent kind.
    pub fn prompt(&self) -> &str {
        match self {
            Intent::None { prompt }
            | Intent::TextGeneration { prompt }
            | Intent::ArtGeneration { prompt } => prompt,
        }
    }
}

/// Outcome of classifying one inbound message.
///
/// `Skip` and `EmptyPrompt` are signals distinct from a plain `None` intent:
/// `Skip` aborts the pipeline with no side effects at all, `EmptyPrompt`
/// triggers lightweight negative feedback instead of an error reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Ignore-list hit: end silently, no side effects.
    Skip,
    /// A trigger prefix matched but nothing usable followed it.
    EmptyPrompt,
    /// A normal intent.
    Intent(Intent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_accessor() {
        let i = Intent::ArtGeneration {
            prompt: "a dog".to_string(),
        };
        assert_eq!(i.prompt(), "a dog");
        let n = Intent::None {
            prompt: String::new(),
        };
        assert_eq!(n.prompt(), "");
    }
}
