//! Pipeline orchestrator.
//!
//! Drives one inbound message end to end: classification, ambient logging,
//! authorization, dialog assembly, gated and retried generation, splitting,
//! delivery, persistence of the bot's own replies. Every internal error is
//! resolved here to a single user-visible outcome; nothing escapes
//! [`Pipeline::handle`].

use chrono::Utc;
use std::time::Duration;

use genrelay_types::error::{GenerationError, RepositoryError};
use genrelay_types::event::InboundMessage;
use genrelay_types::intent::{Classification, Intent};
use genrelay_types::message::{DialogEntry, StoredMessage};
use genrelay_types::preferences::UserPreferences;
use genrelay_types::status::{ChatStatus, UserStatus};

use crate::classify::{self, PrefixSet};
use crate::conversation::ConversationService;
use crate::dialog;
use crate::gate::AdmissionGate;
use crate::generate::{ArtGenerator, Responder, TextGenerator, TextRequest};
use crate::repository::{
    ConversationRepository, MessageRepository, PreferencesRepository, StatusRepository,
};
use crate::retry::RetryPolicy;
use crate::split;
use crate::texts::{EMPTY_PROMPT_REACTION, Responses};

/// Backend context budget for chat digests.
const DIGEST_CONTEXT_LENGTH: usize = 1 << 13;

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Ignore-list hit; ended with no side effects.
    Skipped,
    /// No generation intent; at most the ambient log was touched.
    NoIntent,
    /// A trigger matched but carried no usable prompt.
    EmptyPrompt,
    /// Authorization denied the request.
    Blocked,
    /// Digest requested over an empty (or unfitting) log.
    EmptyDigest,
    /// Text reply delivered, in `messages` transport messages.
    Replied { messages: usize },
    /// Image reply delivered.
    RepliedImage,
    /// Generation or delivery failed; the user got an error text.
    Failed,
}

enum Access {
    Granted,
    Denied(String),
}

/// The request pipeline, generic over its collaborators.
///
/// One instance serves the whole process; the gate and retry policy inside
/// bound all concurrent runs together.
pub struct Pipeline<M, C, S, P, T, A, R>
where
    C: ConversationRepository,
{
    messages: M,
    conversation: ConversationService<C>,
    statuses: S,
    preferences: P,
    text_gen: T,
    art_gen: A,
    responder: R,
    gate: AdmissionGate,
    retry: RetryPolicy,
    prefixes: PrefixSet,
    responses: Responses,
}

impl<M, C, S, P, T, A, R> Pipeline<M, C, S, P, T, A, R>
where
    M: MessageRepository,
    C: ConversationRepository,
    S: StatusRepository,
    P: PreferencesRepository,
    T: TextGenerator,
    A: ArtGenerator,
    R: Responder,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        messages: M,
        conversation: ConversationService<C>,
        statuses: S,
        preferences: P,
        text_gen: T,
        art_gen: A,
        responder: R,
        gate: AdmissionGate,
        retry: RetryPolicy,
        prefixes: PrefixSet,
    ) -> Self {
        Self {
            messages,
            conversation,
            statuses,
            preferences,
            text_gen,
            art_gen,
            responder,
            gate,
            retry,
            prefixes,
            responses: Responses::default(),
        }
    }

    pub fn with_responses(mut self, responses: Responses) -> Self {
        self.responses = responses;
        self
    }

    /// Run one inbound message through the pipeline.
    #[tracing::instrument(
        skip_all,
        fields(chat_id = message.chat_id, message_id = message.message_id)
    )]
    pub async fn handle(&self, message: &InboundMessage) -> Outcome {
        if message.author_is_bot {
            tracing::debug!("bot-authored message, skipping");
            return Outcome::Skipped;
        }
        let outcome = match classify::classify(message, &self.prefixes) {
            Classification::Skip => {
                tracing::debug!("ignore list matched, skipping");
                Outcome::Skipped
            }
            Classification::EmptyPrompt => {
                self.log_ambient(message).await;
                if let Err(err) = self
                    .responder
                    .react(message.chat_id, message.message_id, EMPTY_PROMPT_REACTION)
                    .await
                {
                    tracing::warn!(error = %err, "failed to attach reaction");
                }
                Outcome::EmptyPrompt
            }
            Classification::Intent(intent) => {
                self.log_ambient(message).await;
                self.handle_intent(message, intent).await
            }
        };
        tracing::info!(?outcome, "pipeline run finished");
        outcome
    }

    /// Produce and deliver a digest of the chat's ambient log.
    ///
    /// Consumes the windowed log (older entries are pruned by the read).
    #[tracing::instrument(skip_all, fields(chat_id = chat_id))]
    pub async fn digest(&self, chat_id: i64, reply_to: i64) -> Outcome {
        let context = match self
            .conversation
            .digest_context(chat_id, DIGEST_CONTEXT_LENGTH)
            .await
        {
            Ok(context) => context,
            Err(err) => {
                tracing::error!(error = %err, "failed to read the ambient log");
                self.send(chat_id, reply_to, &self.responses.generation_failed)
                    .await;
                return Outcome::Failed;
            }
        };
        let Some(context) = context else {
            self.send(chat_id, reply_to, &self.responses.empty_digest)
                .await;
            return Outcome::EmptyDigest;
        };

        let turns = [DialogEntry {
            text: context,
            from_self: false,
        }];
        let outcome = self
            .retry
            .run(|| {
                let request = TextRequest {
                    turns: &turns,
                    temperature: Some(0.0),
                    instruction: Some(self.conversation.instruction()),
                    timeout: None,
                };
                async move {
                    let _ticket = self.gate.acquire().await;
                    self.text_gen.generate_text(request).await
                }
            })
            .await;
        match outcome.result {
            Ok(answer) => {
                let chunks = split::split_to_messages(&answer);
                let count = chunks.len();
                for chunk in &chunks {
                    if let Err(err) = self.responder.reply(chat_id, reply_to, chunk).await {
                        tracing::error!(error = %err, "failed to deliver digest");
                        return Outcome::Failed;
                    }
                }
                Outcome::Replied { messages: count }
            }
            Err(err) => {
                self.send(chat_id, reply_to, self.failure_text(&err)).await;
                Outcome::Failed
            }
        }
    }

    // --- stages ---

    async fn handle_intent(&self, message: &InboundMessage, intent: Intent) -> Outcome {
        if let Intent::None { prompt } = &intent {
            if message.is_direct && prompt.is_empty() {
                self.send(message.chat_id, message.message_id, &self.responses.empty_request)
                    .await;
                return Outcome::EmptyPrompt;
            }
            tracing::debug!("no generation intent, staying silent");
            return Outcome::NoIntent;
        }

        match self.authorize(message).await {
            Ok(Access::Granted) => {}
            Ok(Access::Denied(text)) => {
                self.send(message.chat_id, message.message_id, &text).await;
                return Outcome::Blocked;
            }
            Err(err) => {
                tracing::error!(error = %err, "status lookup failed");
                self.send(message.chat_id, message.message_id, &self.responses.generation_failed)
                    .await;
                return Outcome::Failed;
            }
        }

        match intent {
            Intent::TextGeneration { prompt } => self.run_text(message, prompt).await,
            Intent::ArtGeneration { prompt } => self.run_art(message, &prompt).await,
            Intent::None { .. } => Outcome::NoIntent,
        }
    }

    /// Effective permission of the requester.
    ///
    /// An authorized or admin user passes anywhere. Otherwise direct chats
    /// deny on the user's own status; group chats deny blocked users
    /// outright and let the chat's status decide for the rest.
    async fn authorize(&self, message: &InboundMessage) -> Result<Access, RepositoryError> {
        let user = self
            .statuses
            .user_status(message.author_id, message.is_direct)
            .await?;
        if user.is_admin() || user == UserStatus::Authorized {
            return Ok(Access::Granted);
        }
        if message.is_direct {
            return Ok(Access::Denied(self.responses.denial_for(user).to_string()));
        }
        if matches!(user, UserStatus::Blocked | UserStatus::ReverseBlocked) {
            return Ok(Access::Denied(self.responses.blocked.clone()));
        }
        let chat = self.statuses.chat_status(message.chat_id).await?;
        let denial = match chat {
            ChatStatus::Authorized => return Ok(Access::Granted),
            ChatStatus::Blocked => self.responses.blocked.clone(),
            ChatStatus::Pending => self.responses.pending.clone(),
            ChatStatus::Unauthorized => self.responses.unauthorized.clone(),
        };
        Ok(Access::Denied(denial))
    }

    async fn run_text(&self, message: &InboundMessage, prompt: String) -> Outcome {
        let stored = StoredMessage {
            chat_id: message.chat_id,
            id: message.message_id,
            reply_id: message.reply.as_ref().map(|r| r.message_id),
            from_self: false,
            text: prompt,
            timestamp: message.timestamp,
        };
        if let Err(err) = self.messages.save_message(&stored).await {
            tracing::error!(error = %err, "failed to persist the request message");
            self.send(message.chat_id, message.message_id, &self.responses.generation_failed)
                .await;
            return Outcome::Failed;
        }

        let dialog = match dialog::assemble(&self.messages, message.chat_id, message.message_id)
            .await
        {
            Ok(dialog) => dialog,
            Err(err) => {
                tracing::error!(error = %err, "dialog assembly failed");
                self.send(message.chat_id, message.message_id, &self.responses.generation_failed)
                    .await;
                return Outcome::Failed;
            }
        };

        if let Err(err) = self.responder.typing(message.chat_id).await {
            tracing::warn!(error = %err, "failed to show typing indicator");
        }
        let prefs = match self.preferences.preferences(message.author_id).await {
            Ok(prefs) => prefs,
            Err(err) => {
                tracing::warn!(error = %err, "preferences lookup failed, using defaults");
                UserPreferences::default()
            }
        };
        let timeout = prefs.timeout_secs.map(Duration::from_secs);

        let outcome = self
            .retry
            .run(|| {
                let request = TextRequest {
                    turns: &dialog,
                    temperature: prefs.temperature,
                    instruction: prefs.instruction_text.as_deref(),
                    timeout,
                };
                async move {
                    let _ticket = self.gate.acquire().await;
                    self.text_gen.generate_text(request).await
                }
            })
            .await;
        tracing::debug!(attempts = outcome.attempts_used, ok = outcome.succeeded(), "text generation finished");
        match outcome.result {
            Ok(answer) => self.deliver_text(message, &answer).await,
            Err(err) => {
                self.send(message.chat_id, message.message_id, self.failure_text(&err))
                    .await;
                Outcome::Failed
            }
        }
    }

    async fn run_art(&self, message: &InboundMessage, prompt: &str) -> Outcome {
        if let Err(err) = self.responder.typing(message.chat_id).await {
            tracing::warn!(error = %err, "failed to show typing indicator");
        }
        let outcome = self
            .retry
            .run(|| async move {
                let _ticket = self.gate.acquire().await;
                self.art_gen.generate_image(prompt, None, None).await
            })
            .await;
        tracing::debug!(attempts = outcome.attempts_used, ok = outcome.succeeded(), "image generation finished");
        match outcome.result {
            Ok(image) => {
                if let Err(err) = self
                    .responder
                    .reply_image(message.chat_id, message.message_id, &image)
                    .await
                {
                    tracing::error!(error = %err, "failed to deliver the image");
                    return Outcome::Failed;
                }
                Outcome::RepliedImage
            }
            Err(err) => {
                self.send(message.chat_id, message.message_id, self.failure_text(&err))
                    .await;
                Outcome::Failed
            }
        }
    }

    /// Split, deliver, and persist a generated answer.
    ///
    /// Every delivered chunk is stored as a bot-authored message replying
    /// to the trigger, so follow-up replies extend the dialog chain.
    async fn deliver_text(&self, message: &InboundMessage, answer: &str) -> Outcome {
        let chunks = split::split_to_messages(answer);
        let count = chunks.len();
        for chunk in &chunks {
            let delivered = match self
                .responder
                .reply(message.chat_id, message.message_id, chunk)
                .await
            {
                Ok(id) => id,
                Err(err) => {
                    tracing::error!(error = %err, "failed to deliver the reply");
                    return Outcome::Failed;
                }
            };
            let reply = StoredMessage {
                chat_id: message.chat_id,
                id: delivered,
                reply_id: Some(message.message_id),
                from_self: true,
                text: chunk.clone(),
                timestamp: Utc::now(),
            };
            if let Err(err) = self.messages.save_message(&reply).await {
                tracing::warn!(error = %err, "failed to persist a reply chunk");
            }
        }
        Outcome::Replied { messages: count }
    }

    // --- helpers ---

    async fn log_ambient(&self, message: &InboundMessage) {
        let Some(text) = self.conversation.ambient_text(message) else {
            return;
        };
        if let Err(err) = self.conversation.record(message, text).await {
            tracing::warn!(error = %err, "failed to append the ambient log");
        }
    }

    fn failure_text(&self, err: &GenerationError) -> &str {
        match err {
            GenerationError::Timeout => &self.responses.timeout_error,
            GenerationError::ContentPolicy => &self.responses.content_refused,
            _ => &self.responses.generation_failed,
        }
    }

    /// Send a canned text, swallowing (but logging) delivery failures.
    async fn send(&self, chat_id: i64, reply_to: i64, text: &str) {
        if let Err(err) = self.responder.reply(chat_id, reply_to, text).await {
            tracing::warn!(error = %err, "failed to deliver a service reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genrelay_types::error::PipelineError;
    use genrelay_types::event::{OutboundAction, ReplyContext};
    use genrelay_types::message::AmbientLogEntry;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemoryMessages {
        rows: Arc<Mutex<HashMap<(i64, i64), StoredMessage>>>,
    }

    impl MemoryMessages {
        fn replies_from_self(&self, chat_id: i64) -> Vec<StoredMessage> {
            let mut rows: Vec<_> = self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|m| m.chat_id == chat_id && m.from_self)
                .cloned()
                .collect();
            rows.sort_by_key(|m| m.id);
            rows
        }
    }

    impl MessageRepository for MemoryMessages {
        async fn save_message(&self, msg: &StoredMessage) -> Result<(), RepositoryError> {
            self.rows
                .lock()
                .unwrap()
                .insert((msg.chat_id, msg.id), msg.clone());
            Ok(())
        }

        async fn get_message(
            &self,
            chat_id: i64,
            id: i64,
        ) -> Result<Option<StoredMessage>, RepositoryError> {
            Ok(self.rows.lock().unwrap().get(&(chat_id, id)).cloned())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryLog {
        entries: Arc<Mutex<Vec<AmbientLogEntry>>>,
    }

    impl ConversationRepository for MemoryLog {
        async fn append(&self, entry: &AmbientLogEntry) -> Result<(), RepositoryError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn take_window(
            &self,
            chat_id: i64,
            _budget: usize,
        ) -> Result<Vec<AmbientLogEntry>, RepositoryError> {
            let mut entries = self.entries.lock().unwrap();
            let window: Vec<_> = entries
                .iter()
                .filter(|e| e.chat_id == chat_id)
                .cloned()
                .collect();
            entries.retain(|e| e.chat_id != chat_id);
            Ok(window)
        }
    }

    #[derive(Clone)]
    struct FixedStatuses {
        user: UserStatus,
        chat: ChatStatus,
    }

    impl StatusRepository for FixedStatuses {
        async fn user_status(&self, _: i64, _: bool) -> Result<UserStatus, RepositoryError> {
            Ok(self.user)
        }

        async fn chat_status(&self, _: i64) -> Result<ChatStatus, RepositoryError> {
            Ok(self.chat)
        }

        async fn set_user_status(&self, _: i64, _: UserStatus) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn set_chat_status(&self, _: i64, _: ChatStatus) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct NoPrefs;

    impl PreferencesRepository for NoPrefs {
        async fn preferences(&self, _: i64) -> Result<UserPreferences, RepositoryError> {
            Ok(UserPreferences::default())
        }

        async fn update_preferences(
            &self,
            _: i64,
            _: &UserPreferences,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn reset_preferences(&self, _: i64) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    /// Records each request's shape and pops pre-scripted results.
    #[derive(Clone, Default)]
    struct ScriptedText {
        script: Arc<Mutex<VecDeque<Result<String, GenerationError>>>>,
        seen: Arc<Mutex<Vec<(usize, Option<f64>, Option<String>)>>>,
    }

    impl ScriptedText {
        fn push(&self, result: Result<String, GenerationError>) {
            self.script.lock().unwrap().push_back(result);
        }
    }

    impl TextGenerator for ScriptedText {
        async fn generate_text(
            &self,
            request: TextRequest<'_>,
        ) -> Result<String, GenerationError> {
            self.seen.lock().unwrap().push((
                request.turns.len(),
                request.temperature,
                request.instruction.map(str::to_string),
            ));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected text generation call")
        }
    }

    #[derive(Clone, Default)]
    struct ScriptedArt {
        script: Arc<Mutex<VecDeque<Result<Vec<u8>, GenerationError>>>>,
    }

    impl ArtGenerator for ScriptedArt {
        async fn generate_image(
            &self,
            _prompt: &str,
            _aspect_ratio: Option<f64>,
            _seed: Option<i64>,
        ) -> Result<Vec<u8>, GenerationError> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected image generation call")
        }
    }

    /// Collects outbound actions, assigning delivered ids from 1000 up.
    #[derive(Clone, Default)]
    struct Recording {
        actions: Arc<Mutex<Vec<OutboundAction>>>,
        next_id: Arc<AtomicI64>,
    }

    impl Recording {
        fn actions(&self) -> Vec<OutboundAction> {
            self.actions.lock().unwrap().clone()
        }

        fn replies(&self) -> Vec<String> {
            self.actions()
                .into_iter()
                .filter_map(|a| match a {
                    OutboundAction::Reply { text, .. } => Some(text),
                    _ => None,
                })
                .collect()
        }
    }

    impl Responder for Recording {
        async fn reply(
            &self,
            chat_id: i64,
            reply_to: i64,
            text: &str,
        ) -> Result<i64, PipelineError> {
            self.actions.lock().unwrap().push(OutboundAction::Reply {
                chat_id,
                reply_to,
                text: text.to_string(),
            });
            Ok(1000 + self.next_id.fetch_add(1, Ordering::SeqCst))
        }

        async fn reply_image(
            &self,
            chat_id: i64,
            reply_to: i64,
            image: &[u8],
        ) -> Result<i64, PipelineError> {
            self.actions.lock().unwrap().push(OutboundAction::ReplyImage {
                chat_id,
                reply_to,
                image: image.to_vec(),
            });
            Ok(1000 + self.next_id.fetch_add(1, Ordering::SeqCst))
        }

        async fn react(
            &self,
            chat_id: i64,
            message_id: i64,
            emoji: &str,
        ) -> Result<(), PipelineError> {
            self.actions.lock().unwrap().push(OutboundAction::React {
                chat_id,
                message_id,
                emoji: emoji.to_string(),
            });
            Ok(())
        }

        async fn typing(&self, chat_id: i64) -> Result<(), PipelineError> {
            self.actions
                .lock()
                .unwrap()
                .push(OutboundAction::Typing { chat_id });
            Ok(())
        }
    }

    struct Fixture {
        pipeline: Pipeline<
            MemoryMessages,
            MemoryLog,
            FixedStatuses,
            NoPrefs,
            ScriptedText,
            ScriptedArt,
            Recording,
        >,
        messages: MemoryMessages,
        log: MemoryLog,
        text_gen: ScriptedText,
        art_gen: ScriptedArt,
        responder: Recording,
    }

    fn fixture(user: UserStatus, chat: ChatStatus) -> Fixture {
        let messages = MemoryMessages::default();
        let log = MemoryLog::default();
        let text_gen = ScriptedText::default();
        let art_gen = ScriptedArt::default();
        let responder = Recording::default();
        let prefixes = PrefixSet::new(
            vec!["bot,".to_string()],
            vec!["draw,".to_string()],
            vec!["#nobot".to_string()],
            vec![],
        );
        let pipeline = Pipeline::new(
            messages.clone(),
            ConversationService::new(log.clone()),
            FixedStatuses { user, chat },
            NoPrefs,
            text_gen.clone(),
            art_gen.clone(),
            responder.clone(),
            AdmissionGate::new(10.0, 4).unwrap(),
            RetryPolicy::new(3).unwrap(),
            prefixes,
        );
        Fixture {
            pipeline,
            messages,
            log,
            text_gen,
            art_gen,
            responder,
        }
    }

    fn message(chat_id: i64, id: i64, text: &str, is_direct: bool) -> InboundMessage {
        InboundMessage {
            chat_id,
            message_id: id,
            author_id: 42,
            author_name: "alice".to_string(),
            author_is_bot: false,
            reply: None,
            text: Some(text.to_string()),
            caption: None,
            is_direct,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn ignored_message_has_no_side_effects() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        let outcome = f.pipeline.handle(&message(1, 1, "#nobot hi all", false)).await;
        assert_eq!(outcome, Outcome::Skipped);
        assert!(f.responder.actions().is_empty());
        assert!(f.log.entries.lock().unwrap().is_empty());
        assert!(f.messages.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bot_authored_message_is_skipped() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        let mut msg = message(1, 1, "bot, hello", false);
        msg.author_is_bot = true;
        let outcome = f.pipeline.handle(&msg).await;
        assert_eq!(outcome, Outcome::Skipped);
        assert!(f.responder.actions().is_empty());
        assert!(f.log.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_prompt_gets_a_reaction_only() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        let outcome = f.pipeline.handle(&message(1, 7, "bot, ", false)).await;
        assert_eq!(outcome, Outcome::EmptyPrompt);
        assert_eq!(
            f.responder.actions(),
            vec![OutboundAction::React {
                chat_id: 1,
                message_id: 7,
                emoji: EMPTY_PROMPT_REACTION.to_string(),
            }]
        );
        // The raw text still lands in the ambient log.
        assert_eq!(f.log.entries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn plain_group_chatter_is_logged_but_silent() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        let outcome = f.pipeline.handle(&message(1, 2, "nice weather", false)).await;
        assert_eq!(outcome, Outcome::NoIntent);
        assert!(f.responder.actions().is_empty());
        assert_eq!(f.log.entries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_direct_message_gets_explicit_feedback() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        let outcome = f.pipeline.handle(&message(5, 3, "", true)).await;
        assert_eq!(outcome, Outcome::EmptyPrompt);
        assert_eq!(f.responder.replies(), vec![Responses::default().empty_request]);
    }

    #[tokio::test]
    async fn pending_direct_user_is_denied() {
        let f = fixture(UserStatus::Pending, ChatStatus::Authorized);
        let outcome = f.pipeline.handle(&message(5, 4, "hello", true)).await;
        assert_eq!(outcome, Outcome::Blocked);
        assert_eq!(f.responder.replies(), vec![Responses::default().pending]);
        // No generation call was attempted (the script is empty and would
        // have panicked).
    }

    #[tokio::test]
    async fn blocked_user_is_denied_even_in_authorized_chat() {
        let f = fixture(UserStatus::Blocked, ChatStatus::Authorized);
        let outcome = f.pipeline.handle(&message(1, 4, "bot, hi", false)).await;
        assert_eq!(outcome, Outcome::Blocked);
        assert_eq!(f.responder.replies(), vec![Responses::default().blocked]);
    }

    #[tokio::test]
    async fn pending_user_rides_on_authorized_chat() {
        let f = fixture(UserStatus::Pending, ChatStatus::Authorized);
        f.text_gen.push(Ok("the answer".to_string()));
        let outcome = f.pipeline.handle(&message(1, 10, "bot, question", false)).await;
        assert_eq!(outcome, Outcome::Replied { messages: 1 });
        assert_eq!(f.responder.replies(), vec!["the answer".to_string()]);
    }

    #[tokio::test]
    async fn pending_user_in_pending_chat_is_denied() {
        let f = fixture(UserStatus::Pending, ChatStatus::Pending);
        let outcome = f.pipeline.handle(&message(1, 10, "bot, question", false)).await;
        assert_eq!(outcome, Outcome::Blocked);
        assert_eq!(f.responder.replies(), vec![Responses::default().pending]);
    }

    #[tokio::test]
    async fn text_flow_persists_request_and_reply() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        f.text_gen.push(Ok("sure thing".to_string()));
        let outcome = f.pipeline.handle(&message(9, 20, "bot, help me", false)).await;
        assert_eq!(outcome, Outcome::Replied { messages: 1 });

        let rows = f.messages.rows.lock().unwrap();
        let request = rows.get(&(9, 20)).expect("request row");
        assert_eq!(request.text, "help me"); // stored with the prefix stripped
        assert!(!request.from_self);

        drop(rows);
        let replies = f.messages.replies_from_self(9);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text, "sure thing");
        assert_eq!(replies[0].reply_id, Some(20));
    }

    #[tokio::test]
    async fn reply_continuation_feeds_prior_turns_to_the_backend() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        f.text_gen.push(Ok("first answer".to_string()));
        f.pipeline.handle(&message(3, 1, "bot, start", false)).await;

        // Continue by replying to the bot's stored answer (id 1000).
        f.text_gen.push(Ok("second answer".to_string()));
        let mut followup = message(3, 2, "and then?", false);
        followup.reply = Some(ReplyContext {
            message_id: 1000,
            author_is_self: true,
            is_image: false,
            author_name: None,
        });
        let outcome = f.pipeline.handle(&followup).await;
        assert_eq!(outcome, Outcome::Replied { messages: 1 });

        let seen = f.text_gen.seen.lock().unwrap();
        assert_eq!(seen[0].0, 1, "first request is a single turn");
        assert_eq!(seen[1].0, 3, "follow-up carries start, answer, follow-up");
    }

    #[tokio::test]
    async fn long_answer_is_split_and_each_chunk_persisted() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        f.text_gen.push(Ok("word ".repeat(1800).trim_end().to_string()));
        let outcome = f.pipeline.handle(&message(2, 30, "bot, essay", false)).await;

        let Outcome::Replied { messages } = outcome else {
            panic!("expected a reply, got {outcome:?}");
        };
        assert!(messages > 1);
        assert_eq!(f.responder.replies().len(), messages);
        let replies = f.messages.replies_from_self(2);
        assert_eq!(replies.len(), messages);
        assert!(replies.iter().all(|r| r.reply_id == Some(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_timeouts_report_the_timeout_text() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        for _ in 0..3 {
            f.text_gen.push(Err(GenerationError::Timeout));
        }
        let outcome = f.pipeline.handle(&message(1, 40, "bot, slow one", false)).await;
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(f.responder.replies(), vec![Responses::default().timeout_error]);
    }

    #[tokio::test]
    async fn content_refusal_is_reported_without_retry() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        f.text_gen.push(Err(GenerationError::ContentPolicy));
        let outcome = f.pipeline.handle(&message(1, 41, "bot, nope", false)).await;
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(f.responder.replies(), vec![Responses::default().content_refused]);
        assert!(f.text_gen.script.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn art_flow_replies_with_the_image() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        f.art_gen
            .script
            .lock()
            .unwrap()
            .push_back(Ok(vec![0xde, 0xad]));
        let outcome = f.pipeline.handle(&message(4, 50, "draw, a cat", false)).await;
        assert_eq!(outcome, Outcome::RepliedImage);
        assert!(f.responder.actions().iter().any(|a| matches!(
            a,
            OutboundAction::ReplyImage { chat_id: 4, reply_to: 50, image } if image == &[0xde, 0xad]
        )));
    }

    #[tokio::test]
    async fn art_failure_uses_the_generic_text() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        f.art_gen.script.lock().unwrap().push_back(Err(
            GenerationError::InvalidResponse("garbled".to_string()),
        ));
        let outcome = f.pipeline.handle(&message(4, 51, "draw, a cat", false)).await;
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(
            f.responder.replies(),
            vec![Responses::default().generation_failed]
        );
    }

    #[tokio::test]
    async fn digest_summarizes_with_zero_temperature() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        f.pipeline.handle(&message(6, 60, "morning all", false)).await;
        f.pipeline.handle(&message(6, 61, "any news?", false)).await;

        f.text_gen.push(Ok("they said hello".to_string()));
        let outcome = f.pipeline.digest(6, 62).await;
        assert_eq!(outcome, Outcome::Replied { messages: 1 });
        assert_eq!(f.responder.replies(), vec!["they said hello".to_string()]);

        let seen = f.text_gen.seen.lock().unwrap();
        let (turns, temperature, instruction) = seen.last().unwrap().clone();
        assert_eq!(turns, 1);
        assert_eq!(temperature, Some(0.0));
        assert_eq!(
            instruction.as_deref(),
            Some(crate::conversation::DEFAULT_DIGEST_INSTRUCTION)
        );
    }

    #[tokio::test]
    async fn digest_of_an_empty_log_says_so() {
        let f = fixture(UserStatus::Authorized, ChatStatus::Authorized);
        let outcome = f.pipeline.digest(6, 62).await;
        assert_eq!(outcome, Outcome::EmptyDigest);
        assert_eq!(f.responder.replies(), vec![Responses::default().empty_digest]);
    }
}
