//! Session orchestration: intents in, events out.
//!
//! The controller is a plain `&mut self` state machine owned by the host's
//! event loop. Network calls leave it as [`Exchange`] values that the host
//! runs to completion and hands back through [`SessionController::complete`].

use std::sync::Arc;
use std::time::Duration;

use proto::{
    Generation, Message, ModelProfile, RequestOutcome, Role, ScrollDecision, SessionError,
    SessionEvent, UserIntent, default_catalog, find_profile,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::feed::{DEFAULT_TOLERANCE, FeedFollower};
use crate::llm::{ChatMessage, ChatRequest, CompletionProvider};
use crate::quota::QuotaLedger;
use crate::reveal::{DEFAULT_REVEAL_INTERVAL, RevealScheduler, RevealTick};
use crate::store::PreferenceStore;
use crate::timeline::Timeline;

/// Preference key holding the active model id.
pub const ACTIVE_MODEL_KEY: &str = "activeModelId";
/// Preference key holding the active model's daily limit.
pub const DAILY_LIMIT_KEY: &str = "dailyLimitForActiveModel";

/// Default number of prior messages sent with each request.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Default system instruction sent ahead of every conversation.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are Incognito, a private and helpful assistant. \
Answer clearly and concisely, use Markdown when it improves readability, and keep the earlier \
messages of this conversation in mind when replying.";

/// Explicit session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfiguration {
    pub system_instruction: String,
    pub active_model: ModelProfile,
    pub catalog: Vec<ModelProfile>,
    pub reveal_interval: Duration,
    pub scroll_tolerance: f64,
    /// Prior messages included in each request; `0` sends only the latest.
    pub history_limit: usize,
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        let catalog = default_catalog();
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            active_model: catalog[0].clone(),
            catalog,
            reveal_interval: DEFAULT_REVEAL_INTERVAL,
            scroll_tolerance: DEFAULT_TOLERANCE,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl SessionConfiguration {
    /// Applies the model persisted by an earlier session, if any.
    ///
    /// A persisted id found in the catalog restores that profile. An id
    /// missing from the catalog is only restored when a positive daily limit
    /// was persisted alongside it.
    pub fn restore(mut self, store: &dyn PreferenceStore) -> Self {
        let Some(model_id) = store.get(ACTIVE_MODEL_KEY) else {
            return self;
        };
        if let Some(profile) = find_profile(&self.catalog, &model_id) {
            self.active_model = profile.clone();
        } else if let Some(limit) = store.get_u32(DAILY_LIMIT_KEY).filter(|limit| *limit > 0) {
            self.active_model = ModelProfile::new(model_id.clone(), model_id, limit);
        } else {
            warn!(model = %model_id, "Ignoring persisted model without a usable daily limit");
        }
        self
    }
}

/// One request ready to be sent, tagged with the generation it belongs to.
pub struct Exchange {
    pub generation: Generation,
    pub model_id: String,
    pub request: ChatRequest,
    pub utterance: String,
    provider: Arc<dyn CompletionProvider>,
}

impl Exchange {
    /// Sends the request and waits for its classified outcome.
    pub async fn run(self) -> Completion {
        let outcome = self.provider.send(self.request).await;
        Completion {
            generation: self.generation,
            model_id: self.model_id,
            utterance: self.utterance,
            outcome,
        }
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("generation", &self.generation)
            .field("model_id", &self.model_id)
            .field("messages", &self.request.messages.len())
            .finish()
    }
}

/// Finished exchange handed back to the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub generation: Generation,
    pub model_id: String,
    pub utterance: String,
    pub outcome: RequestOutcome,
}

/// Observer handle returned by [`SessionController::subscribe`].
pub type ObserverId = u64;

/// Composition root for one chat session.
pub struct SessionController {
    config: SessionConfiguration,
    store: Arc<dyn PreferenceStore>,
    ledger: QuotaLedger,
    provider: Arc<dyn CompletionProvider>,
    timeline: Timeline,
    reveal: RevealScheduler,
    feed: FeedFollower,
    generation: Generation,
    in_flight: bool,
    online: bool,
    transcript: Vec<ChatMessage>,
    observers: Vec<(ObserverId, mpsc::UnboundedSender<SessionEvent>)>,
    next_observer: ObserverId,
}

impl SessionController {
    pub fn new(
        config: SessionConfiguration,
        store: Arc<dyn PreferenceStore>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        let ledger = QuotaLedger::new(store.clone());
        Self::with_ledger(config, store, ledger, provider)
    }

    /// Creates a controller with an explicit ledger (e.g. one on a manual clock).
    pub fn with_ledger(
        config: SessionConfiguration,
        store: Arc<dyn PreferenceStore>,
        ledger: QuotaLedger,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        let reveal = RevealScheduler::new(config.reveal_interval);
        let feed = FeedFollower::new(config.scroll_tolerance);
        info!(
            model = %config.active_model.id,
            history_limit = config.history_limit,
            "Session started"
        );
        Self {
            config,
            store,
            ledger,
            provider,
            timeline: Timeline::new(),
            reveal,
            feed,
            generation: Generation::default(),
            in_flight: false,
            online: true,
            transcript: Vec::new(),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    // ── Observers ──────────────────────────────────────────────────────────

    /// Registers an observer for session events.
    pub fn subscribe(&mut self) -> (ObserverId, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_observer;
        self.next_observer += 1;
        self.observers.push((id, tx));
        (id, rx)
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _)| *observer != id);
        self.observers.len() != before
    }

    fn emit(&mut self, event: SessionEvent) {
        self.observers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    fn notice(&mut self, error: SessionError) {
        debug!(error = %error, "Session notice");
        self.emit(SessionEvent::Notice(error));
    }

    // ── Intents ────────────────────────────────────────────────────────────

    /// Dispatches a user intent. A returned [`Exchange`] must be run by the
    /// host and its [`Completion`] passed to [`Self::complete`].
    pub fn handle(&mut self, intent: UserIntent) -> Option<Exchange> {
        match intent {
            UserIntent::SubmitText(text) => self.submit_text(&text).ok().flatten(),
            UserIntent::NewChat => {
                self.new_chat();
                None
            }
            UserIntent::SwitchModel(profile) => {
                self.switch_model(profile);
                None
            }
            UserIntent::ScrollToBottom => {
                self.scroll_to_bottom();
                None
            }
            UserIntent::ConnectivityChanged(online) => {
                self.connectivity_changed(online);
                None
            }
        }
    }

    /// Submits user text.
    ///
    /// Blank text and submissions while a request is outstanding are ignored.
    /// Quota is checked before anything is appended; connectivity is checked
    /// after the user message is appended.
    pub fn submit_text(&mut self, text: &str) -> Result<Option<Exchange>, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if self.in_flight {
            warn!("Submission refused while a request is outstanding");
            return Ok(None);
        }

        let model = self.config.active_model.clone();
        if !self.ledger.can_send(&model) {
            let err = SessionError::QuotaExceeded {
                model_id: model.id.clone(),
                limit: model.daily_limit,
            };
            self.notice(err.clone());
            return Err(err);
        }

        self.append(Message::user(text));

        if !self.online {
            let err = SessionError::NetworkUnavailable;
            self.notice(err.clone());
            return Err(err);
        }

        let history = self.history();
        let request = ChatRequest::build(
            model.id.clone(),
            &self.config.system_instruction,
            history,
            text,
        );
        self.in_flight = true;
        self.emit(SessionEvent::SendAvailabilityChanged(false));
        info!(
            model = %model.id,
            generation = %self.generation,
            history = history_len(&request),
            "Exchange started"
        );

        Ok(Some(Exchange {
            generation: self.generation,
            model_id: model.id,
            request,
            utterance: text.to_string(),
            provider: self.provider.clone(),
        }))
    }

    /// Applies a finished exchange.
    ///
    /// Successful replies count against the quota of the model they were sent
    /// with, even when the session has moved on; stale replies never touch
    /// the timeline.
    pub fn complete(&mut self, completion: Completion) {
        let Completion {
            generation,
            model_id,
            utterance,
            outcome,
        } = completion;
        let stale = generation != self.generation;
        let outcome = match outcome {
            RequestOutcome::Success { content } if content.trim().is_empty() => {
                debug!(generation = %generation, "Blank reply treated as empty");
                RequestOutcome::EmptyReply
            }
            outcome => outcome,
        };

        self.in_flight = false;
        self.emit(SessionEvent::SendAvailabilityChanged(true));
        info!(
            model = %model_id,
            generation = %generation,
            outcome = outcome.kind(),
            stale,
            "Exchange finished"
        );
        self.emit(SessionEvent::RequestOutcome {
            generation,
            outcome: outcome.clone(),
            stale,
        });

        match outcome {
            RequestOutcome::Success { content } => {
                self.ledger.register_request(&model_id);
                if model_id == self.config.active_model.id {
                    self.emit_quota();
                }
                if stale {
                    debug!(generation = %generation, "Discarding stale reply");
                    return;
                }
                self.remember(utterance, &content);
                let target = self.append(Message::assistant_placeholder());
                self.reveal.start(&content, target);
            }
            failure => {
                if stale {
                    debug!(generation = %generation, "Discarding stale failure");
                    return;
                }
                if let Some(err) = failure.error() {
                    self.notice(err);
                }
            }
        }
    }

    /// Advances the active reveal by one word.
    pub fn tick_reveal(&mut self) -> Option<RevealTick> {
        let tick = self.reveal.tick()?;
        let decision = self.feed.begin_mutation();
        self.emit(SessionEvent::ScrollFollowDecision(decision));
        if let Err(e) = self.timeline.update_content(tick.target, tick.content.clone()) {
            warn!(error = %e, "Reveal target vanished; stopping reveal");
            self.reveal.stop();
            return None;
        }
        self.emit(SessionEvent::MessageContentUpdated {
            index: tick.target,
            content: tick.content.clone(),
        });
        Some(tick)
    }

    /// Clears the conversation and moves to a new generation.
    pub fn new_chat(&mut self) {
        self.reveal.stop();
        self.generation = self.generation.next();
        self.transcript.clear();
        let decision = self.feed.begin_mutation();
        self.emit(SessionEvent::ScrollFollowDecision(decision));
        self.timeline.clear();
        info!(generation = %self.generation, "New chat");
        self.emit(SessionEvent::TimelineCleared);
    }

    /// Makes `profile` the active model and persists the choice.
    ///
    /// The timeline is kept; the request history starts over.
    pub fn switch_model(&mut self, profile: ModelProfile) {
        self.reveal.stop();
        self.generation = self.generation.next();
        self.transcript.clear();
        self.store.set(ACTIVE_MODEL_KEY, profile.id.clone());
        self.store.set_u32(DAILY_LIMIT_KEY, profile.daily_limit);
        info!(
            model = %profile.id,
            generation = %self.generation,
            "Model switched"
        );
        self.config.active_model = profile.clone();
        self.emit(SessionEvent::ModelSwitched(profile));
        self.emit_quota();
    }

    /// Jumps the feed to the bottom.
    pub fn scroll_to_bottom(&mut self) {
        self.feed.scroll_to_bottom();
    }

    /// Records the latest reachability signal.
    pub fn connectivity_changed(&mut self, online: bool) {
        if self.online != online {
            info!(online, "Connectivity changed");
        }
        self.online = online;
    }

    // ── Layout hooks ───────────────────────────────────────────────────────

    /// Reports the settled content height after a mutation.
    pub fn layout_settled(&mut self, content_height: f64) -> ScrollDecision {
        self.feed.layout_settled(content_height)
    }

    /// Reports a new visible height of the feed.
    pub fn viewport_resized(&mut self, visible_height: f64) -> ScrollDecision {
        let decision = self.feed.resize_viewport(visible_height);
        self.emit(SessionEvent::ScrollFollowDecision(decision));
        decision
    }

    /// Reports the settled content and visible heights in one pass.
    pub fn surface_layout(&mut self, content_height: f64, visible_height: f64) -> ScrollDecision {
        self.feed.relayout(content_height, visible_height)
    }

    /// Reports a user scroll to an absolute offset.
    pub fn scrolled(&mut self, offset: f64) {
        self.feed.on_scroll(offset);
    }

    /// Reports a relative user scroll.
    pub fn scroll_by(&mut self, delta: f64) {
        self.feed.scroll_by(delta);
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn feed(&self) -> &FeedFollower {
        &self.feed
    }

    pub fn config(&self) -> &SessionConfiguration {
        &self.config
    }

    pub fn active_model(&self) -> &ModelProfile {
        &self.config.active_model
    }

    pub fn catalog(&self) -> &[ModelProfile] {
        &self.config.catalog
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Requests left today for the active model.
    pub fn remaining(&self) -> u32 {
        self.ledger.remaining(&self.config.active_model)
    }

    pub fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }

    /// Whether the send affordance should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.in_flight
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn is_revealing(&self) -> bool {
        self.reveal.is_active()
    }

    pub fn reveal_interval(&self) -> Duration {
        self.reveal.interval()
    }

    // ── Internals ──────────────────────────────────────────────────────────

    fn append(&mut self, message: Message) -> usize {
        let decision = self.feed.begin_mutation();
        self.emit(SessionEvent::ScrollFollowDecision(decision));
        let role = message.role;
        let index = self.timeline.append(message);
        self.emit(SessionEvent::MessageAppended { index, role });
        index
    }

    fn emit_quota(&mut self) {
        let model = self.config.active_model.clone();
        let remaining = self.ledger.remaining(&model);
        self.emit(SessionEvent::QuotaChanged {
            model_id: model.id,
            remaining,
            limit: model.daily_limit,
        });
    }

    fn history(&self) -> &[ChatMessage] {
        let limit = self.config.history_limit;
        let start = self.transcript.len().saturating_sub(limit);
        &self.transcript[start..]
    }

    fn remember(&mut self, utterance: String, reply: &str) {
        if self.config.history_limit == 0 {
            return;
        }
        self.transcript.push(ChatMessage::user(utterance));
        self.transcript.push(ChatMessage::assistant(reply));
        let excess = self
            .transcript
            .len()
            .saturating_sub(self.config.history_limit);
        self.transcript.drain(..excess);
    }
}

fn history_len(request: &ChatRequest) -> usize {
    request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .count()
        .saturating_sub(1)
}
