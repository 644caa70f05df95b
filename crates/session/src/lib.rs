//! Conversational session core: quota, request pipeline, timeline, reveal,
//! and feed-follow, composed by [`SessionController`].

pub mod controller;
pub mod feed;
pub mod llm;
pub mod quota;
pub mod reveal;
pub mod store;
pub mod timeline;

/// Session composition root and its configuration.
pub use controller::{
    Completion, Exchange, ObserverId, SessionConfiguration, SessionController,
};
/// Scroll geometry and the feed-follow rule.
pub use feed::{FeedFollower, ScrollState};
/// Chat request models and provider interfaces.
pub use llm::{ChatMessage, ChatRequest, CompletionProvider, GithubModelsProvider};
/// Per-model daily quota.
pub use quota::{Clock, QuotaLedger, SystemClock};
/// Word-by-word reveal.
pub use reveal::{RevealScheduler, RevealState, RevealTick};
/// Preference persistence port and adapters.
pub use store::{MemoryStore, PreferenceStore, SqliteStore};
/// Append-only message log.
pub use timeline::Timeline;
