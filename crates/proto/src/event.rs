use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::message::Role;
use crate::model::ModelProfile;

/// Session generation tag.
///
/// Bumped on every new chat and model switch; completions carrying an older
/// generation are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    /// Returns the following generation.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classified result of one request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestOutcome {
    /// Reply decoded with content.
    Success { content: String },
    /// Transport/connection failure.
    NetworkError { description: String },
    /// Response received but did not decode into the expected schema.
    ServerDecodeError {
        status: u16,
        raw_body: String,
        description: String,
    },
    /// Response decoded but carried no reply.
    EmptyReply,
}

impl RequestOutcome {
    /// Returns the user-facing error for non-success outcomes.
    pub fn error(&self) -> Option<SessionError> {
        match self {
            RequestOutcome::Success { .. } => None,
            RequestOutcome::NetworkError { description } => {
                Some(SessionError::Transport(description.clone()))
            }
            RequestOutcome::ServerDecodeError {
                status,
                raw_body,
                description,
            } => Some(SessionError::ServerDecode {
                status: *status,
                raw_body: raw_body.clone(),
                cause: description.clone(),
            }),
            RequestOutcome::EmptyReply => Some(SessionError::EmptyReply),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestOutcome::Success { .. } => "success",
            RequestOutcome::NetworkError { .. } => "network_error",
            RequestOutcome::ServerDecodeError { .. } => "server_decode_error",
            RequestOutcome::EmptyReply => "empty_reply",
        }
    }
}

/// Intents the surrounding UI layer hands to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum UserIntent {
    /// User pressed send with the given text.
    SubmitText(String),
    /// User started a new chat.
    NewChat,
    /// User picked another model.
    SwitchModel(ModelProfile),
    /// User tapped the "new content below" affordance.
    ScrollToBottom,
    /// Reachability signal changed.
    ConnectivityChanged(bool),
}

/// Whether the rendering surface should track the bottom after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDecision {
    /// Reader was at the bottom: scroll to the new bottom once layout settles.
    FollowToBottom,
    /// Reader had scrolled away: leave the offset untouched.
    Hold,
}

/// Events emitted by the session for rendering surfaces.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A message was appended at `index`.
    MessageAppended { index: usize, role: Role },
    /// Content of the message at `index` was replaced.
    MessageContentUpdated { index: usize, content: String },
    /// The timeline was emptied by a new chat.
    TimelineCleared,
    /// Visible quota for the active model changed.
    QuotaChanged {
        model_id: String,
        remaining: u32,
        limit: u32,
    },
    /// An exchange finished (possibly for a stale generation).
    RequestOutcome {
        generation: Generation,
        outcome: RequestOutcome,
        stale: bool,
    },
    /// Feed-follow decision sampled before a timeline mutation.
    ScrollFollowDecision(ScrollDecision),
    /// The send affordance became enabled or disabled.
    SendAvailabilityChanged(bool),
    /// Active model changed.
    ModelSwitched(ModelProfile),
    /// Dismissible user-facing notice.
    Notice(SessionError),
}
