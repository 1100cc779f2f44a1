//! Per-conversation flow state.
//!
//! Every multi-step interaction (rename, new description, date change,
//! manual username entry, attachment capture) is a prompt followed by a
//! single reply. The state remembers which task the reply belongs to and
//! which bot message asked the question, so the prompt can be edited in
//! place once the answer arrives.

use dashmap::DashMap;
use teloxide::types::{ChatId, MessageId, UserId};

/// Flows are tracked per user within a chat, so two admins can edit
/// different tasks in the same group at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub chat: ChatId,
    pub user: UserId,
}

impl FlowKey {
    pub fn new(chat: ChatId, user: UserId) -> Self {
        Self { chat, user }
    }
}

/// Every prompt state also keeps the id of the last "invalid input" reply,
/// so it can be removed when the next answer arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    AwaitingTitle {
        prompt: MessageId,
        group_id: Option<i64>,
        topic_id: Option<i64>,
        error: Option<MessageId>,
    },
    AwaitingName {
        task_id: i64,
        prompt: MessageId,
        error: Option<MessageId>,
    },
    AwaitingDescription {
        task_id: i64,
        prompt: MessageId,
        error: Option<MessageId>,
    },
    AwaitingStartDate {
        task_id: i64,
        prompt: MessageId,
        error: Option<MessageId>,
    },
    AwaitingEndDate {
        task_id: i64,
        prompt: MessageId,
        error: Option<MessageId>,
    },
    AwaitingUsername {
        task_id: i64,
        prompt: MessageId,
        error: Option<MessageId>,
    },
    CollectingAttachments {
        task_id: i64,
    },
}

impl FlowState {
    pub fn task_id(&self) -> Option<i64> {
        match *self {
            FlowState::AwaitingName { task_id, .. }
            | FlowState::AwaitingDescription { task_id, .. }
            | FlowState::AwaitingStartDate { task_id, .. }
            | FlowState::AwaitingEndDate { task_id, .. }
            | FlowState::AwaitingUsername { task_id, .. }
            | FlowState::CollectingAttachments { task_id } => Some(task_id),
            FlowState::Idle | FlowState::AwaitingTitle { .. } => None,
        }
    }

    /// The bot message that asked for the reply.
    pub fn prompt(&self) -> Option<MessageId> {
        match *self {
            FlowState::AwaitingTitle { prompt, .. }
            | FlowState::AwaitingName { prompt, .. }
            | FlowState::AwaitingDescription { prompt, .. }
            | FlowState::AwaitingStartDate { prompt, .. }
            | FlowState::AwaitingEndDate { prompt, .. }
            | FlowState::AwaitingUsername { prompt, .. } => Some(prompt),
            FlowState::Idle | FlowState::CollectingAttachments { .. } => None,
        }
    }

    /// True while a single text reply is expected.
    pub fn expects_text(&self) -> bool {
        self.prompt().is_some()
    }

    /// Records the id of the latest validation error message.
    pub fn with_error(mut self, message: MessageId) -> Self {
        match &mut self {
            FlowState::AwaitingTitle { error, .. }
            | FlowState::AwaitingName { error, .. }
            | FlowState::AwaitingDescription { error, .. }
            | FlowState::AwaitingStartDate { error, .. }
            | FlowState::AwaitingEndDate { error, .. }
            | FlowState::AwaitingUsername { error, .. } => *error = Some(message),
            FlowState::Idle | FlowState::CollectingAttachments { .. } => {}
        }
        self
    }

    /// Id of the previous validation error message, if one is still shown.
    pub fn error_message(&self) -> Option<MessageId> {
        match *self {
            FlowState::AwaitingTitle { error, .. }
            | FlowState::AwaitingName { error, .. }
            | FlowState::AwaitingDescription { error, .. }
            | FlowState::AwaitingStartDate { error, .. }
            | FlowState::AwaitingEndDate { error, .. }
            | FlowState::AwaitingUsername { error, .. } => error,
            FlowState::Idle | FlowState::CollectingAttachments { .. } => None,
        }
    }
}

/// Concurrent store of active flows.
#[derive(Debug, Default)]
pub struct FlowStore {
    flows: DashMap<FlowKey, FlowState>,
}

impl FlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state; `Idle` when nothing is in progress.
    pub fn get(&self, key: FlowKey) -> FlowState {
        self.flows.get(&key).map(|entry| *entry).unwrap_or_default()
    }

    pub fn set(&self, key: FlowKey, state: FlowState) {
        if state == FlowState::Idle {
            self.flows.remove(&key);
        } else {
            self.flows.insert(key, state);
        }
    }

    /// Ends the flow and returns what was in progress.
    pub fn clear(&self, key: FlowKey) -> FlowState {
        self.flows.remove(&key).map(|(_, state)| state).unwrap_or_default()
    }

    /// Task currently collecting attachments for this user, if any.
    pub fn collecting_for(&self, key: FlowKey) -> Option<i64> {
        match self.get(key) {
            FlowState::CollectingAttachments { task_id } => Some(task_id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
