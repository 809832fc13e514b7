//! Builds the provider-shaped message sequence for one request.
//!
//! Stored history is never touched here: assembly borrows the history slice and produces
//! new [`WireMessage`] values.
//!
//! ```rust
//! use llmbridge::context::{assemble, MessageShape};
//! use llmbridge::Turn;
//!
//! let history = vec![Turn::user("Hi"), Turn::assistant("Hello!")];
//! let ctx = assemble(&history, "What's 2+2?", "Be terse.", MessageShape::SideChannel);
//!
//! assert_eq!(ctx.system.as_deref(), Some("Be terse."));
//! assert_eq!(ctx.messages.len(), 3);
//! assert!(ctx.messages.iter().all(|m| m.role != "system"));
//! ```

use serde::Serialize;

use crate::llmbridge::client_wrapper::{Role, Turn};

/// Role label some providers use for their own generated turns.
pub const MODEL_ROLE_LABEL: &str = "model";

/// How a provider expects the conversation to be laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageShape {
    /// Preamble as a leading `system` entry, then history, then the question.
    RoleAnnotated,
    /// History and question only; the preamble travels in a separate parameter.
    SideChannel,
    /// Like [`MessageShape::RoleAnnotated`] but `assistant` is relabeled `model`.
    RoleRelabeled,
}

/// One entry of an assembled sequence, with the role label the provider expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    fn new(role: &str, content: &str) -> Self {
        WireMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

/// A provider-ready conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    pub messages: Vec<WireMessage>,
    /// Preamble for providers that take system instructions out of band.
    pub system: Option<String>,
}

/// Merge `history` and `question` with `preamble` according to `shape`.
pub fn assemble(
    history: &[Turn],
    question: &str,
    preamble: &str,
    shape: MessageShape,
) -> AssembledContext {
    let mut messages = Vec::with_capacity(history.len() + 2);

    let system = match shape {
        MessageShape::SideChannel => Some(preamble.to_string()),
        MessageShape::RoleAnnotated | MessageShape::RoleRelabeled => {
            messages.push(WireMessage::new(Role::System.as_str(), preamble));
            None
        }
    };

    for turn in history {
        messages.push(WireMessage::new(role_label(turn.role, shape), &turn.content));
    }
    messages.push(WireMessage::new(role_label(Role::User, shape), question));

    AssembledContext { messages, system }
}

/// The label `role` is sent under for `shape`.
pub fn role_label(role: Role, shape: MessageShape) -> &'static str {
    match (role, shape) {
        (Role::Assistant, MessageShape::RoleRelabeled) => MODEL_ROLE_LABEL,
        (role, _) => role.as_str(),
    }
}
