//! Session events broadcast to connected UI surfaces.

use serde::{Deserialize, Serialize};

use super::message::ChatMessage;

/// Events fanned out over the session's broadcast channel. The WebSocket
/// layer forwards these to clients verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A message (user or bot) was appended to the history.
    MessageAdded { message: ChatMessage },
    /// Tour progress changed.
    TourState { active: bool, step: usize },
    /// The history was cleared (and re-seeded with a welcome message).
    Cleared,
    /// The widget was opened or closed.
    Visibility { open: bool },
}
