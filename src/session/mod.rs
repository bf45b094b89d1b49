//! Conversation session — message history, chatbot mode, and dispatch.

pub mod event;
pub mod message;
pub mod state;

pub use event::SessionEvent;
pub use message::{ChatMessage, Sender};
pub use state::{ChatSession, QuickAction, SessionSnapshot};
