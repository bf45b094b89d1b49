//! Static chatbot content — the intent catalog and the guided-tour script.

pub mod intent;
pub mod tour;

pub use intent::{Intent, IntentCatalog};
pub use tour::{TourScript, TourStep};
