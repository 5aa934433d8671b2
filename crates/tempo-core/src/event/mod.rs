//! Typed calendar events.
//!
//! Events are plain data: a closed enum instead of a dynamic event trait,
//! so a plugin can only be offered the payloads the host actually emits.
//! Routing lives in [`crate::plugin_system::manager`].

pub mod types;

/// Re-export important types
pub use types::{CalendarItem, ItemEvent, ItemEventKind};
