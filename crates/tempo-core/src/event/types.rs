use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A calendar entry as exchanged between the host and plugins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_day: bool,
    /// Plugin id of the source the item was imported from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CalendarItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            start,
            end: None,
            all_day: false,
            source: None,
        }
    }
}

/// A change to a calendar item, routed to interested plugins.
///
/// Serialized with an internal `type` tag, so a created event reads as
/// `{"type":"created","item":{...}}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemEvent {
    Created { item: CalendarItem },
    Updated { item: CalendarItem },
    Deleted { id: String },
}

impl ItemEvent {
    pub fn kind(&self) -> ItemEventKind {
        match self {
            ItemEvent::Created { .. } => ItemEventKind::Created,
            ItemEvent::Updated { .. } => ItemEventKind::Updated,
            ItemEvent::Deleted { .. } => ItemEventKind::Deleted,
        }
    }

    /// Id of the item the event concerns.
    pub fn item_id(&self) -> &str {
        match self {
            ItemEvent::Created { item } | ItemEvent::Updated { item } => &item.id,
            ItemEvent::Deleted { id } => id,
        }
    }
}

/// Discriminant of an [`ItemEvent`], for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemEventKind {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for ItemEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemEventKind::Created => "created",
            ItemEventKind::Updated => "updated",
            ItemEventKind::Deleted => "deleted",
        };
        write!(f, "{}", label)
    }
}
