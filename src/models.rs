use serde::{Serialize, Deserialize};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Tweet,
    Reply,
    Follow,
    DirectMessage,
}

impl ActionKind {
    /// Targeted kinds must never hit the same target twice.
    pub fn deduped(self) -> bool {
        !matches!(self, ActionKind::Tweet)
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Tweet => "tweet",
            ActionKind::Reply => "reply",
            ActionKind::Follow => "follow",
            ActionKind::DirectMessage => "dm",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ActionRecord {
    pub kind: ActionKind,
    pub target_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub content_key: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QuotaCounter {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

impl QuotaCounter {
    pub fn start(now: DateTime<Utc>) -> Self {
        QuotaCounter {
            count: 0,
            window_start: now,
        }
    }

    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.window_start) >= Duration::hours(24)
    }
}

/// Everything the bot remembers between invocations, persisted as one
/// JSON document.
#[derive(Serialize, Deserialize, Default)]
pub struct ScheduleState {
    pub records: Vec<ActionRecord>,
    pub quotas: HashMap<ActionKind, QuotaCounter>,
    pub actioned: HashMap<ActionKind, HashMap<String, DateTime<Utc>>>,
}

impl ScheduleState {
    pub fn last_of_kind(&self, kind: ActionKind) -> Option<&ActionRecord> {
        self.records.iter().rev().find(|r| r.kind == kind)
    }

    pub fn already_actioned(&self, kind: ActionKind, target: &str) -> bool {
        self.actioned
            .get(&kind)
            .map_or(false, |targets| targets.contains_key(target))
    }
}

/// A post returned by the search collaborator.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub like_count: u32,
    pub created_at: DateTime<Utc>,
}
