use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::config::BotConfig;
use crate::error::StorageError;
use crate::models::{ActionKind, ActionRecord, Post, QuotaCounter, ScheduleState};
use crate::store::StateStore;

/// Records older than this no longer matter to any window and get pruned.
/// Dedup entries are kept: a target once actioned stays actioned.
const RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    AlreadyActioned,
    TooSoon { wait: Duration },
    QuotaExceeded,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::AlreadyActioned => write!(f, "target already actioned"),
            RejectReason::TooSoon { wait } => {
                write!(f, "too soon, {}s of cooldown left", wait.num_seconds())
            }
            RejectReason::QuotaExceeded => write!(f, "daily quota exhausted"),
        }
    }
}

/// Gates every outgoing action behind dedup, interval and quota checks and
/// persists what actually went out. The scheduler never talks to the
/// remote platform itself; callers act only on an `Allowed` decision and
/// record afterwards.
pub struct ActionScheduler {
    config: BotConfig,
    store: StateStore,
    state: ScheduleState,
}

impl ActionScheduler {
    pub fn new(config: BotConfig, store: StateStore) -> Result<Self, StorageError> {
        let state = store.load()?;
        Ok(ActionScheduler {
            config,
            store,
            state,
        })
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Decide whether an action of `kind` may fire right now. Rejections
    /// are ordinary answers, not errors. Passing no target skips the dedup
    /// check, which lets callers probe the interval and quota gates before
    /// they have picked a concrete target.
    pub fn can_execute(
        &mut self,
        kind: ActionKind,
        target: Option<&str>,
        now: DateTime<Utc>,
    ) -> Decision {
        if kind.deduped() {
            if let Some(target) = target {
                if self.state.already_actioned(kind, target) {
                    return Decision::Rejected(RejectReason::AlreadyActioned);
                }
            }
        }

        if let Some(min) = self.config.min_interval(kind, &mut rand::thread_rng()) {
            if let Some(last) = self.state.last_of_kind(kind) {
                let elapsed = now.signed_duration_since(last.timestamp);
                if elapsed < min {
                    return Decision::Rejected(RejectReason::TooSoon { wait: min - elapsed });
                }
            }
        }

        let limit = self.config.daily_limit(kind);
        if self.quota_mut(kind, now).count >= limit {
            return Decision::Rejected(RejectReason::QuotaExceeded);
        }

        Decision::Allowed
    }

    /// Record an executed action and persist the whole state atomically.
    /// On error nothing durable has changed and the caller must not treat
    /// the action as recorded.
    pub fn record_action(
        &mut self,
        kind: ActionKind,
        target: Option<&str>,
        content_key: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        // Timestamps in the log never go backwards.
        let timestamp = match self.state.records.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        self.state.records.push(ActionRecord {
            kind,
            target_id: target.map(String::from),
            timestamp,
            content_key: content_key.to_string(),
        });
        self.quota_mut(kind, now).count += 1;
        if let Some(target) = target {
            self.state
                .actioned
                .entry(kind)
                .or_default()
                .insert(target.to_string(), timestamp);
        }

        let cutoff = now - Duration::days(RETENTION_DAYS);
        self.state.records.retain(|record| record.timestamp >= cutoff);

        self.store.save(&self.state)
    }

    /// Posts worth replying to: engaged enough, not already replied to,
    /// most engaged first with ties going to the newest.
    pub fn select_candidates(&self, posts: &[Post]) -> Vec<Post> {
        let mut candidates: Vec<Post> = posts
            .iter()
            .filter(|post| post.like_count >= self.config.min_likes_threshold)
            .filter(|post| !self.state.already_actioned(ActionKind::Reply, &post.id))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| {
            b.like_count
                .cmp(&a.like_count)
                .then(b.created_at.cmp(&a.created_at))
        });
        candidates
    }

    /// Content already sent for this kind, for rotation bookkeeping.
    pub fn used_content(&self, kind: ActionKind) -> HashSet<&str> {
        self.state
            .records
            .iter()
            .filter(|record| record.kind == kind)
            .map(|record| record.content_key.as_str())
            .collect()
    }

    /// The most recent `n` content keys of this kind, newest first.
    pub fn recent_content(&self, kind: ActionKind, n: usize) -> Vec<&str> {
        self.state
            .records
            .iter()
            .rev()
            .filter(|record| record.kind == kind)
            .take(n)
            .map(|record| record.content_key.as_str())
            .collect()
    }

    /// Users we followed but have not messaged yet.
    pub fn pending_dm_targets(&self) -> Vec<String> {
        let messaged = self.state.actioned.get(&ActionKind::DirectMessage);
        self.state
            .actioned
            .get(&ActionKind::Follow)
            .map(|followed| {
                followed
                    .keys()
                    .filter(|user| messaged.map_or(true, |dms| !dms.contains_key(*user)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn quota_mut(&mut self, kind: ActionKind, now: DateTime<Utc>) -> &mut QuotaCounter {
        let quota = self
            .state
            .quotas
            .entry(kind)
            .or_insert_with(|| QuotaCounter::start(now));
        if quota.expired(now) {
            *quota = QuotaCounter::start(now);
        }
        quota
    }
}
