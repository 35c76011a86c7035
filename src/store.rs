use std::fs;
use std::path::PathBuf;

use crate::error::StorageError;
use crate::models::ScheduleState;

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StateStore { path: path.into() }
    }

    /// Load persisted state, or start empty on first run.
    pub fn load(&self) -> Result<ScheduleState, StorageError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(ScheduleState::default())
        }
    }

    /// Write the whole state to a sibling temp file, then rename it over
    /// the live one. A crash mid-write leaves the previous state intact.
    pub fn save(&self, state: &ScheduleState) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionKind, ActionRecord, QuotaCounter};
    use chrono::Utc;

    #[test]
    fn missing_file_loads_empty_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path().join("bot_state.json"));
        let state = store.load().expect("load");
        assert!(state.records.is_empty());
        assert!(state.quotas.is_empty());
        assert!(state.actioned.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path().join("bot_state.json"));

        let now = Utc::now();
        let mut state = ScheduleState::default();
        state.records.push(ActionRecord {
            kind: ActionKind::Reply,
            target_id: Some("12345".to_string()),
            timestamp: now,
            content_key: "hello there".to_string(),
        });
        state.quotas.insert(ActionKind::Reply, QuotaCounter {
            count: 1,
            window_start: now,
        });
        state
            .actioned
            .entry(ActionKind::Reply)
            .or_default()
            .insert("12345".to_string(), now);

        store.save(&state).expect("save");
        let reloaded = store.load().expect("load");

        assert_eq!(reloaded.records, state.records);
        assert_eq!(reloaded.quotas, state.quotas);
        assert_eq!(reloaded.actioned, state.actioned);
    }

    #[test]
    fn save_replaces_previous_state_atomically() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bot_state.json");
        let store = StateStore::new(&path);

        store.save(&ScheduleState::default()).expect("first save");

        let mut state = ScheduleState::default();
        state.records.push(ActionRecord {
            kind: ActionKind::Tweet,
            target_id: None,
            timestamp: Utc::now(),
            content_key: "second write".to_string(),
        });
        store.save(&state).expect("second save");

        // No stray temp file left behind, and the live file has the new state.
        assert!(!path.with_extension("tmp").exists());
        assert_eq!(store.load().expect("load").records.len(), 1);
    }
}
