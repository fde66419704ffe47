//! Deployment state persisted between runs.
//!
//! Holds the physical id recorded for each logical resource and the physical
//! id of the last crawler trigger that fired, which is what makes the trigger
//! one-shot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DeployError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentState {
    pub stack_name: String,
    pub account_id: String,
    pub region: String,
    /// logical id -> physical id
    #[serde(default)]
    pub resources: BTreeMap<String, String>,
    /// Physical id of the trigger that last fired.
    #[serde(default)]
    pub trigger_applied: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// JSON file store for one stack's [`DeploymentState`].
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state, or an empty one when the file does not exist yet.
    pub fn load(&self) -> Result<DeploymentState, DeployError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no state file, starting fresh");
            return Ok(DeploymentState::default());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(|e| DeployError::State {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    pub fn save(&self, state: &DeploymentState) -> Result<(), DeployError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut state = state.clone();
        state.updated_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(&state).map_err(|e| DeployError::State {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), resources = state.resources.len(), "state saved");
        Ok(())
    }

    pub fn remove(&self) -> Result<(), DeployError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path().join("absent.state.json"));
        assert_eq!(store.load().unwrap(), DeploymentState::default());
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path().join("nested/dir/lake.state.json"));

        let mut state = DeploymentState {
            stack_name: "Lake".into(),
            account_id: "123456789012".into(),
            region: "us-east-1".into(),
            ..Default::default()
        };
        state.resources.insert("CsvBucket".into(), "lake-bucket".into());
        state.trigger_applied = Some("StartCrawler-lake-seed-crawler".into());
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.resources, state.resources);
        assert_eq!(loaded.trigger_applied, state.trigger_applied);
        assert!(loaded.updated_at.is_some());
    }

    #[test]
    fn corrupt_file_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.state.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = StateStore::new(&path).load().unwrap_err();
        assert!(matches!(err, DeployError::State { .. }));
        assert!(err.to_string().contains("bad.state.json"));
    }

    #[test]
    fn remove_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path().join("s.json"));
        store.save(&DeploymentState::default()).unwrap();
        store.remove().unwrap();
        store.remove().unwrap();
        assert!(!store.path().exists());
    }
}
