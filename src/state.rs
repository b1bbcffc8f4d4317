use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Current state file format
pub const STATE_VERSION: u32 = 1;

/// Identities and last-known attributes of every managed resource
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AwxformState {
    /// Format version
    pub version: u32,

    /// Last time the state was written
    pub last_updated: DateTime<Utc>,

    /// Snapshots keyed by address, e.g. `credential.deploy`
    #[serde(default)]
    pub resources: BTreeMap<String, Snapshot>,
}

impl Default for AwxformState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl AwxformState {
    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            anyhow::bail!(
                "State file {} has version {}, this build understands up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize state to JSON")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Record the outcome for one address; `None` drops the entry
    pub fn record(&mut self, address: &str, snapshot: Option<Snapshot>) {
        match snapshot {
            Some(snapshot) => {
                self.resources.insert(address.to_string(), snapshot);
            }
            None => {
                self.resources.remove(address);
            }
        }
    }

    pub fn get(&self, address: &str) -> Option<&Snapshot> {
        self.resources.get(address)
    }

    /// Forget an address without touching the server
    pub fn remove(&mut self, address: &str) -> bool {
        self.resources.remove(address).is_some()
    }

    /// Update the timestamp and save
    pub fn touch(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();
        self.save(path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(resource_type: &str, id: &str) -> Snapshot {
        Snapshot {
            resource_type: resource_type.into(),
            id: id.into(),
            attributes: json!({"job_template_id": 7, "credential_id": 9}),
        }
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = AwxformState::load(&dir.path().join("state.json")).unwrap();
        assert!(state.resources.is_empty());
        assert_eq!(state.version, STATE_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut state = AwxformState::default();
        state.record("job_template_credential.deploy", Some(snapshot("job_template_credential", "7-9")));
        state.touch(&path).unwrap();

        let loaded = AwxformState::load(&path).unwrap();
        let entry = loaded.get("job_template_credential.deploy").unwrap();
        assert_eq!(entry.id, "7-9");
        assert_eq!(entry.attributes["credential_id"], 9);
    }

    #[test]
    fn test_record_none_drops_entry() {
        let mut state = AwxformState::default();
        state.record("survey.deploy", Some(snapshot("survey", "7")));
        state.record("survey.deploy", None);
        assert!(state.get("survey.deploy").is_none());
        assert!(!state.remove("survey.deploy"));
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{"version": 99, "last_updated": "2024-01-01T00:00:00Z", "resources": {}}"#,
        )
        .unwrap();
        assert!(AwxformState::load(&path).is_err());
    }

    #[test]
    fn test_corrupt_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        let err = AwxformState::load(&path).unwrap_err();
        assert!(err.to_string().contains("state.json"));
    }
}
