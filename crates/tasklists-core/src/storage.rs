use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::model::{ListId, TaskList};
use crate::state::AppState;

pub const LISTS_KEY: &str = "task.lists";
pub const SELECTED_LIST_ID_KEY: &str = "task.selectedListId";

/// String-keyed durable storage with the get/set/remove surface of browser
/// local storage.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove_item(&mut self, key: &str) -> anyhow::Result<()>;
}

/// In-process store. Quota accounting counts key and value bytes, like
/// browsers do for local storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: BTreeMap<String, String>,
    quota: Option<u64>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: u64) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Number of `set_item`/`remove_item` calls made, failed ones included.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn used_bytes(&self) -> u64 {
        self.items
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.writes += 1;
        if let Some(quota) = self.quota {
            let current = self
                .items
                .get(key)
                .map(|old| (key.len() + old.len()) as u64)
                .unwrap_or(0);
            let projected = self.used_bytes() - current + (key.len() + value.len()) as u64;
            check_quota(key, projected, quota)?;
        }
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        self.writes += 1;
        self.items.remove(key);
        Ok(())
    }
}

/// One file per key under a data directory, replaced atomically on write.
#[derive(Debug)]
pub struct DirStore {
    pub data_dir: PathBuf,
    quota: Option<u64>,
}

impl DirStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path, quota: Option<u64>) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(
            data_dir = %data_dir.display(),
            quota = ?quota,
            "opened store"
        );

        Ok(Self { data_dir, quota })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.data_dir.join(format!("{file_name}.data"))
    }

    fn used_bytes_excluding(&self, skip: &Path) -> anyhow::Result<u64> {
        let mut total = 0;
        for entry in fs::read_dir(&self.data_dir)
            .with_context(|| format!("failed reading {}", self.data_dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if path == skip || path.extension().is_none_or(|ext| ext != "data") {
                continue;
            }
            total += entry.metadata()?.len();
        }
        Ok(total)
    }
}

impl KeyValueStore for DirStore {
    #[tracing::instrument(skip(self))]
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(file = %path.display(), "no stored value");
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        Ok(Some(raw))
    }

    #[tracing::instrument(skip(self, value), fields(bytes = value.len()))]
    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        if let Some(quota) = self.quota {
            let projected = self.used_bytes_excluding(&path)? + value.len() as u64;
            check_quota(key, projected, quota)?;
        }

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

        debug!(file = %path.display(), "stored value");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed removing {}", path.display()))?;
        }
        Ok(())
    }
}

fn check_quota(key: &str, projected: u64, quota: u64) -> anyhow::Result<()> {
    if projected > quota {
        return Err(anyhow!(
            "storage quota exceeded writing {key}: {projected} bytes > {quota} bytes"
        ));
    }
    Ok(())
}

/// Maps `AppState` onto the two storage keys.
#[derive(Debug)]
pub struct StateStore<S> {
    kv: S,
}

impl<S: KeyValueStore> StateStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn into_inner(self) -> S {
        self.kv
    }

    /// Never fails: missing, unreadable or corrupt data loads as an empty
    /// collection with no selection.
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> AppState {
        let lists = match self.kv.get_item(LISTS_KEY) {
            Ok(Some(raw)) => decode_lists(&raw),
            Ok(None) => vec![],
            Err(err) => {
                warn!(key = LISTS_KEY, error = %format!("{err:#}"), "failed reading lists; starting empty");
                vec![]
            }
        };

        let selected_list_id = match self.kv.get_item(SELECTED_LIST_ID_KEY) {
            Ok(raw) => decode_selection(raw),
            Err(err) => {
                warn!(key = SELECTED_LIST_ID_KEY, error = %format!("{err:#}"), "failed reading selection; starting unselected");
                None
            }
        };

        info!(
            lists = lists.len(),
            selected = ?selected_list_id,
            "loaded state"
        );
        AppState::new(lists, selected_list_id)
    }

    /// Writes both keys unconditionally. A null selection removes its key
    /// before the lists are written, so the stored selection never names a
    /// list missing from the stored collection.
    #[tracing::instrument(skip(self, state))]
    pub fn save(&mut self, state: &AppState) -> anyhow::Result<()> {
        let payload =
            serde_json::to_string(&state.lists).context("failed to serialize lists")?;

        if state.selected_list_id.is_none() {
            self.clear_selection()?;
        }

        debug!(bytes = payload.len(), lists = state.lists.len(), "saving lists");
        self.kv.set_item(LISTS_KEY, &payload).map_err(|err| {
            warn!(key = LISTS_KEY, "storage write failed");
            err.context(format!("failed to save {LISTS_KEY}"))
        })?;

        if let Some(id) = &state.selected_list_id {
            self.kv
                .set_item(SELECTED_LIST_ID_KEY, id.as_str())
                .map_err(|err| {
                    warn!(key = SELECTED_LIST_ID_KEY, "storage write failed");
                    err.context(format!("failed to save {SELECTED_LIST_ID_KEY}"))
                })?;
        }

        Ok(())
    }

    fn clear_selection(&mut self) -> anyhow::Result<()> {
        self.kv.remove_item(SELECTED_LIST_ID_KEY).map_err(|err| {
            warn!(key = SELECTED_LIST_ID_KEY, "storage remove failed");
            err.context(format!("failed to clear {SELECTED_LIST_ID_KEY}"))
        })
    }
}

fn decode_lists(raw: &str) -> Vec<TaskList> {
    // "null" is what JSON.stringify writes for a missing collection
    match serde_json::from_str::<Option<Vec<TaskList>>>(raw) {
        Ok(lists) => lists.unwrap_or_default(),
        Err(err) => {
            warn!(key = LISTS_KEY, error = %err, "stored lists are not valid; starting empty");
            vec![]
        }
    }
}

/// Older data stores a null selection as the text `null`.
pub fn decode_selection(raw: Option<String>) -> Option<ListId> {
    let raw = raw?;
    if raw.is_empty() || raw == "null" {
        return None;
    }
    Some(ListId::new(raw))
}
