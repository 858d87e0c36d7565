use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info, warn};

use crate::ids::IdScheme;

pub const RC_ENV_VAR: &str = "TASKLISTSRC";
pub const RC_FILE_NAME: &str = ".tasklistsrc";

const DEFAULTS: &[(&str, &str)] = &[
    ("data.location", "~/.tasklists"),
    ("color", "on"),
    ("id.scheme", "uuid"),
];

const KNOWN_KEYS: &[&str] = &["data.location", "color", "id.scheme", "storage.quota"];

/// Settings from defaults, then the rc file, then command-line overrides.
#[derive(Debug, Clone)]
pub struct Config {
    values: BTreeMap<String, String>,
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            values: DEFAULTS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            source: None,
        }
    }
}

impl Config {
    #[tracing::instrument]
    pub fn load(rc_file: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Self::default();
        let Some(path) = locate_rc_file(rc_file) else {
            debug!("no rc file; using defaults");
            return Ok(cfg);
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        cfg.merge_rc_text(&text)
            .with_context(|| format!("in rc file {}", path.display()))?;
        info!(rc = %path.display(), "loaded rc file");
        cfg.source = Some(path);
        Ok(cfg)
    }

    /// `key = value` per line; `#` starts a comment anywhere on a line.
    pub fn merge_rc_text(&mut self, text: &str) -> anyhow::Result<()> {
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| anyhow!("line {}: expected key = value, got: {raw}", idx + 1))?;
            self.set(key.trim(), value.trim());
        }
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        if !KNOWN_KEYS.contains(&key) {
            warn!(key, "unknown setting; keeping it but nothing reads it");
        }
        debug!(key, value, "set config value");
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in overrides {
            self.set(&key, &value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn color(&self) -> anyhow::Result<bool> {
        match self.get("color").unwrap_or("on").to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => Ok(true),
            "off" | "no" | "false" | "0" => Ok(false),
            other => Err(anyhow!("invalid color setting: {other}")),
        }
    }

    pub fn id_scheme(&self) -> anyhow::Result<IdScheme> {
        self.get("id.scheme")
            .map_or(Ok(IdScheme::default()), str::parse::<IdScheme>)
    }

    /// `storage.quota` in bytes; unset or empty means unlimited.
    pub fn storage_quota(&self) -> anyhow::Result<Option<u64>> {
        match self.get("storage.quota").map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<u64>()
                .map(Some)
                .with_context(|| format!("invalid storage.quota: {raw}")),
        }
    }

    /// `--data` wins over `data.location`.
    pub fn data_dir(&self, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
        if let Some(dir) = override_dir {
            return Ok(dir.to_path_buf());
        }
        let location = self
            .get("data.location")
            .ok_or_else(|| anyhow!("data.location is not set"))?;
        expand_home(location)
    }
}

/// `--rc-file`, then `$TASKLISTSRC` (`/dev/null` disables), then
/// `~/.tasklistsrc` if it exists.
fn locate_rc_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    match std::env::var(RC_ENV_VAR) {
        Ok(value) if value == "/dev/null" => return None,
        Ok(value) if !value.is_empty() => return Some(PathBuf::from(value)),
        _ => {}
    }
    dirs::home_dir()
        .map(|home| home.join(RC_FILE_NAME))
        .filter(|path| path.exists())
}

fn expand_home(raw: &str) -> anyhow::Result<PathBuf> {
    let Some(rest) = raw.strip_prefix("~/") else {
        return Ok(PathBuf::from(raw));
    };
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(rest))
}
