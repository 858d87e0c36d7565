use std::str::FromStr;

use anyhow::anyhow;
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdScheme {
    #[default]
    Uuid,
    /// Decimal counter, one sequence shared by lists and tasks.
    Sequential,
    /// Milliseconds since the epoch, bumped past the previous id on collision.
    Timestamp,
}

impl FromStr for IdScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uuid" => Ok(Self::Uuid),
            "sequential" | "counter" => Ok(Self::Sequential),
            "timestamp" => Ok(Self::Timestamp),
            other => Err(anyhow!(
                "invalid id scheme: {other} (expected uuid, sequential or timestamp)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdGenerator {
    scheme: IdScheme,
    last: u64,
}

impl IdGenerator {
    pub fn new(scheme: IdScheme) -> Self {
        Self { scheme, last: 0 }
    }

    /// Starts past the highest numeric id already present, so generated ids
    /// never repeat one loaded from storage.
    pub fn resume(scheme: IdScheme, state: &AppState) -> Self {
        let list_ids = state.lists.iter().map(|list| list.id.as_str());
        let task_ids = state
            .lists
            .iter()
            .flat_map(|list| list.tasks.iter().map(|task| task.id.as_str()));
        let last = list_ids
            .chain(task_ids)
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        debug!(?scheme, last, "resumed id generator");
        Self { scheme, last }
    }

    /// Numeric schemes fall back to a UUID once the counter is exhausted.
    pub fn next_id(&mut self) -> String {
        let next = match self.scheme {
            IdScheme::Uuid => None,
            IdScheme::Sequential => self.last.checked_add(1),
            IdScheme::Timestamp => {
                let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
                self.last.checked_add(1).map(|bumped| now.max(bumped))
            }
        };

        match next {
            Some(id) => {
                self.last = id;
                id.to_string()
            }
            None => {
                if self.scheme != IdScheme::Uuid {
                    warn!(scheme = ?self.scheme, last = self.last, "numeric ids exhausted; using uuid");
                }
                Uuid::new_v4().to_string()
            }
        }
    }
}
