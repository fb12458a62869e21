use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EnvelopeError;

/// The `{type, data}` unit exchanged over the push channel in both directions.
///
/// `type` is the only field the channel looks at, and only to hand it to
/// consumers; the channel itself gives no meaning to any value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Decode a text frame. Fails on invalid JSON or a missing/non-string `type`.
    pub fn decode(text: &str) -> Result<Self, EnvelopeError> {
        serde_json::from_str(text).map_err(EnvelopeError::Malformed)
    }

    pub fn encode(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(|source| EnvelopeError::Encode {
            kind: self.kind.clone(),
            source,
        })
    }

    /// The task change this envelope announces, if any.
    pub fn task_change(&self) -> Option<TaskChange> {
        self.kind.parse().ok()
    }
}

/// Task notifications that make a board view re-fetch its task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskChange {
    Created,
    Updated,
    Deleted,
}

impl TaskChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "task_created",
            Self::Updated => "task_updated",
            Self::Deleted => "task_deleted",
        }
    }
}

impl std::fmt::Display for TaskChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskChange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task_created" => Ok(Self::Created),
            "task_updated" => Ok(Self::Updated),
            "task_deleted" => Ok(Self::Deleted),
            _ => Err(format!("Not a task notification: {}", s)),
        }
    }
}
