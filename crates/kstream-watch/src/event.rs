use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};

/// Kind of change a watch event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Added,
    Modified,
    Deleted,
    Error,
    Bookmark,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Added => "ADDED",
            EventType::Modified => "MODIFIED",
            EventType::Deleted => "DELETED",
            EventType::Error => "ERROR",
            EventType::Bookmark => "BOOKMARK",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a watch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEnvelope {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub object: serde_json::Value,
}

impl WatchEnvelope {
    /// Parse one line as an envelope.
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|source| WatchError::Parse {
            line: line.to_string(),
            source,
        })
    }

    /// Convert the envelope into a typed event.
    ///
    /// ERROR envelopes come back as [`WatchError::Status`] carrying the
    /// server's status payload.
    pub fn into_event<T: DeserializeOwned>(self) -> Result<(EventType, T)> {
        let event_type = self.event_type;
        if event_type == EventType::Error {
            let status = serde_json::from_value(self.object)
                .map_err(|source| WatchError::Decode { event_type, source })?;
            return Err(WatchError::Status(status));
        }
        let object = serde_json::from_value(self.object)
            .map_err(|source| WatchError::Decode { event_type, source })?;
        Ok((event_type, object))
    }
}

/// Status payload of an ERROR event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

/// Extra context attached to a [`Status`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<StatusCause>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCause {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status.as_deref().unwrap_or("Unknown"))?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        match (&self.reason, self.code) {
            (Some(reason), Some(code)) => write!(f, " ({reason}, {code})"),
            (Some(reason), None) => write!(f, " ({reason})"),
            (None, Some(code)) => write!(f, " ({code})"),
            (None, None) => Ok(()),
        }
    }
}

/// Decode one non-blank line into a typed event.
pub(crate) fn decode_line<T: DeserializeOwned>(line: &str) -> Result<(EventType, T)> {
    WatchEnvelope::parse(line)?.into_event()
}
