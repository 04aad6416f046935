//! Debug events emitted while serving a fetch.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether cache events are reported, and with which tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDebugMode", into = "RawDebugMode")]
pub enum DebugMode {
    /// No events are reported.
    #[default]
    Off,
    /// Every event is reported.
    On,
    /// Every event is reported, labelled with the tag.
    Tagged(String),
}

impl DebugMode {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, DebugMode::Off)
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            DebugMode::Tagged(tag) => Some(tag),
            _ => None,
        }
    }
}

impl From<bool> for DebugMode {
    fn from(enabled: bool) -> Self {
        if enabled { DebugMode::On } else { DebugMode::Off }
    }
}

impl From<&str> for DebugMode {
    fn from(tag: &str) -> Self {
        DebugMode::Tagged(tag.to_owned())
    }
}

impl From<String> for DebugMode {
    fn from(tag: String) -> Self {
        DebugMode::Tagged(tag)
    }
}

/// Config representation: `false`, `true` or a tag string.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawDebugMode {
    Flag(bool),
    Tag(String),
}

impl From<RawDebugMode> for DebugMode {
    fn from(raw: RawDebugMode) -> Self {
        match raw {
            RawDebugMode::Flag(enabled) => enabled.into(),
            RawDebugMode::Tag(tag) => tag.into(),
        }
    }
}

impl From<DebugMode> for RawDebugMode {
    fn from(mode: DebugMode) -> Self {
        match mode {
            DebugMode::Off => RawDebugMode::Flag(false),
            DebugMode::On => RawDebugMode::Flag(true),
            DebugMode::Tagged(tag) => RawDebugMode::Tag(tag),
        }
    }
}

/// What happened to a single `fetch` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEvent {
    /// A fresh value was served without invoking the producer.
    Hit,
    /// No fresh value; the producer is about to be invoked.
    Miss,
    /// Another fetch for the key is in flight; the caller joined its queue.
    Queued,
}

impl CacheEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheEvent::Hit => "hitting cache",
            CacheEvent::Miss => "missing cache",
            CacheEvent::Queued => "fetching in queue",
        }
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives cache events when debug mode is enabled.
pub trait CacheObserver: Send + Sync {
    /// Called once per event. `tag` is set for [`DebugMode::Tagged`].
    fn observe(&self, event: CacheEvent, key: &str, tag: Option<&str>);
}

/// Reports events through `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn observe(&self, event: CacheEvent, key: &str, tag: Option<&str>) {
        match tag {
            Some(tag) => tracing::debug!(tag, key, "{event}"),
            None => tracing::debug!(key, "{event}"),
        }
    }
}
