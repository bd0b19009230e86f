use serde::Serialize;
use std::fmt;

use crate::output::{DetectionEvent, DetectionKind};

/// Identity used when a code carries no decoded string.
pub const DEFAULT_FALLBACK_IDENTITY: &str = "unknown";

/// Key under which repeated sightings of the same object collapse.
///
/// Each source gets its own variant, so a code whose payload reads like a
/// track key (`face:12`) or like the fallback never aliases another entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    /// Decoded payload of a machine-readable code.
    Code(String),
    /// Hardware track of a face, body or salient region.
    Tracked { kind: DetectionKind, track: i64 },
    /// A code that did not decode.
    Fallback(String),
}

impl Identity {
    /// Identity of a code with decoded payload `value`.
    pub fn new(value: impl Into<String>) -> Self {
        Self::Code(value.into())
    }

    pub fn tracked(kind: DetectionKind, track: i64) -> Self {
        Self::Tracked { kind, track }
    }

    /// Decoded payload, for code identities.
    pub fn code_value(&self) -> Option<&str> {
        match self {
            Self::Code(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(value) | Self::Fallback(value) => f.write_str(value),
            Self::Tracked { kind, track } => write!(f, "{kind}:{track}"),
        }
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Derives an [`Identity`] from a detection.
///
/// Codes are keyed by their decoded string, or by `fallback` when the
/// payload did not decode. Tracked kinds are keyed by kind and track id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPolicy {
    fallback: String,
}

impl IdentityPolicy {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn identify(&self, event: &DetectionEvent) -> Identity {
        if let Some(value) = event.string_value() {
            return Identity::new(value);
        }
        match event.track_id() {
            Some(track) => Identity::tracked(event.kind(), track),
            None => Identity::Fallback(self.fallback.clone()),
        }
    }
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_IDENTITY)
    }
}
