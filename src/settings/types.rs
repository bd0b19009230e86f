use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::capture::types::SessionPreset;
use crate::geometry::{ContentMode, CoordinateTransform, Size, VideoOrientation};
use crate::output::DEFAULT_CAPACITY;
use crate::recognition::{RecognitionConfig, RecognitionMode, DEFAULT_FALLBACK_IDENTITY};

/// Capture session settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSettings {
    pub preset: SessionPreset,
    pub content_mode: ContentMode,
    pub orientation: VideoOrientation,
    /// Sensor frame size in its native orientation.
    pub frame_width: f64,
    pub frame_height: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            preset: SessionPreset::High,
            content_mode: ContentMode::AspectFill,
            orientation: VideoOrientation::Portrait,
            frame_width: 1920.0,
            frame_height: 1080.0,
        }
    }
}

impl SessionSettings {
    pub fn transform(&self) -> CoordinateTransform {
        CoordinateTransform::new(
            Size::new(self.frame_width, self.frame_height),
            self.content_mode,
            self.orientation,
        )
    }
}

/// Output bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeSettings {
    /// Events queued per output before the oldest are dropped.
    pub capacity: usize,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Recognition lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RecognitionSettings {
    pub mode: RecognitionMode,
    /// Overrides the mode's default expiry.
    pub expiry_ms: Option<u64>,
    pub fallback_identity: String,
    pub codes_only: bool,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            mode: RecognitionMode::Multi,
            expiry_ms: None,
            fallback_identity: DEFAULT_FALLBACK_IDENTITY.to_string(),
            codes_only: false,
        }
    }
}

impl RecognitionSettings {
    pub fn to_config(&self) -> RecognitionConfig {
        let base = match self.mode {
            RecognitionMode::Single => RecognitionConfig::single(),
            RecognitionMode::Multi => RecognitionConfig::multi(),
        };
        RecognitionConfig {
            expiry: self
                .expiry_ms
                .map(Duration::from_millis)
                .unwrap_or(base.expiry),
            fallback_identity: self.fallback_identity.clone(),
            codes_only: self.codes_only,
            ..base
        }
    }
}

/// Top-level configuration file. Missing sections and fields take their
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanConfig {
    pub session: SessionSettings,
    pub bridge: BridgeSettings,
    pub recognition: RecognitionSettings,
}
