use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of graph-unique input and output identifiers.
static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

fn next_graph_id() -> u64 {
    NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed)
}

/// Stable capture device identifier (the platform's unique device ID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new `DeviceId` from a raw string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the inner string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Media a device can capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Video,
    Audio,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// Physical position of a device on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevicePosition {
    Unspecified,
    Back,
    Front,
}

/// Hardware class of a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    WideAngle,
    UltraWide,
    Telephoto,
    DualCamera,
    TrueDepth,
    External,
    Microphone,
}

/// Discovered capture device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDevice {
    pub id: DeviceId,
    pub model_id: String,
    pub name: String,
    pub manufacturer: String,
    pub kind: DeviceKind,
    pub position: DevicePosition,
    pub media_types: Vec<MediaType>,
}

impl CaptureDevice {
    /// Whether this device can capture the given media.
    pub fn supports(&self, media: MediaType) -> bool {
        self.media_types.contains(&media)
    }
}

/// Pick the default device for a media type: first back-facing match, else
/// first match of any position.
pub fn default_device(devices: &[CaptureDevice], media: MediaType) -> Option<&CaptureDevice> {
    devices
        .iter()
        .filter(|d| d.supports(media))
        .find(|d| d.position == DevicePosition::Back)
        .or_else(|| devices.iter().find(|d| d.supports(media)))
}

/// Pick the first device of a specific kind and position.
pub fn default_device_of(
    devices: &[CaptureDevice],
    kind: DeviceKind,
    media: Option<MediaType>,
    position: DevicePosition,
) -> Option<&CaptureDevice> {
    devices_of(devices, &[kind], media, position).into_iter().next()
}

/// All devices matching any of `kinds`, the optional media type, and
/// position. `DevicePosition::Unspecified` matches every position.
pub fn devices_of<'a>(
    devices: &'a [CaptureDevice],
    kinds: &[DeviceKind],
    media: Option<MediaType>,
    position: DevicePosition,
) -> Vec<&'a CaptureDevice> {
    devices
        .iter()
        .filter(|d| kinds.contains(&d.kind))
        .filter(|d| media.map_or(true, |m| d.supports(m)))
        .filter(|d| position == DevicePosition::Unspecified || d.position == position)
        .collect()
}

/// Session quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPreset {
    Photo,
    High,
    Medium,
    Low,
    Hd1280x720,
    Hd1920x1080,
    Hd4k,
}

impl SessionPreset {
    /// Snake-case string identifier.
    pub fn as_id_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Hd1280x720 => "hd1280x720",
            Self::Hd1920x1080 => "hd1920x1080",
            Self::Hd4k => "hd4k",
        }
    }
}

/// Initial configuration applied when a controller starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfiguration {
    pub preset: Option<SessionPreset>,
}

impl SessionConfiguration {
    pub fn with_preset(preset: SessionPreset) -> Self {
        Self {
            preset: Some(preset),
        }
    }
}

/// Graph-unique input identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InputId(u64);

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input#{}", self.0)
    }
}

/// Graph-unique output identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OutputId(u64);

impl OutputId {
    pub(crate) fn next() -> Self {
        Self(next_graph_id())
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output#{}", self.0)
    }
}

/// A device bound as a graph input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureInput {
    pub id: InputId,
    pub device: CaptureDevice,
}

impl CaptureInput {
    /// Wrap a device as a new input with a fresh identifier.
    pub fn new(device: CaptureDevice) -> Self {
        Self {
            id: InputId(next_graph_id()),
            device,
        }
    }
}

/// Kind of processing output attached to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Metadata,
    Video,
    Photo,
}

/// What the graph knows about an attached output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDescriptor {
    pub id: OutputId,
    pub kind: OutputKind,
}

/// The live configuration of one capture pipeline.
///
/// Only mutated by a backend, and only between `begin_configuration` and
/// `commit_configuration`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureGraph {
    pub inputs: Vec<CaptureInput>,
    pub outputs: Vec<OutputDescriptor>,
    pub preset: Option<SessionPreset>,
    pub running: bool,
    pub interrupted: bool,
}

impl CaptureGraph {
    pub fn contains_input(&self, id: InputId) -> bool {
        self.inputs.iter().any(|i| i.id == id)
    }

    pub fn contains_output(&self, id: OutputId) -> bool {
        self.outputs.iter().any(|o| o.id == id)
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            preset: self.preset,
            running: self.running,
            interrupted: self.interrupted,
        }
    }
}

/// Point-in-time view of a capture graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub inputs: Vec<CaptureInput>,
    pub outputs: Vec<OutputDescriptor>,
    pub preset: Option<SessionPreset>,
    pub running: bool,
    pub interrupted: bool,
}

impl GraphSnapshot {
    pub fn input_ids(&self) -> Vec<InputId> {
        self.inputs.iter().map(|i| i.id).collect()
    }

    pub fn output_ids(&self) -> Vec<OutputId> {
        self.outputs.iter().map(|o| o.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, kind: DeviceKind, position: DevicePosition) -> CaptureDevice {
        CaptureDevice {
            id: DeviceId::new(id),
            model_id: "model".to_string(),
            name: id.to_string(),
            manufacturer: "Test".to_string(),
            kind,
            position,
            media_types: vec![MediaType::Video],
        }
    }

    #[test]
    fn device_id_display() {
        let id = DeviceId::new("com.example.camera:0");
        assert_eq!(id.to_string(), "com.example.camera:0");
        assert_eq!(id.as_str(), "com.example.camera:0");
    }

    #[test]
    fn default_device_prefers_back_position() {
        let devices = vec![
            device("front", DeviceKind::WideAngle, DevicePosition::Front),
            device("back", DeviceKind::WideAngle, DevicePosition::Back),
        ];
        let chosen = default_device(&devices, MediaType::Video).unwrap();
        assert_eq!(chosen.id.as_str(), "back");
    }

    #[test]
    fn default_device_falls_back_to_any_position() {
        let devices = vec![device("front", DeviceKind::WideAngle, DevicePosition::Front)];
        let chosen = default_device(&devices, MediaType::Video).unwrap();
        assert_eq!(chosen.id.as_str(), "front");
    }

    #[test]
    fn default_device_none_for_unsupported_media() {
        let devices = vec![device("back", DeviceKind::WideAngle, DevicePosition::Back)];
        assert!(default_device(&devices, MediaType::Audio).is_none());
    }

    #[test]
    fn devices_of_filters_kind_and_position() {
        let devices = vec![
            device("back-wide", DeviceKind::WideAngle, DevicePosition::Back),
            device("back-tele", DeviceKind::Telephoto, DevicePosition::Back),
            device("front-wide", DeviceKind::WideAngle, DevicePosition::Front),
        ];
        let found = devices_of(
            &devices,
            &[DeviceKind::WideAngle],
            Some(MediaType::Video),
            DevicePosition::Front,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "front-wide");

        let any_position = devices_of(
            &devices,
            &[DeviceKind::WideAngle],
            None,
            DevicePosition::Unspecified,
        );
        assert_eq!(any_position.len(), 2);
    }

    #[test]
    fn inputs_get_distinct_ids() {
        let d = device("back", DeviceKind::WideAngle, DevicePosition::Back);
        let a = CaptureInput::new(d.clone());
        let b = CaptureInput::new(d);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn graph_snapshot_serialises_to_camelcase() {
        let graph = CaptureGraph {
            preset: Some(SessionPreset::High),
            outputs: vec![OutputDescriptor {
                id: OutputId::next(),
                kind: OutputKind::Metadata,
            }],
            ..CaptureGraph::default()
        };
        let json = serde_json::to_value(graph.snapshot()).unwrap();
        assert_eq!(json["preset"], "high");
        assert_eq!(json["running"], false);
        assert_eq!(json["outputs"][0]["kind"], "metadata");
    }

    #[test]
    fn preset_id_strings_match_serde_names() {
        for preset in [
            SessionPreset::Photo,
            SessionPreset::High,
            SessionPreset::Hd1920x1080,
            SessionPreset::Hd4k,
        ] {
            let json = serde_json::to_value(preset).unwrap();
            assert_eq!(json, preset.as_id_str());
        }
    }
}
