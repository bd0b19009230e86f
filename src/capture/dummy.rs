use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::capture::backend::CaptureBackend;
use crate::capture::error::{CaptureError, Result};
use crate::capture::types::{
    CaptureDevice, CaptureGraph, CaptureInput, DeviceId, DeviceKind, DevicePosition,
    GraphSnapshot, InputId, MediaType, OutputDescriptor, OutputId, OutputKind, SessionPreset,
};
use crate::output::{
    DetectionEvent, Frame, OutputAttachment, OutputDelegate, PhotoDelegate, PhotoRequestId,
};

const BACK_DEVICE_ID: &str = "dummy:back:camera-001";
const FRONT_DEVICE_ID: &str = "dummy:front:camera-002";
const MIC_DEVICE_ID: &str = "dummy:mic:audio-001";

/// Placeholder still image: a JPEG start marker, a comment segment, and an
/// end marker. Consumers treat photo data as opaque.
fn test_pattern_jpeg() -> Vec<u8> {
    const COMMENT: &[u8] = b"scan dummy photo";
    let segment_len = (COMMENT.len() + 2) as u16;
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xFE];
    data.extend_from_slice(&segment_len.to_be_bytes());
    data.extend_from_slice(COMMENT);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

fn simulated_devices() -> Vec<CaptureDevice> {
    let camera = |id: &str, name: &str, kind, position| CaptureDevice {
        id: DeviceId::new(id),
        model_id: "dummy-model".to_string(),
        name: name.to_string(),
        manufacturer: "Scan".to_string(),
        kind,
        position,
        media_types: vec![MediaType::Video],
    };
    vec![
        camera(
            BACK_DEVICE_ID,
            "Dummy Back Camera",
            DeviceKind::WideAngle,
            DevicePosition::Back,
        ),
        camera(
            FRONT_DEVICE_ID,
            "Dummy Front Camera",
            DeviceKind::TrueDepth,
            DevicePosition::Front,
        ),
        CaptureDevice {
            id: DeviceId::new(MIC_DEVICE_ID),
            model_id: "dummy-mic".to_string(),
            name: "Dummy Microphone".to_string(),
            manufacturer: "Scan".to_string(),
            kind: DeviceKind::Microphone,
            position: DevicePosition::Unspecified,
            media_types: vec![MediaType::Audio],
        },
    ]
}

/// Configuration-bracket bookkeeping recorded by [`DummyBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BracketStats {
    /// Brackets currently open.
    pub depth: u32,
    /// Highest `depth` ever observed.
    pub max_depth: u32,
    pub commits: u64,
    /// Graph mutations attempted while no bracket was open.
    pub mutations_outside_bracket: u64,
}

/// Read handle onto a dummy backend's bracket bookkeeping. Stays valid after
/// the backend has moved into a controller.
#[derive(Clone, Default)]
pub struct BracketProbe(Arc<Mutex<BracketStats>>);

impl BracketProbe {
    pub fn stats(&self) -> BracketStats {
        *self.0.lock()
    }
}

struct DummyShared {
    graph: CaptureGraph,
    delegates: Vec<(OutputId, OutputDelegate)>,
}

/// Test-side handle that plays the role of the hardware: it pushes
/// detections and frames into whatever outputs are attached.
#[derive(Clone)]
pub struct DummyFeed {
    shared: Arc<Mutex<DummyShared>>,
}

impl DummyFeed {
    fn delivering(&self) -> Option<Vec<OutputDelegate>> {
        let shared = self.shared.lock();
        if !shared.graph.running || shared.graph.interrupted {
            return None;
        }
        Some(shared.delegates.iter().map(|(_, d)| d.clone()).collect())
    }

    /// Deliver one metadata callback to every attached metadata output.
    /// Returns how many events were queued in total; zero while stopped.
    pub fn emit_detections(&self, events: &[DetectionEvent]) -> usize {
        let Some(delegates) = self.delivering() else {
            tracing::trace!(target: "capture::dummy", "dropping detections, session not running");
            return 0;
        };
        delegates
            .iter()
            .filter_map(|d| match d {
                OutputDelegate::Metadata(m) => Some(m.deliver(events.iter().cloned())),
                _ => None,
            })
            .sum()
    }

    /// Deliver one frame to every attached video output.
    pub fn emit_frame(&self, frame: &Frame) -> usize {
        let Some(delegates) = self.delivering() else {
            return 0;
        };
        delegates
            .iter()
            .filter(|d| match d {
                OutputDelegate::Video(v) => v.deliver(frame.clone()),
                _ => false,
            })
            .count()
    }

    /// Simulate the system suspending or resuming the session.
    pub fn set_interrupted(&self, interrupted: bool) {
        tracing::info!(target: "capture::dummy", "session interrupted: {interrupted}");
        self.shared.lock().graph.interrupted = interrupted;
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().graph.running
    }
}

/// A simulated capture session for testing without real hardware.
///
/// Keeps the graph in memory, enforces the usual compatibility rules
/// (no duplicate inputs or outputs, one input per media type), and records
/// configuration-bracket depth. Delivers a placeholder JPEG for photos.
///
/// Enable via `DUMMY_CAMERA=1` environment variable.
pub struct DummyBackend {
    devices: Vec<CaptureDevice>,
    shared: Arc<Mutex<DummyShared>>,
    probe: BracketProbe,
    incompatible_devices: Vec<DeviceId>,
    incompatible_outputs: Vec<OutputKind>,
    unsupported_presets: Vec<SessionPreset>,
    configuration_latency: Duration,
    photo_failure: Option<String>,
}

impl DummyBackend {
    pub fn new() -> Self {
        Self {
            devices: simulated_devices(),
            shared: Arc::new(Mutex::new(DummyShared {
                graph: CaptureGraph::default(),
                delegates: Vec::new(),
            })),
            probe: BracketProbe::default(),
            incompatible_devices: Vec::new(),
            incompatible_outputs: Vec::new(),
            unsupported_presets: vec![SessionPreset::Hd4k],
            configuration_latency: Duration::ZERO,
            photo_failure: None,
        }
    }

    /// Whether the dummy camera is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_CAMERA").is_ok_and(|v| v == "1" || v == "true")
    }

    /// The simulated back camera's ID.
    pub fn back_device_id() -> DeviceId {
        DeviceId::new(BACK_DEVICE_ID)
    }

    pub fn front_device_id() -> DeviceId {
        DeviceId::new(FRONT_DEVICE_ID)
    }

    /// Return the placeholder photo payload.
    pub fn test_photo() -> Vec<u8> {
        test_pattern_jpeg()
    }

    /// Replace the simulated device list.
    pub fn with_devices(mut self, devices: Vec<CaptureDevice>) -> Self {
        self.devices = devices;
        self
    }

    /// Report inputs bound to `device` as incompatible.
    pub fn with_incompatible_device(mut self, device: DeviceId) -> Self {
        self.incompatible_devices.push(device);
        self
    }

    pub fn with_incompatible_output(mut self, kind: OutputKind) -> Self {
        self.incompatible_outputs.push(kind);
        self
    }

    pub fn with_unsupported_preset(mut self, preset: SessionPreset) -> Self {
        if !self.unsupported_presets.contains(&preset) {
            self.unsupported_presets.push(preset);
        }
        self
    }

    /// Sleep inside every mutation, widening the window in which
    /// overlapping brackets would show up.
    pub fn with_configuration_latency(mut self, latency: Duration) -> Self {
        self.configuration_latency = latency;
        self
    }

    /// Fail every still capture with `reason`.
    pub fn with_photo_failure(mut self, reason: impl Into<String>) -> Self {
        self.photo_failure = Some(reason.into());
        self
    }

    pub fn probe(&self) -> BracketProbe {
        self.probe.clone()
    }

    pub fn feed(&self) -> DummyFeed {
        DummyFeed {
            shared: Arc::clone(&self.shared),
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut DummyShared)) {
        {
            let mut stats = self.probe.0.lock();
            if stats.depth == 0 {
                stats.mutations_outside_bracket += 1;
                tracing::warn!(target: "capture::dummy", "graph mutated outside a configuration bracket");
            }
        }
        if !self.configuration_latency.is_zero() {
            std::thread::sleep(self.configuration_latency);
        }
        f(&mut self.shared.lock());
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for DummyBackend {
    fn devices(&self) -> Result<Vec<CaptureDevice>> {
        Ok(self.devices.clone())
    }

    fn begin_configuration(&mut self) {
        let mut stats = self.probe.0.lock();
        stats.depth += 1;
        stats.max_depth = stats.max_depth.max(stats.depth);
    }

    fn commit_configuration(&mut self) {
        let mut stats = self.probe.0.lock();
        stats.depth = stats.depth.saturating_sub(1);
        stats.commits += 1;
    }

    fn can_add_input(&self, input: &CaptureInput) -> bool {
        if self.incompatible_devices.contains(&input.device.id) {
            return false;
        }
        let shared = self.shared.lock();
        if shared.graph.contains_input(input.id) {
            return false;
        }
        !shared.graph.inputs.iter().any(|existing| {
            existing
                .device
                .media_types
                .iter()
                .any(|m| input.device.supports(*m))
        })
    }

    fn add_input(&mut self, input: CaptureInput) {
        self.mutate(|s| s.graph.inputs.push(input));
    }

    fn remove_input(&mut self, id: InputId) {
        self.mutate(|s| s.graph.inputs.retain(|i| i.id != id));
    }

    fn contains_input(&self, id: InputId) -> bool {
        self.shared.lock().graph.contains_input(id)
    }

    fn can_add_output(&self, output: &OutputDescriptor) -> bool {
        !self.incompatible_outputs.contains(&output.kind)
            && !self.shared.lock().graph.contains_output(output.id)
    }

    fn add_output(&mut self, output: OutputAttachment) {
        self.mutate(|s| {
            s.graph.outputs.push(output.descriptor);
            s.delegates.push((output.descriptor.id, output.delegate));
        });
    }

    fn remove_output(&mut self, id: OutputId) {
        self.mutate(|s| {
            s.graph.outputs.retain(|o| o.id != id);
            s.delegates.retain(|(output, _)| *output != id);
        });
    }

    fn contains_output(&self, id: OutputId) -> bool {
        self.shared.lock().graph.contains_output(id)
    }

    fn can_set_preset(&self, preset: SessionPreset) -> bool {
        !self.unsupported_presets.contains(&preset)
    }

    fn set_preset(&mut self, preset: SessionPreset) {
        self.mutate(|s| s.graph.preset = Some(preset));
    }

    fn start_running(&mut self) {
        self.shared.lock().graph.running = true;
    }

    fn stop_running(&mut self) {
        let mut shared = self.shared.lock();
        shared.graph.running = false;
        shared.graph.interrupted = false;
    }

    fn is_running(&self) -> bool {
        self.shared.lock().graph.running
    }

    fn is_interrupted(&self) -> bool {
        self.shared.lock().graph.interrupted
    }

    fn snapshot(&self) -> GraphSnapshot {
        self.shared.lock().graph.snapshot()
    }

    fn capture_photo(&mut self, request: PhotoRequestId, delegate: PhotoDelegate) -> Result<()> {
        let (running, has_photo_output) = {
            let shared = self.shared.lock();
            let has_photo_output = shared
                .graph
                .outputs
                .iter()
                .any(|o| o.kind == OutputKind::Photo);
            (shared.graph.running, has_photo_output)
        };
        if !has_photo_output {
            return Err(CaptureError::CaptureFailed(format!(
                "{request}: no photo output attached"
            )));
        }
        if !running {
            delegate.fail(request, "session is not running");
        } else if let Some(reason) = &self.photo_failure {
            delegate.fail(request, reason.clone());
        } else {
            delegate.deliver(request, Ok(test_pattern_jpeg()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::default_device;
    use crate::geometry::Rect;
    use crate::output::{MetadataOutput, PhotoOutput, Symbology, VideoOutput};

    fn back_input(backend: &DummyBackend) -> CaptureInput {
        let devices = backend.devices().unwrap();
        CaptureInput::new(default_device(&devices, MediaType::Video).unwrap().clone())
    }

    #[test]
    fn enumerates_simulated_devices() {
        let backend = DummyBackend::new();
        let devices = backend.devices().unwrap();
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].id, DummyBackend::back_device_id());
        assert_eq!(devices[1].id, DummyBackend::front_device_id());
        assert!(devices[2].supports(MediaType::Audio));
    }

    #[test]
    fn is_enabled_reads_env_var() {
        std::env::remove_var("DUMMY_CAMERA");
        assert!(!DummyBackend::is_enabled());
    }

    #[test]
    fn placeholder_photo_has_jpeg_markers() {
        let photo = DummyBackend::test_photo();
        assert_eq!(&photo[..2], &[0xFF, 0xD8]);
        assert_eq!(&photo[photo.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn second_video_input_is_incompatible() {
        let mut backend = DummyBackend::new();
        let first = back_input(&backend);
        backend.begin_configuration();
        backend.add_input(first);
        backend.commit_configuration();

        let front = backend
            .devices()
            .unwrap()
            .into_iter()
            .find(|d| d.id == DummyBackend::front_device_id())
            .unwrap();
        assert!(!backend.can_add_input(&CaptureInput::new(front)));
    }

    #[test]
    fn audio_input_is_compatible_next_to_video() {
        let mut backend = DummyBackend::new();
        let video = back_input(&backend);
        backend.begin_configuration();
        backend.add_input(video);
        backend.commit_configuration();
        let devices = backend.devices().unwrap();
        let mic = default_device(&devices, MediaType::Audio).unwrap().clone();
        assert!(backend.can_add_input(&CaptureInput::new(mic)));
    }

    #[test]
    fn injected_incompatibilities_are_reported() {
        let backend = DummyBackend::new()
            .with_incompatible_device(DummyBackend::back_device_id())
            .with_incompatible_output(OutputKind::Video);
        assert!(!backend.can_add_input(&back_input(&backend)));
        assert!(!backend.can_add_output(&VideoOutput::new(1).descriptor()));
        assert!(backend.can_add_output(&MetadataOutput::new(1).descriptor()));
        assert!(!backend.can_set_preset(SessionPreset::Hd4k));
        assert!(backend.can_set_preset(SessionPreset::High));
    }

    #[test]
    fn probe_records_bracket_depth_and_stray_mutations() {
        let mut backend = DummyBackend::new();
        let probe = backend.probe();
        backend.begin_configuration();
        backend.set_preset(SessionPreset::High);
        backend.commit_configuration();
        backend.set_preset(SessionPreset::Low);

        let stats = probe.stats();
        assert_eq!(stats.depth, 0);
        assert_eq!(stats.max_depth, 1);
        assert_eq!(stats.commits, 1);
        assert_eq!(stats.mutations_outside_bracket, 1);
    }

    #[test]
    fn feed_delivers_only_while_running() {
        let mut backend = DummyBackend::new();
        let output = MetadataOutput::new(8);
        let mut stream = output.stream().unwrap();
        backend.begin_configuration();
        backend.add_output(output.attachment());
        backend.commit_configuration();
        let feed = backend.feed();
        let event = DetectionEvent::code(Symbology::Qr, "A", Rect::new(0.4, 0.4, 0.2, 0.2));

        assert_eq!(feed.emit_detections(&[event.clone()]), 0);
        backend.start_running();
        assert_eq!(feed.emit_detections(&[event.clone()]), 1);
        feed.set_interrupted(true);
        assert!(backend.is_interrupted());
        assert_eq!(feed.emit_detections(&[event]), 0);

        assert_eq!(stream.try_next().unwrap().string_value(), Some("A"));
        assert!(stream.try_next().is_none());
    }

    #[test]
    fn removed_output_stops_receiving() {
        let mut backend = DummyBackend::new();
        let output = VideoOutput::new(2);
        backend.begin_configuration();
        backend.add_output(output.attachment());
        backend.commit_configuration();
        backend.start_running();
        let frame = Frame {
            data: vec![0; 4],
            width: 2,
            height: 2,
            timestamp_us: 0,
        };
        let feed = backend.feed();
        assert_eq!(feed.emit_frame(&frame), 1);
        backend.begin_configuration();
        backend.remove_output(output.id());
        backend.commit_configuration();
        assert_eq!(feed.emit_frame(&frame), 0);
    }

    #[tokio::test]
    async fn photo_capture_delivers_placeholder() {
        let mut backend = DummyBackend::new();
        let output = PhotoOutput::new();
        backend.begin_configuration();
        backend.add_output(output.attachment());
        backend.commit_configuration();
        backend.start_running();

        let pending = output.request().unwrap();
        backend
            .capture_photo(pending.request(), output.delegate())
            .unwrap();
        assert_eq!(pending.wait().await.unwrap(), DummyBackend::test_photo());
    }

    #[tokio::test]
    async fn injected_photo_failure_completes_without_value() {
        let mut backend = DummyBackend::new().with_photo_failure("lens covered");
        let output = PhotoOutput::new();
        backend.begin_configuration();
        backend.add_output(output.attachment());
        backend.commit_configuration();
        backend.start_running();

        let pending = output.request().unwrap();
        backend
            .capture_photo(pending.request(), output.delegate())
            .unwrap();
        assert!(matches!(
            pending.wait().await,
            Err(CaptureError::CaptureFailed(_))
        ));
    }

    #[test]
    fn photo_without_photo_output_is_rejected() {
        let mut backend = DummyBackend::new();
        let output = PhotoOutput::new();
        let pending = output.request().unwrap();
        assert!(backend
            .capture_photo(pending.request(), output.delegate())
            .is_err());
    }
}
