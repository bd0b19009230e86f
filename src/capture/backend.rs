use crate::capture::error::{CaptureError, Result};
use crate::capture::types::{
    CaptureDevice, CaptureInput, GraphSnapshot, InputId, OutputDescriptor, OutputId,
    SessionPreset,
};
use crate::output::{OutputAttachment, PhotoDelegate, PhotoRequestId};

/// Platform-agnostic capture session.
///
/// A backend owns the hardware session and its graph. It is driven from a
/// single thread by [`CaptureController`](crate::capture::controller::CaptureController),
/// which checks every `can_*` guard before mutating and wraps each mutation
/// in `begin_configuration` / `commit_configuration`. Backends deliver
/// captured data through the delegates in each [`OutputAttachment`], from
/// whatever thread the hardware calls back on.
pub trait CaptureBackend: Send {
    /// Enumerate the devices this backend can bind as inputs.
    fn devices(&self) -> Result<Vec<CaptureDevice>>;

    fn begin_configuration(&mut self);

    fn commit_configuration(&mut self);

    /// Whether `input` is compatible with the current configuration.
    fn can_add_input(&self, input: &CaptureInput) -> bool;

    fn add_input(&mut self, input: CaptureInput);

    fn remove_input(&mut self, id: InputId);

    fn contains_input(&self, id: InputId) -> bool;

    /// Whether `output` is compatible with the current configuration.
    fn can_add_output(&self, output: &OutputDescriptor) -> bool;

    fn add_output(&mut self, output: OutputAttachment);

    fn remove_output(&mut self, id: OutputId);

    fn contains_output(&self, id: OutputId) -> bool;

    fn can_set_preset(&self, preset: SessionPreset) -> bool;

    fn set_preset(&mut self, preset: SessionPreset);

    fn start_running(&mut self);

    fn stop_running(&mut self);

    fn is_running(&self) -> bool;

    /// Whether the hardware has suspended the running session.
    fn is_interrupted(&self) -> bool {
        false
    }

    fn snapshot(&self) -> GraphSnapshot;

    /// Begin a still capture. The result arrives through `delegate`.
    fn capture_photo(&mut self, request: PhotoRequestId, delegate: PhotoDelegate) -> Result<()> {
        let _ = delegate;
        Err(CaptureError::CaptureFailed(format!(
            "{request}: backend has no still-photo support"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::{
        CaptureGraph, DeviceId, DeviceKind, DevicePosition, MediaType, OutputKind,
    };
    use crate::output::PhotoOutput;

    /// Mock backend for testing the trait contract.
    #[derive(Default)]
    struct MockBackend {
        graph: CaptureGraph,
    }

    impl CaptureBackend for MockBackend {
        fn devices(&self) -> Result<Vec<CaptureDevice>> {
            Ok(vec![CaptureDevice {
                id: DeviceId::new("mock:0"),
                model_id: "mock".to_string(),
                name: "Mock Camera".to_string(),
                manufacturer: "Test".to_string(),
                kind: DeviceKind::WideAngle,
                position: DevicePosition::Back,
                media_types: vec![MediaType::Video],
            }])
        }

        fn begin_configuration(&mut self) {}

        fn commit_configuration(&mut self) {}

        fn can_add_input(&self, input: &CaptureInput) -> bool {
            !self.graph.contains_input(input.id)
        }

        fn add_input(&mut self, input: CaptureInput) {
            self.graph.inputs.push(input);
        }

        fn remove_input(&mut self, id: InputId) {
            self.graph.inputs.retain(|i| i.id != id);
        }

        fn contains_input(&self, id: InputId) -> bool {
            self.graph.contains_input(id)
        }

        fn can_add_output(&self, output: &OutputDescriptor) -> bool {
            !self.graph.contains_output(output.id)
        }

        fn add_output(&mut self, output: OutputAttachment) {
            self.graph.outputs.push(output.descriptor);
        }

        fn remove_output(&mut self, id: OutputId) {
            self.graph.outputs.retain(|o| o.id != id);
        }

        fn contains_output(&self, id: OutputId) -> bool {
            self.graph.contains_output(id)
        }

        fn can_set_preset(&self, _preset: SessionPreset) -> bool {
            true
        }

        fn set_preset(&mut self, preset: SessionPreset) {
            self.graph.preset = Some(preset);
        }

        fn start_running(&mut self) {
            self.graph.running = true;
        }

        fn stop_running(&mut self) {
            self.graph.running = false;
        }

        fn is_running(&self) -> bool {
            self.graph.running
        }

        fn snapshot(&self) -> GraphSnapshot {
            self.graph.snapshot()
        }
    }

    #[test]
    fn mock_backend_enumerates_devices() {
        let backend = MockBackend::default();
        let devices = backend.devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "Mock Camera");
    }

    #[test]
    fn mock_backend_tracks_outputs() {
        let mut backend = MockBackend::default();
        let output = PhotoOutput::new();
        let attachment = output.attachment();
        assert!(backend.can_add_output(&attachment.descriptor));
        backend.add_output(attachment);
        assert!(backend.contains_output(output.id()));
        assert_eq!(backend.snapshot().outputs[0].kind, OutputKind::Photo);
    }

    #[test]
    fn default_capture_photo_fails() {
        let mut backend = MockBackend::default();
        let output = PhotoOutput::new();
        let pending = output.request().unwrap();
        let result = backend.capture_photo(pending.request(), output.delegate());
        assert!(matches!(result, Err(CaptureError::CaptureFailed(_))));
        assert!(!backend.is_interrupted());
    }

    #[test]
    fn trait_object_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Box<dyn CaptureBackend>>();
    }
}
