use parking_lot::Mutex;
use std::sync::Arc;

use crate::capture::error::Result;
use crate::capture::types::{OutputDescriptor, OutputId, OutputKind};
use crate::diagnostics::stats::BridgeSnapshot;
use crate::geometry::RegionOfInterest;
use crate::output::bridge::{OutputBridge, OutputSink, OutputStream};
use crate::output::detection::{DetectionEvent, DetectionKind};

struct MetadataSettings {
    available: Vec<DetectionKind>,
    requested: Vec<DetectionKind>,
    rect_of_interest: RegionOfInterest,
}

/// Detection output: hardware metadata callbacks become a single-consumer
/// [`DetectionEvent`] sequence.
pub struct MetadataOutput {
    id: OutputId,
    bridge: OutputBridge<DetectionEvent>,
    settings: Arc<Mutex<MetadataSettings>>,
}

impl MetadataOutput {
    pub fn new(capacity: usize) -> Self {
        Self::with_available_kinds(capacity, DetectionKind::ALL.to_vec())
    }

    /// An output whose hardware only reports `available` kinds.
    pub fn with_available_kinds(capacity: usize, available: Vec<DetectionKind>) -> Self {
        let id = OutputId::next();
        Self {
            id,
            bridge: OutputBridge::new(format!("metadata {id}"), capacity),
            settings: Arc::new(Mutex::new(MetadataSettings {
                requested: available.clone(),
                available,
                rect_of_interest: RegionOfInterest::default(),
            })),
        }
    }

    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn descriptor(&self) -> OutputDescriptor {
        OutputDescriptor {
            id: self.id,
            kind: OutputKind::Metadata,
        }
    }

    pub fn available_kinds(&self) -> Vec<DetectionKind> {
        self.settings.lock().available.clone()
    }

    pub fn requested_kinds(&self) -> Vec<DetectionKind> {
        self.settings.lock().requested.clone()
    }

    /// Restrict reported kinds. Kinds the hardware cannot report are
    /// skipped with a warning.
    pub fn set_requested_kinds(&self, kinds: &[DetectionKind]) {
        let mut settings = self.settings.lock();
        let mut requested = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !settings.available.contains(kind) {
                tracing::warn!(target: "output::metadata", "{kind} is not available on {}", self.id);
                continue;
            }
            if !requested.contains(kind) {
                requested.push(*kind);
            }
        }
        tracing::debug!(target: "output::metadata", "{} requests {requested:?}", self.id);
        settings.requested = requested;
    }

    pub fn rect_of_interest(&self) -> RegionOfInterest {
        self.settings.lock().rect_of_interest
    }

    pub fn set_rect_of_interest(&self, region: RegionOfInterest) {
        tracing::debug!(target: "output::metadata", "{} rect of interest {:?}", self.id, region.rect());
        self.settings.lock().rect_of_interest = region;
    }

    /// The single consumer of this output's detections.
    pub fn stream(&self) -> Result<OutputStream<DetectionEvent>> {
        self.bridge.subscribe()
    }

    /// Delivery handle for the backend.
    pub fn delegate(&self) -> MetadataDelegate {
        MetadataDelegate {
            sink: self.bridge.sink(),
            settings: Arc::clone(&self.settings),
        }
    }

    /// Complete the detection sequence.
    pub fn teardown(&self) {
        self.bridge.close();
    }

    pub fn diagnostics(&self) -> BridgeSnapshot {
        self.bridge.diagnostics()
    }
}

/// Callback target handed to the backend. Cheap to clone; safe to call from
/// any thread.
#[derive(Clone)]
pub struct MetadataDelegate {
    sink: OutputSink<DetectionEvent>,
    settings: Arc<Mutex<MetadataSettings>>,
}

impl MetadataDelegate {
    /// Forward one callback's worth of detections, in order.
    ///
    /// Events of unrequested kinds, or centred outside the rect of interest,
    /// are skipped. Returns how many were queued.
    pub fn deliver(&self, events: impl IntoIterator<Item = DetectionEvent>) -> usize {
        let (requested, region) = {
            let settings = self.settings.lock();
            (settings.requested.clone(), settings.rect_of_interest)
        };
        let mut queued = 0;
        for event in events {
            if !requested.contains(&event.kind()) {
                continue;
            }
            if !region.contains(event.bounds().center()) {
                tracing::trace!(target: "output::metadata", "{} outside rect of interest", event.kind());
                continue;
            }
            if self.sink.push(event) {
                queued += 1;
            }
        }
        queued
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::output::detection::{Body, Symbology};

    fn code(value: &str, bounds: Rect) -> DetectionEvent {
        DetectionEvent::code(Symbology::Qr, value, bounds)
    }

    fn centred_code(value: &str) -> DetectionEvent {
        code(value, Rect::new(0.4, 0.4, 0.2, 0.2))
    }

    #[test]
    fn defaults_to_all_kinds_and_full_frame() {
        let output = MetadataOutput::new(8);
        assert_eq!(output.requested_kinds(), DetectionKind::ALL.to_vec());
        assert!(output.rect_of_interest().is_full_frame());
        assert_eq!(output.descriptor().kind, OutputKind::Metadata);
    }

    #[test]
    fn unrequested_kinds_are_filtered() {
        let output = MetadataOutput::new(8);
        output.set_requested_kinds(&[DetectionKind::MachineReadableCode]);
        let mut stream = output.stream().unwrap();
        let body = DetectionEvent::HumanBody(Body {
            body_id: 1,
            bounds: Rect::new(0.4, 0.4, 0.2, 0.2),
        });
        let queued = output.delegate().deliver([body, centred_code("A")]);
        assert_eq!(queued, 1);
        assert_eq!(stream.try_next().unwrap().string_value(), Some("A"));
        assert!(stream.try_next().is_none());
    }

    #[test]
    fn unavailable_kinds_cannot_be_requested() {
        let output = MetadataOutput::with_available_kinds(8, vec![DetectionKind::Face]);
        output.set_requested_kinds(&[DetectionKind::Face, DetectionKind::MachineReadableCode]);
        assert_eq!(output.requested_kinds(), vec![DetectionKind::Face]);
    }

    #[test]
    fn rect_of_interest_limits_delivery() {
        let output = MetadataOutput::new(8);
        output.set_rect_of_interest(RegionOfInterest::new(Rect::new(0.25, 0.25, 0.5, 0.5)));
        let mut stream = output.stream().unwrap();
        let outside = code("corner", Rect::new(0.0, 0.0, 0.1, 0.1));
        output.delegate().deliver([outside, centred_code("middle")]);
        assert_eq!(stream.try_next().unwrap().string_value(), Some("middle"));
        assert!(stream.try_next().is_none());
    }

    #[tokio::test]
    async fn teardown_completes_the_sequence() {
        let output = MetadataOutput::new(8);
        let mut stream = output.stream().unwrap();
        let delegate = output.delegate();
        delegate.deliver([centred_code("last")]);
        output.teardown();
        assert!(delegate.is_closed());
        assert_eq!(delegate.deliver([centred_code("late")]), 0);
        assert_eq!(stream.next().await.unwrap().string_value(), Some("last"));
        assert!(stream.next().await.is_none());
    }
}
