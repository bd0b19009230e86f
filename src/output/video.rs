use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capture::error::Result;
use crate::capture::types::{OutputDescriptor, OutputId, OutputKind};
use crate::diagnostics::stats::BridgeSnapshot;
use crate::output::bridge::{OutputBridge, OutputSink, OutputStream};

/// A single raw frame from the sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Capture timestamp in microseconds.
    pub timestamp_us: u64,
}

/// Raw-frame output.
///
/// By default late frames are discarded: a slow consumer only ever sees the
/// newest frame instead of a backlog.
pub struct VideoOutput {
    id: OutputId,
    bridge: OutputBridge<Frame>,
    discards_late_frames: Arc<AtomicBool>,
}

impl VideoOutput {
    pub fn new(capacity: usize) -> Self {
        let id = OutputId::next();
        Self {
            id,
            bridge: OutputBridge::new(format!("video {id}"), capacity),
            discards_late_frames: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn descriptor(&self) -> OutputDescriptor {
        OutputDescriptor {
            id: self.id,
            kind: OutputKind::Video,
        }
    }

    pub fn always_discards_late_frames(&self) -> bool {
        self.discards_late_frames.load(Ordering::Relaxed)
    }

    pub fn set_always_discards_late_frames(&self, discard: bool) {
        self.discards_late_frames.store(discard, Ordering::Relaxed);
    }

    pub fn stream(&self) -> Result<OutputStream<Frame>> {
        self.bridge.subscribe()
    }

    pub fn delegate(&self) -> VideoDelegate {
        VideoDelegate {
            sink: self.bridge.sink(),
            discards_late_frames: Arc::clone(&self.discards_late_frames),
        }
    }

    pub fn teardown(&self) {
        self.bridge.close();
    }

    pub fn diagnostics(&self) -> BridgeSnapshot {
        self.bridge.diagnostics()
    }
}

#[derive(Clone)]
pub struct VideoDelegate {
    sink: OutputSink<Frame>,
    discards_late_frames: Arc<AtomicBool>,
}

impl VideoDelegate {
    /// Hand a frame to the consumer. Returns false once the output is torn
    /// down.
    pub fn deliver(&self, frame: Frame) -> bool {
        if self.discards_late_frames.load(Ordering::Relaxed) {
            self.sink.push_latest(frame)
        } else {
            self.sink.push(frame)
        }
    }
}
