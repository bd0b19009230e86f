// Outputs: hardware delivery callbacks bridged into single-consumer sequences.

pub mod bridge;
pub mod detection;
pub mod metadata;
pub mod photo;
pub mod video;

pub use bridge::{OutputBridge, OutputSink, OutputStream, DEFAULT_CAPACITY};
pub use detection::{
    Body, DetectionEvent, DetectionKind, Face, MachineReadableCode, Salient, Symbology,
};
pub use metadata::{MetadataDelegate, MetadataOutput};
pub use photo::{PendingPhoto, PhotoDelegate, PhotoOutput, PhotoRequestId};
pub use video::{Frame, VideoDelegate, VideoOutput};

use crate::capture::types::OutputDescriptor;

/// Delivery handle of any output kind, as handed to a backend.
#[derive(Clone)]
pub enum OutputDelegate {
    Metadata(MetadataDelegate),
    Video(VideoDelegate),
    Photo(PhotoDelegate),
}

/// Everything a backend needs to wire an output into the graph.
#[derive(Clone)]
pub struct OutputAttachment {
    pub descriptor: OutputDescriptor,
    pub delegate: OutputDelegate,
}

impl MetadataOutput {
    pub fn attachment(&self) -> OutputAttachment {
        OutputAttachment {
            descriptor: self.descriptor(),
            delegate: OutputDelegate::Metadata(self.delegate()),
        }
    }
}

impl VideoOutput {
    pub fn attachment(&self) -> OutputAttachment {
        OutputAttachment {
            descriptor: self.descriptor(),
            delegate: OutputDelegate::Video(self.delegate()),
        }
    }
}

impl PhotoOutput {
    pub fn attachment(&self) -> OutputAttachment {
        OutputAttachment {
            descriptor: self.descriptor(),
            delegate: OutputDelegate::Photo(self.delegate()),
        }
    }
}
