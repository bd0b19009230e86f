//! Real-time capture pipeline: a serialized capture graph, bounded output
//! bridges, view/sensor coordinate mapping, and a debounced recognition set.

pub mod capture;
pub mod diagnostics;
pub mod geometry;
pub mod logging;
pub mod output;
pub mod recognition;
pub mod session;
pub mod settings;

pub use capture::{
    AuthorizationProvider, AuthorizationStatus, CaptureBackend, CaptureController,
    CaptureError, DummyBackend, Result,
};
pub use geometry::{ContentMode, CoordinateTransform, Placement, Rect, Size, VideoOrientation};
pub use output::{DetectionEvent, DetectionKind, OutputStream};
pub use recognition::{Identity, RecognitionConfig, RecognitionManager, RecognitionMode};
pub use session::{MetadataScanSession, PhotoCaptureSession, VideoCaptureSession};
pub use settings::{ConfigStore, ScanConfig};
