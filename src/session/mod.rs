// Ready-made capture sessions: device input, one output, preview, and the
// permission gate wired together.

pub mod metadata;
pub mod photo;
pub mod preview;
mod shared;
pub mod video;

pub use metadata::MetadataScanSession;
pub use photo::PhotoCaptureSession;
pub use preview::{PreviewHandle, PreviewLayer};
pub use video::VideoCaptureSession;
