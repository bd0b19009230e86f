// Capture domain: devices, authorization, and the serialized capture graph.

pub mod authorization;
pub mod backend;
pub mod controller;
pub mod dummy;
pub mod error;
pub mod types;

pub use authorization::{
    AuthorizationProvider, AuthorizationService, AuthorizationStatus, FixedAuthorization,
};
pub use backend::CaptureBackend;
pub use controller::CaptureController;
pub use dummy::{BracketProbe, BracketStats, DummyBackend, DummyFeed};
pub use error::{CaptureError, Result};
pub use types::{
    default_device, default_device_of, devices_of, CaptureDevice, CaptureGraph, CaptureInput,
    DeviceId, DeviceKind, DevicePosition, GraphSnapshot, InputId, MediaType, OutputDescriptor,
    OutputId, OutputKind, SessionConfiguration, SessionPreset,
};
