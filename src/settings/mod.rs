// Persistent configuration.

pub mod store;
pub mod types;

pub use store::ConfigStore;
pub use types::{BridgeSettings, RecognitionSettings, ScanConfig, SessionSettings};
