// Delivery statistics for output bridges.

pub mod stats;

pub use stats::{BridgeSnapshot, BridgeStats};
