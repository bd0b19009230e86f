// Recognized-object lifecycle: identity, debounced expiry, placements.

pub mod identity;
pub mod manager;
pub mod set;

pub use identity::{Identity, IdentityPolicy, DEFAULT_FALLBACK_IDENTITY};
pub use manager::{RecognitionConfig, RecognitionManager, MULTI_EXPIRY, SINGLE_EXPIRY};
pub use set::{RecognitionMode, RecognizedEntry, RecognizedSet, Sighting};
