// Re-export all types so callers can use `domain::types::*`.
// This keeps the external API flat while organizing code internally.

pub use self::core::*;
pub use trust::*;
pub use config::*;

// Module declarations
mod core;
mod trust;
mod config;
