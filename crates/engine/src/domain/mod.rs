pub mod anchors;
pub mod certificate;
pub mod chain;
pub mod error;
pub mod policy;
pub mod trust;
pub mod trust_engine;
pub mod trust_settings;
pub mod types;
pub mod verify;
