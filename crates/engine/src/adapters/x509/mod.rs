// OpenSSL-backed platform adapter - re-exports all public interfaces

mod guard;
mod system;
mod verifier;

pub use guard::*;
pub use system::*;
pub use verifier::*;
