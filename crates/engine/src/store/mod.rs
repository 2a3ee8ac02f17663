pub mod directory;
pub mod identity;
pub mod item;
pub mod keychain;
pub mod memory;
pub mod password;

pub use directory::DirectoryKeychain;
pub use identity::Identity;
pub use item::{Item, ItemClass, ItemId, ItemState, KeychainItem};
pub use keychain::{Keychain, SearchList};
pub use memory::MemoryKeychain;
pub use password::{AuthenticationType, GenericPassword, InternetPassword, Protocol, Secret};
