//! # Adapters Module
//!
//! Infrastructure adapters implementing the outbound ports.

pub mod completion;
pub mod firmware_memory;
pub mod key_store;
pub mod software_backend;

pub use completion::ChannelCompletionSink;
pub use firmware_memory::InMemoryFirmwareMemory;
pub use key_store::InMemoryKeyStore;
pub use software_backend::SoftwareBackend;
