//! Storage abstraction over the document-store collaborator

pub mod memory;
pub mod traits;

pub use memory::InMemoryStorage;
pub use traits::{StatusUpdate, Storage};
