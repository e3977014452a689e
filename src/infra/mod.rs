//! Infrastructure adapters.

pub mod repository;

pub use repository::{InMemoryMessageRepository, MessageRepository};
