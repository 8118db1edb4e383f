//! Memory Store implementations for Master Mind.

pub mod in_memory;
pub mod mem0;

pub use in_memory::InMemoryStore;
pub use mem0::Mem0Client;
