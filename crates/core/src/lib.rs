//! # Master Mind Core
//!
//! Domain types, collaborator traits, and error definitions for the
//! Master Mind prompt enhancer. This crate has **zero framework
//! dependencies**: it defines the model that every other crate
//! implements against.
//!
//! ## Collaborators
//!
//! The enhancement pipeline talks to two external services, each defined as
//! a trait here with implementations in their own crates:
//! - [`MemoryStore`] — per-user associative memory with an optional relation graph
//! - [`Provider`] — chat-completion text generation

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ProviderError, Result};
pub use memory::{
    AddAck, AddRequest, MemoryMetadata, MemoryRecord, MemoryStore, RelationRecord, SearchPayload,
    SearchRequest,
};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
