//! Completion Service implementations for Master Mind.
//!
//! All providers implement the `mastermind_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
