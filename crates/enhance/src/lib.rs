//! Prompt enhancement pipeline for Master Mind.
//!
//! ```text
//! prompt ─► normalize ─► strategy selection ─► context ─► completion ─► guardrails
//!                                                  │
//!                                                  └─ empty ─► cleaned prompt
//! ```
//!
//! Every stage is a function of its inputs plus the two collaborators
//! (`MemoryStore`, `Provider`); nothing is cached between calls.

pub mod completion;
pub mod context;
pub mod guardrails;
pub mod normalize;
pub mod pipeline;
pub mod strategy;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use completion::{CompletionMode, LengthBudget};
pub use context::Context;
pub use guardrails::{Correction, GuardrailOutcome};
pub use normalize::normalize;
pub use pipeline::{EnhanceRequest, EnhancementResult, Enhancer, MemoryResult, SearchMemoriesRequest};
pub use strategy::{SearchStrategy, Selection, StrategyScope};
