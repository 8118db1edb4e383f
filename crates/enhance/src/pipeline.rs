//! The pipeline boundary consumed by the HTTP layer.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use mastermind_core::error::{Error, Result};
use mastermind_core::memory::{MemoryMetadata, MemoryRecord, MemoryStore, SearchRequest};
use mastermind_core::provider::Provider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::completion;
use crate::context::Context;
use crate::normalize::normalize;
use crate::strategy;

/// A request to enhance one prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceRequest {
    pub prompt: String,
    pub user_id: String,
    #[serde(default)]
    pub app_id: Option<String>,
    /// Logged for correlation only, never used as a filter.
    #[serde(default)]
    pub run_id: Option<String>,
    pub limit: usize,
}

/// What `enhance` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementResult {
    pub enhanced_prompt: String,
    /// Records plus relations returned by the winning strategy
    pub memories_used: usize,
    /// Wall time in seconds, rounded to milliseconds
    pub processing_time: f64,
    pub strategy_used: String,
    pub graph_enabled: bool,
}

/// A direct memory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMemoriesRequest {
    pub query: String,
    pub user_id: String,
    pub limit: usize,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
}

/// One normalized search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryResult {
    pub id: Option<String>,
    pub content: Option<String>,
    pub score: Option<f64>,
    pub metadata: Option<MemoryMetadata>,
}

impl From<MemoryRecord> for MemoryResult {
    fn from(record: MemoryRecord) -> Self {
        Self {
            id: record.id,
            content: record.content.filter(|c| !c.is_empty()).or(record.memory),
            score: record.score,
            metadata: record.metadata,
        }
    }
}

fn round_millis(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// Runs the enhancement pipeline against a Memory Store and a Completion Service.
pub struct Enhancer {
    memory: Arc<dyn MemoryStore>,
    provider: Arc<dyn Provider>,
    model: String,
}

impl Enhancer {
    pub fn new(
        memory: Arc<dyn MemoryStore>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            memory,
            provider,
            model: model.into(),
        }
    }

    /// Enhance a prompt with the user's memories.
    ///
    /// Retrieval and completion failures degrade to the cleaned prompt;
    /// only a malformed request is an error.
    pub async fn enhance(&self, request: EnhanceRequest) -> Result<EnhancementResult> {
        if request.user_id.is_empty() {
            return Err(Error::InvalidRequest("user_id must not be empty".into()));
        }
        if request.limit == 0 {
            return Err(Error::InvalidRequest("limit must be at least 1".into()));
        }

        let started = Instant::now();
        let cleaned = normalize(&request.prompt);

        debug!(
            user_id = %request.user_id,
            app_id = ?request.app_id,
            run_id = ?request.run_id,
            limit = request.limit,
            "Enhancing prompt"
        );

        let strategies = strategy::plan(request.app_id.as_deref());
        let selection = strategy::select(
            self.memory.as_ref(),
            &strategies,
            &cleaned,
            &request.user_id,
            request.limit,
        )
        .await;

        let context = Context::build(&selection.payload, selection.app_id());

        let enhanced_prompt = if context.is_empty() {
            cleaned
        } else {
            completion::complete_with_context(
                self.provider.as_ref(),
                &self.model,
                &cleaned,
                &context.render(),
            )
            .await
        };

        let result = EnhancementResult {
            enhanced_prompt,
            memories_used: if context.is_empty() {
                0
            } else {
                selection.payload.len()
            },
            processing_time: round_millis(started.elapsed().as_secs_f64()),
            strategy_used: selection.strategy_name().to_string(),
            graph_enabled: selection.graph_enabled(),
        };

        info!(
            strategy_used = %result.strategy_used,
            memories_used = result.memories_used,
            processing_time = result.processing_time,
            "Enhancement complete"
        );

        Ok(result)
    }

    /// Look up memories directly: one graph-enabled search, no fallback.
    ///
    /// Store errors propagate.
    pub async fn search(&self, request: SearchMemoriesRequest) -> Result<Vec<MemoryResult>> {
        let mut filters = BTreeMap::new();
        if let Some(app_id) = request.app_id.filter(|a| !a.is_empty()) {
            filters.insert("app_id".to_string(), app_id);
        }
        if let Some(run_id) = request.run_id.filter(|r| !r.is_empty()) {
            filters.insert("run_id".to_string(), run_id);
        }

        let search = SearchRequest {
            query: request.query,
            user_id: request.user_id,
            limit: request.limit,
            filters,
            graph_enabled: true,
        };

        let payload = self.memory.search(&search).await?;
        let mut results: Vec<MemoryResult> =
            payload.into_results().into_iter().map(MemoryResult::from).collect();
        results.truncate(request.limit);

        debug!(results = results.len(), "Memory search complete");
        Ok(results)
    }
}
