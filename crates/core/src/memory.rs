//! Memory Store trait — per-user associative memory with an optional
//! relation graph.
//!
//! The store is an external collaborator: the pipeline only reads from it
//! (via [`MemoryStore::search`]) while the surrounding service may write to
//! it (via [`MemoryStore::add`]). Search results come back in one of two
//! shapes, captured by [`SearchPayload`]:
//! - a bare list of memory records (basic search), or
//! - an object with `results` and `relations` (graph-enabled search).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::MemoryError;
use crate::message::Message;

/// Metadata attached to a stored memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// The nested `{"message": {"content": ...}}` shape some records carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A single memory record as returned by the store.
///
/// Stores disagree on where the text lives, so every field is optional;
/// use [`MemoryRecord::text`] to get at the content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<RecordMessage>,

    /// Relevance score (set by search operations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MemoryMetadata>,
}

impl MemoryRecord {
    /// A record holding plain content.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// The first nonempty of `content`, `memory`, `text`, `message.content`, trimmed.
    pub fn text(&self) -> Option<&str> {
        let nested = self.message.as_ref().and_then(|m| m.content.as_deref());
        [
            self.content.as_deref(),
            self.memory.as_deref(),
            self.text.as_deref(),
            nested,
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
    }
}

/// An edge in the lightweight knowledge graph returned alongside memories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub source: String,

    #[serde(default, deserialize_with = "string_or_empty")]
    pub relationship: String,

    #[serde(default, deserialize_with = "string_or_empty")]
    pub target: String,

    #[serde(default, deserialize_with = "string_or_empty")]
    pub target_type: String,

    /// Confidence score
    #[serde(default, deserialize_with = "number_or_zero")]
    pub score: f64,
}

impl RelationRecord {
    pub fn new(
        source: impl Into<String>,
        relationship: impl Into<String>,
        target: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            source: source.into(),
            relationship: relationship.into(),
            target: target.into(),
            target_type: String::new(),
            score,
        }
    }

    pub fn with_target_type(mut self, target_type: impl Into<String>) -> Self {
        self.target_type = target_type.into();
        self
    }
}

fn string_or_empty<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// Numbers and numeric strings; anything else scores zero.
fn number_or_zero<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(match &value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or_default(),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

/// Decode each list entry on its own, skipping entries that are not
/// objects or do not fit `T`, so one bad entry cannot sink the payload.
fn lenient_list<'de, D, T>(d: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = Option::<Vec<serde_json::Value>>::deserialize(d)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .filter(serde_json::Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// What a search returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchPayload {
    /// A bare list of records.
    Records(#[serde(deserialize_with = "lenient_list")] Vec<MemoryRecord>),
    /// Records plus relation edges.
    Graph {
        #[serde(default, deserialize_with = "lenient_list")]
        results: Vec<MemoryRecord>,
        #[serde(default, deserialize_with = "lenient_list")]
        relations: Vec<RelationRecord>,
    },
}

impl Default for SearchPayload {
    fn default() -> Self {
        SearchPayload::Records(Vec::new())
    }
}

impl SearchPayload {
    pub fn results(&self) -> &[MemoryRecord] {
        match self {
            SearchPayload::Records(records) => records,
            SearchPayload::Graph { results, .. } => results,
        }
    }

    pub fn relations(&self) -> &[RelationRecord] {
        match self {
            SearchPayload::Records(_) => &[],
            SearchPayload::Graph { relations, .. } => relations,
        }
    }

    /// Records plus relations.
    pub fn len(&self) -> usize {
        self.results().len() + self.relations().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the payload, keeping only the records.
    pub fn into_results(self) -> Vec<MemoryRecord> {
        match self {
            SearchPayload::Records(records) => records,
            SearchPayload::Graph { results, .. } => results,
        }
    }
}

/// A single search call against the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// The search text
    pub query: String,

    /// Whose memories to search
    pub user_id: String,

    /// Maximum number of results
    pub limit: usize,

    /// Equality filters on memory metadata (e.g. `app_id`, `run_id`)
    #[serde(default)]
    pub filters: BTreeMap<String, String>,

    /// Ask for relation edges alongside records
    #[serde(default)]
    pub graph_enabled: bool,
}

/// A request to store new memories derived from messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddRequest {
    pub messages: Vec<Message>,

    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub graph_enabled: bool,
}

/// Acknowledgement from a successful `add`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddAck {
    /// IDs of memories created, when the store reports them
    #[serde(default)]
    pub ids: Vec<String>,

    /// The store's raw response body
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// The core MemoryStore trait.
///
/// Implementations: hosted Mem0 REST client, in-memory (for tests and local runs).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The store name (e.g., "mem0", "in_memory").
    fn name(&self) -> &str;

    /// Search a user's memories.
    async fn search(&self, request: &SearchRequest)
    -> std::result::Result<SearchPayload, MemoryError>;

    /// Store new memories for a user.
    async fn add(&self, request: AddRequest) -> std::result::Result<AddAck, MemoryError>;
}
