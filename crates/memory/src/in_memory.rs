//! In-memory store, useful for tests and local runs without a Mem0 account.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use mastermind_core::error::MemoryError;
use mastermind_core::memory::{
    AddAck, AddRequest, MemoryMetadata, MemoryRecord, MemoryStore, RelationRecord, SearchPayload,
    SearchRequest,
};
use mastermind_core::message::Role;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct UserMemories {
    records: Vec<MemoryRecord>,
    /// Relations tagged with the app they were learned in.
    relations: Vec<(Option<String>, RelationRecord)>,
}

/// A per-user store that keeps records and relation edges in a HashMap.
///
/// Scoring is plain keyword overlap: the fraction of query terms found in
/// the record text.
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<String, UserMemories>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a record for a user, assigning an ID when it has none.
    pub async fn insert_record(&self, user_id: &str, mut record: MemoryRecord) -> String {
        let id = record
            .id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();
        self.users
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .records
            .push(record);
        id
    }

    /// Store a relation edge for a user, optionally scoped to an app.
    pub async fn insert_relation(
        &self,
        user_id: &str,
        app_id: Option<&str>,
        relation: RelationRecord,
    ) {
        self.users
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .relations
            .push((app_id.map(String::from), relation));
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of query terms present in `haystack`.
fn overlap(query_terms: &[String], haystack: &str) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let haystack = terms(haystack);
    let hits = query_terms.iter().filter(|t| haystack.contains(t)).count();
    hits as f64 / query_terms.len() as f64
}

fn metadata_matches(metadata: Option<&MemoryMetadata>, filters: &BTreeMap<String, String>) -> bool {
    filters.iter().all(|(key, wanted)| {
        let value = metadata.and_then(|m| match key.as_str() {
            "app_id" => m.app_id.as_deref(),
            "assignment_id" => m.assignment_id.as_deref(),
            "run_id" => m.run_id.as_deref(),
            "source" => m.source.as_deref(),
            _ => None,
        });
        value == Some(wanted.as_str())
    })
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPayload, MemoryError> {
        let users = self.users.read().await;
        let Some(user) = users.get(&request.user_id) else {
            return Ok(if request.graph_enabled {
                SearchPayload::Graph {
                    results: Vec::new(),
                    relations: Vec::new(),
                }
            } else {
                SearchPayload::Records(Vec::new())
            });
        };

        let query_terms = terms(&request.query);

        let mut results: Vec<MemoryRecord> = user
            .records
            .iter()
            .filter(|r| metadata_matches(r.metadata.as_ref(), &request.filters))
            .filter_map(|r| {
                let score = overlap(&query_terms, r.text()?);
                (score > 0.0).then(|| MemoryRecord {
                    score: Some(score),
                    ..r.clone()
                })
            })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(request.limit);

        if !request.graph_enabled {
            return Ok(SearchPayload::Records(results));
        }

        let app_filter = request.filters.get("app_id");
        let mut relations: Vec<RelationRecord> = user
            .relations
            .iter()
            .filter(|(app_id, _)| app_filter.is_none() || app_id.as_ref() == app_filter)
            .filter(|(_, r)| {
                let edge = format!("{} {} {}", r.source, r.relationship, r.target);
                overlap(&query_terms, &edge) > 0.0
            })
            .map(|(_, r)| r.clone())
            .collect();
        relations.truncate(request.limit);

        Ok(SearchPayload::Graph { results, relations })
    }

    async fn add(&self, request: AddRequest) -> Result<AddAck, MemoryError> {
        let source = request
            .metadata
            .get("source")
            .and_then(|v| v.as_str())
            .map(String::from);

        let mut ids = Vec::new();
        for message in request.messages.iter().filter(|m| m.role == Role::User) {
            let record = MemoryRecord {
                memory: Some(message.content.clone()),
                metadata: Some(MemoryMetadata {
                    app_id: request.app_id.clone(),
                    run_id: request.run_id.clone(),
                    source: source.clone(),
                    ..MemoryMetadata::default()
                }),
                ..MemoryRecord::default()
            };
            ids.push(self.insert_record(&request.user_id, record).await);
        }

        let raw = serde_json::json!({
            "results": ids
                .iter()
                .map(|id| serde_json::json!({ "id": id, "event": "ADD" }))
                .collect::<Vec<_>>(),
        });
        Ok(AddAck { ids, raw })
    }
}
