//! Hosted Mem0 REST client.
//!
//! Graph-enabled searches use the v2 search endpoint, which takes an
//! `AND`-composed filter tree and returns `{results, relations}`. Basic
//! searches fall back to the v1 endpoint with flat filters.

use async_trait::async_trait;
use mastermind_config::{ConfigError, MemoryStoreConfig};
use mastermind_core::error::MemoryError;
use mastermind_core::memory::{AddAck, AddRequest, MemoryStore, SearchPayload, SearchRequest};
use tracing::{debug, warn};

/// A Memory Store backed by the hosted Mem0 API.
pub struct Mem0Client {
    base_url: String,
    api_key: String,
    org_id: Option<String>,
    project_id: Option<String>,
    client: reqwest::Client,
}

impl Mem0Client {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, MemoryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MemoryError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            org_id: None,
            project_id: None,
            client,
        })
    }

    /// Build from the `[memory]` config section.
    ///
    /// A missing API key is a configuration error, fatal at startup.
    pub fn from_config(config: &MemoryStoreConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("MEM0_API_KEY"))?;
        let mut client = Self::new(
            &config.api_url,
            api_key,
            std::time::Duration::from_secs(config.timeout_secs),
        )
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        client.org_id = config.org_id.clone();
        client.project_id = config.project_id.clone();
        Ok(client)
    }

    /// Endpoint path and JSON body for a search.
    fn search_body(&self, request: &SearchRequest) -> (&'static str, serde_json::Value) {
        let (path, mut body) = if request.graph_enabled {
            let mut clauses = vec![serde_json::json!({ "user_id": request.user_id })];
            clauses.extend(
                request
                    .filters
                    .iter()
                    .map(|(key, value)| serde_json::json!({ key.as_str(): value })),
            );
            (
                "/v2/memories/search/",
                serde_json::json!({
                    "query": request.query,
                    "filters": { "AND": clauses },
                    "top_k": request.limit,
                    "enable_graph": true,
                    "output_format": "v1.1",
                }),
            )
        } else {
            let mut body = serde_json::json!({
                "query": request.query,
                "user_id": request.user_id,
                "limit": request.limit,
                "output_format": "v1.0",
            });
            if !request.filters.is_empty() {
                body["filters"] = serde_json::json!(request.filters);
            }
            ("/v1/memories/search/", body)
        };

        self.scope(&mut body);
        (path, body)
    }

    fn add_body(&self, request: &AddRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "messages": request.messages,
            "user_id": request.user_id,
            "metadata": request.metadata,
            "enable_graph": request.graph_enabled,
            "output_format": if request.graph_enabled { "v1.1" } else { "v1.0" },
        });
        if let Some(app_id) = &request.app_id {
            body["app_id"] = serde_json::json!(app_id);
        }
        if let Some(run_id) = &request.run_id {
            body["run_id"] = serde_json::json!(run_id);
        }
        self.scope(&mut body);
        body
    }

    /// Attach organization/project scoping when configured.
    fn scope(&self, body: &mut serde_json::Value) {
        if let Some(org_id) = &self.org_id {
            body["org_id"] = serde_json::json!(org_id);
        }
        if let Some(project_id) = &self.project_id {
            body["project_id"] = serde_json::json!(project_id);
        }
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, MemoryError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| MemoryError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(MemoryError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, path, body = %error_body, "Memory store returned error");
            return Err(MemoryError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| MemoryError::Decode(e.to_string()))
    }
}

/// Collect `id` fields from an add response (bare list or `{results: [...]}`).
fn created_ids(raw: &serde_json::Value) -> Vec<String> {
    let items = raw
        .as_array()
        .or_else(|| raw.get("results").and_then(|r| r.as_array()));
    items
        .map(|arr| {
            arr.iter()
                .filter_map(|item| item.get("id").and_then(|id| id.as_str()))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl MemoryStore for Mem0Client {
    fn name(&self) -> &str {
        "mem0"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPayload, MemoryError> {
        let (path, body) = self.search_body(request);
        debug!(
            path,
            limit = request.limit,
            graph = request.graph_enabled,
            filters = request.filters.len(),
            "Searching memory store"
        );

        let raw = self.post(path, &body).await?;
        serde_json::from_value(raw).map_err(|e| MemoryError::Decode(e.to_string()))
    }

    async fn add(&self, request: AddRequest) -> Result<AddAck, MemoryError> {
        let body = self.add_body(&request);
        debug!(
            messages = request.messages.len(),
            graph = request.graph_enabled,
            "Adding memories"
        );

        let raw = self.post("/v1/memories/", &body).await?;
        Ok(AddAck {
            ids: created_ids(&raw),
            raw,
        })
    }
}
