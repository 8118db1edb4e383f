//! Retrieval strategies and the ordered fallback chain that tries them.
//!
//! A strategy is a plain value describing one search attempt. The chain is
//! walked strictly in order and stops at the first strategy that returns
//! anything; a strategy that errors counts as "no results" and is not retried.

use std::collections::BTreeMap;

use mastermind_core::memory::{MemoryStore, SearchPayload, SearchRequest};
use serde::Serialize;
use tracing::{debug, info, warn};

/// How wide a strategy searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyScope {
    /// Memories tagged with one app
    AppWide,
    /// Everything the user has
    UserWide,
    /// Plain search without graph features
    Basic,
}

/// One retrieval attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchStrategy {
    pub name: &'static str,
    pub scope: StrategyScope,
    pub graph_enabled: bool,
    pub filters: BTreeMap<String, String>,
}

impl SearchStrategy {
    /// The app this strategy is scoped to, if any.
    pub fn app_id(&self) -> Option<&str> {
        self.filters.get("app_id").map(String::as_str)
    }

    /// The store request for this strategy.
    pub fn request(&self, query: &str, user_id: &str, limit: usize) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            user_id: user_id.to_string(),
            limit,
            filters: self.filters.clone(),
            graph_enabled: self.graph_enabled,
        }
    }
}

fn app_filter(app_id: Option<&str>) -> BTreeMap<String, String> {
    app_id
        .map(|id| BTreeMap::from([("app_id".to_string(), id.to_string())]))
        .unwrap_or_default()
}

/// The ordered strategy list for a call.
///
/// App-scoped graph search comes first when an app is given, then a
/// user-wide graph search, then a basic search for stores without graph
/// support. An empty `app_id` counts as absent.
pub fn plan(app_id: Option<&str>) -> Vec<SearchStrategy> {
    let app_id = app_id.filter(|id| !id.is_empty());
    let mut strategies = Vec::with_capacity(3);

    if app_id.is_some() {
        strategies.push(SearchStrategy {
            name: "app_wide_graph",
            scope: StrategyScope::AppWide,
            graph_enabled: true,
            filters: app_filter(app_id),
        });
    }

    strategies.push(SearchStrategy {
        name: "user_wide_graph",
        scope: StrategyScope::UserWide,
        graph_enabled: true,
        filters: BTreeMap::new(),
    });

    strategies.push(SearchStrategy {
        name: "basic_search",
        scope: StrategyScope::Basic,
        graph_enabled: false,
        filters: app_filter(app_id),
    });

    strategies
}

/// The outcome of walking the chain.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// The first strategy that returned something
    pub strategy: Option<SearchStrategy>,
    pub payload: SearchPayload,
}

impl Selection {
    /// Strategy name, or `"none"` when every attempt came back empty.
    pub fn strategy_name(&self) -> &str {
        self.strategy.as_ref().map_or("none", |s| s.name)
    }

    pub fn graph_enabled(&self) -> bool {
        self.strategy.as_ref().is_some_and(|s| s.graph_enabled)
    }

    /// App scope of the winning strategy, used to filter relations.
    pub fn app_id(&self) -> Option<&str> {
        self.strategy.as_ref().and_then(SearchStrategy::app_id)
    }
}

/// Try each strategy in order until one returns a nonempty payload.
pub async fn select(
    store: &dyn MemoryStore,
    strategies: &[SearchStrategy],
    query: &str,
    user_id: &str,
    limit: usize,
) -> Selection {
    for (i, strategy) in strategies.iter().enumerate() {
        debug!(
            strategy = strategy.name,
            attempt = i + 1,
            total = strategies.len(),
            "Trying retrieval strategy"
        );

        match store.search(&strategy.request(query, user_id, limit)).await {
            Ok(payload) if !payload.is_empty() => {
                info!(
                    strategy = strategy.name,
                    attempt = i + 1,
                    results = payload.len(),
                    "Retrieval strategy selected"
                );
                return Selection {
                    strategy: Some(strategy.clone()),
                    payload,
                };
            }
            Ok(_) => {
                debug!(strategy = strategy.name, "Strategy returned nothing, trying next");
            }
            Err(e) => {
                warn!(
                    strategy = strategy.name,
                    store = store.name(),
                    error = %e,
                    "Strategy failed, trying next"
                );
            }
        }
    }

    info!(total = strategies.len(), "No strategy returned memories");
    Selection::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedMemoryStore;
    use mastermind_core::error::MemoryError;
    use mastermind_core::memory::MemoryRecord;

    fn names(strategies: &[SearchStrategy]) -> Vec<&'static str> {
        strategies.iter().map(|s| s.name).collect()
    }

    fn one_record(text: &str) -> SearchPayload {
        SearchPayload::Records(vec![MemoryRecord::with_content(text)])
    }

    #[test]
    fn plan_with_app_has_three_strategies() {
        let strategies = plan(Some("orion"));
        assert_eq!(
            names(&strategies),
            vec!["app_wide_graph", "user_wide_graph", "basic_search"]
        );
        assert_eq!(strategies[0].app_id(), Some("orion"));
        assert!(strategies[0].graph_enabled);
        assert!(strategies[1].filters.is_empty());
        assert!(!strategies[2].graph_enabled);
        assert_eq!(strategies[2].app_id(), Some("orion"));
    }

    #[test]
    fn plan_without_app_skips_app_scope() {
        for app_id in [None, Some("")] {
            let strategies = plan(app_id);
            assert_eq!(names(&strategies), vec!["user_wide_graph", "basic_search"]);
            assert!(strategies.iter().all(|s| s.filters.is_empty()));
        }
    }

    #[test]
    fn request_carries_strategy_settings() {
        let request = plan(Some("orion"))[0].request("Sara is", "u1", 5);
        assert_eq!(request.query, "Sara is");
        assert_eq!(request.limit, 5);
        assert!(request.graph_enabled);
        assert_eq!(request.filters.get("app_id").map(String::as_str), Some("orion"));
    }

    #[tokio::test]
    async fn first_nonempty_strategy_wins_and_later_ones_are_skipped() {
        let store = ScriptedMemoryStore::new(vec![
            Ok(SearchPayload::default()),
            Ok(one_record("from B")),
            Ok(one_record("from C")),
        ]);
        let strategies = plan(Some("orion"));

        let selection = select(&store, &strategies, "q", "u1", 5).await;

        assert_eq!(selection.strategy_name(), "user_wide_graph");
        assert_eq!(selection.payload.results()[0].text(), Some("from B"));
        assert_eq!(store.call_count(), 2);
    }

    #[tokio::test]
    async fn errors_fall_through_to_next_strategy() {
        let store = ScriptedMemoryStore::new(vec![
            Err(MemoryError::Network("down".into())),
            Ok(one_record("basic hit")),
        ]);
        let strategies = plan(None);

        let selection = select(&store, &strategies, "q", "u1", 5).await;

        assert_eq!(selection.strategy_name(), "basic_search");
        assert!(!selection.graph_enabled());
        let requests = store.requests();
        assert!(requests[0].graph_enabled);
        assert!(!requests[1].graph_enabled);
    }

    #[tokio::test]
    async fn exhausted_chain_selects_nothing() {
        let store = ScriptedMemoryStore::new(vec![
            Err(MemoryError::Decode("bad".into())),
            Ok(SearchPayload::default()),
            Err(MemoryError::AuthenticationFailed("nope".into())),
        ]);

        let selection = select(&store, &plan(Some("orion")), "q", "u1", 5).await;

        assert!(selection.strategy.is_none());
        assert_eq!(selection.strategy_name(), "none");
        assert!(!selection.graph_enabled());
        assert!(selection.payload.is_empty());
        assert_eq!(store.call_count(), 3);
    }

    #[test]
    fn strategy_serializes_scope_in_snake_case() {
        let json = serde_json::to_value(&plan(Some("orion"))[0]).unwrap();
        assert_eq!(json["scope"], "app_wide");
        assert_eq!(json["name"], "app_wide_graph");
    }
}
