//! Context building from memory records and relation edges.
//!
//! Records become `Memory: <text>` segments. Relations are filtered by
//! confidence and app scope, bucketed by verb, and rendered as short
//! sentences. Memory segments always come first, then relations in
//! bucket order work, assignment, project.

use mastermind_core::memory::{RelationRecord, SearchPayload};
use tracing::debug;

/// Relations scoring below this are dropped.
pub const MIN_RELATION_SCORE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Category {
    Work,
    Assignment,
    Project,
}

type Render = fn(&Edge<'_>) -> String;

/// Verb lookup: category plus renderer.
const VERBS: &[(&str, Category, Render)] = &[
    ("starting_work_on", Category::Work, render_starting_work),
    ("working_on", Category::Work, render_working_on),
    ("developing", Category::Work, render_plain),
    ("initiated_assignment", Category::Assignment, render_initiated),
    ("assigned_to", Category::Assignment, render_plain),
    ("assignment", Category::Assignment, render_assignment),
    ("is_related_to", Category::Project, render_related),
];

/// A relation with its fields trimmed.
struct Edge<'a> {
    source: &'a str,
    relationship: &'a str,
    target: &'a str,
    target_type: &'a str,
}

impl<'a> Edge<'a> {
    fn new(relation: &'a RelationRecord) -> Self {
        Self {
            source: relation.source.trim(),
            relationship: relation.relationship.trim(),
            target: relation.target.trim(),
            target_type: relation.target_type.trim(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.source.is_empty() && !self.relationship.is_empty() && !self.target.is_empty()
    }

    fn mentions(&self, app_id: &str) -> bool {
        let app_id = app_id.to_lowercase();
        self.source.to_lowercase() == app_id || self.target.to_lowercase() == app_id
    }

    fn kind(&self) -> &str {
        if self.target_type.is_empty() {
            "project"
        } else {
            self.target_type
        }
    }

    fn classify(&self) -> Option<(Category, Render)> {
        VERBS
            .iter()
            .find(|(verb, _, _)| *verb == self.relationship)
            .map(|&(_, category, render)| (category, render))
            .or_else(|| {
                (self.target_type == "project")
                    .then_some((Category::Project, render_plain as Render))
            })
    }
}

fn render_starting_work(e: &Edge<'_>) -> String {
    format!(
        "{} is currently starting work on the {} {}",
        e.source,
        e.target,
        e.kind()
    )
}

fn render_working_on(e: &Edge<'_>) -> String {
    format!("{} is actively working on the {} {}", e.source, e.target, e.kind())
}

fn render_initiated(e: &Edge<'_>) -> String {
    format!(
        "{} initiated assignment for the {} {}",
        e.source,
        e.target,
        e.kind()
    )
}

fn render_assignment(e: &Edge<'_>) -> String {
    format!("{} has assignment relationship with {}", e.source, e.target)
}

fn render_related(e: &Edge<'_>) -> String {
    format!("{} is related to {} {}", e.source, e.target, e.kind())
}

fn render_plain(e: &Edge<'_>) -> String {
    format!(
        "{} {} {}",
        e.source,
        e.relationship.replace('_', " "),
        e.target
    )
}

/// The assembled context for one enhancement call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    memories: Vec<String>,
    relations: Vec<String>,
    /// Relations seen but not rendered
    pub relations_dropped: usize,
}

impl Context {
    /// Build context from a search payload, optionally scoped to an app.
    pub fn build(payload: &SearchPayload, app_id: Option<&str>) -> Self {
        let memories: Vec<String> = payload
            .results()
            .iter()
            .filter_map(|record| record.text())
            .map(|text| format!("Memory: {text}"))
            .collect();

        let mut buckets: Vec<(Category, String)> = Vec::new();
        let mut dropped = 0;

        for relation in payload.relations() {
            let edge = Edge::new(relation);

            let keep = edge.is_complete()
                && relation.score >= MIN_RELATION_SCORE
                && app_id.is_none_or(|app| edge.mentions(app));

            match edge.classify().filter(|_| keep) {
                Some((category, render)) => buckets.push((category, render(&edge))),
                None => dropped += 1,
            }
        }

        // Stable: input order survives within a bucket.
        buckets.sort_by_key(|(category, _)| *category);

        let context = Self {
            memories,
            relations: buckets.into_iter().map(|(_, s)| s).collect(),
            relations_dropped: dropped,
        };

        debug!(
            memory_segments = context.memories.len(),
            relation_segments = context.relations.len(),
            relations_dropped = context.relations_dropped,
            context_len = context.render().chars().count(),
            "Context built"
        );

        context
    }

    /// Segments in output order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.memories
            .iter()
            .chain(self.relations.iter())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty() && self.relations.is_empty()
    }

    /// The newline-joined context text.
    pub fn render(&self) -> String {
        self.segments().collect::<Vec<_>>().join("\n")
    }
}
