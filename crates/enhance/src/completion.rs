//! Completion orchestration: length budget, vocabulary sample, instruction
//! template, and the Completion Service call itself.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use mastermind_core::message::Message;
use mastermind_core::provider::{Provider, ProviderRequest};
use regex::Regex;
use tracing::{debug, warn};

use crate::guardrails;

/// Expanded output never goes below this many characters.
const CHAR_FLOOR: usize = 20;

/// ~4 characters per token.
const CHARS_PER_TOKEN: usize = 4;

const MIN_TOKENS: usize = 8;

/// How many vocabulary words are listed in the instructions.
const VOCABULARY_SAMPLE: usize = 50;

const STOP_SEQUENCES: [&str; 4] = ["\n", "\n\n", "—", "•"];

const FUNCTION_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did",
    "will", "would", "could", "should", "may", "might", "can", "must",
    "this", "that", "these", "those", "i", "you", "he", "she", "it", "we", "they",
    "my", "your", "his", "her", "its", "our", "their",
    "currently", "project", "work", "working", "starting", "development", "ai", "system",
    "now", "today", "new", "current", "main", "primary", "key", "important", "major",
];

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid regex"));

static TRAILING_IS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bis\s*$").expect("valid regex"));

/// Character and token limits derived from the prompt length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBudget {
    pub original_chars: usize,
    /// Hard cap on the completed text
    pub char_max: usize,
    pub max_tokens: u32,
}

impl LengthBudget {
    /// `char_max = min(max(2L, 20), 4L)` floored at 20, and
    /// `max_tokens = max(8, ceil(char_max / 4))`.
    ///
    /// The floor wins over the 4x cap for prompts shorter than 5 characters.
    pub fn for_prompt(prompt: &str) -> Self {
        let original_chars = prompt.chars().count();
        let char_max = (2 * original_chars)
            .max(CHAR_FLOOR)
            .min(4 * original_chars)
            .max(CHAR_FLOOR);
        let max_tokens = char_max.div_ceil(CHARS_PER_TOKEN).max(MIN_TOKENS);

        Self {
            original_chars,
            char_max,
            max_tokens: u32::try_from(max_tokens).unwrap_or(u32::MAX),
        }
    }
}

/// Which instruction variant to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// Prompt ends in "is": ask for a short noun phrase
    NounPhrase,
    /// Anything else: one short sentence
    Sentence,
}

impl CompletionMode {
    pub fn detect(prompt: &str) -> Self {
        if TRAILING_IS.is_match(prompt.trim()) {
            CompletionMode::NounPhrase
        } else {
            CompletionMode::Sentence
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionMode::NounPhrase => "noun_phrase",
            CompletionMode::Sentence => "sentence",
        }
    }
}

/// Lowercased words of prompt and context plus a fixed set of function words.
pub fn allowed_vocabulary(prompt: &str, context: &str) -> BTreeSet<String> {
    let text = format!("{prompt} {context}").to_lowercase();
    WORD.find_iter(&text)
        .map(|m| m.as_str().to_string())
        .chain(FUNCTION_WORDS.iter().map(|w| w.to_string()))
        .collect()
}

/// The system instruction for a completion.
pub fn system_message(
    budget: &LengthBudget,
    mode: CompletionMode,
    vocabulary: &BTreeSet<String>,
) -> String {
    let sample = vocabulary
        .iter()
        .take(VOCABULARY_SAMPLE)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut message = format!(
        "You complete incomplete prompts concisely.\n\
         Hard limits:\n\
         - Original length: {} chars.\n\
         - Absolute max: {} chars (<= 4x).\n\
         - Return exactly one short completion (no more than 1 sentence).\n\
         - Do not introduce facts not present in PROMPT or CONTEXT.\n\
         - No advice, no questions, no preambles, no quotes.\n",
        budget.original_chars, budget.char_max
    );
    if mode == CompletionMode::NounPhrase {
        message.push_str(
            "For 'X is' fragments, return a 2–6 word noun phrase; no verbs beyond 'is'.\n",
        );
    }
    message.push_str("Use only words from this vocabulary: ");
    message.push_str(&sample);
    message
}

pub fn user_message(prompt: &str, context: &str) -> String {
    format!("Context: {context}\nComplete: {prompt}\nCompletion:")
}

/// The full Completion Service request with fixed sampling parameters.
pub fn build_request(
    model: &str,
    prompt: &str,
    context: &str,
    budget: &LengthBudget,
) -> ProviderRequest {
    let mode = CompletionMode::detect(prompt);
    let vocabulary = allowed_vocabulary(prompt, context);

    ProviderRequest {
        max_tokens: Some(budget.max_tokens),
        temperature: 0.1,
        top_p: Some(0.4),
        presence_penalty: Some(0.0),
        frequency_penalty: Some(0.2),
        stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        ..ProviderRequest::new(
            model,
            vec![
                Message::system(system_message(budget, mode, &vocabulary)),
                Message::user(user_message(prompt, context)),
            ],
        )
    }
}

/// Complete `prompt` using `context`, then apply guardrails.
///
/// Returns the prompt unchanged when the provider fails or returns no
/// usable text. No retries.
pub async fn complete_with_context(
    provider: &dyn Provider,
    model: &str,
    prompt: &str,
    context: &str,
) -> String {
    let budget = LengthBudget::for_prompt(prompt);
    let request = build_request(model, prompt, context, &budget);

    debug!(
        char_max = budget.char_max,
        max_tokens = budget.max_tokens,
        mode = CompletionMode::detect(prompt).as_str(),
        provider = provider.name(),
        "Requesting completion"
    );

    let content = match provider.complete(request).await {
        Ok(response) => response.message.content,
        Err(e) => {
            warn!(error = %e, provider = provider.name(), "Completion failed, keeping prompt");
            return prompt.to_string();
        }
    };

    let content = content.trim();
    if content.is_empty() {
        warn!(provider = provider.name(), "Completion was empty, keeping prompt");
        return prompt.to_string();
    }

    let outcome = guardrails::apply(content, prompt, budget.char_max);
    if !outcome.corrections.is_empty() {
        debug!(corrections = ?outcome.corrections, "Guardrails corrected completion");
    }
    outcome.text
}
