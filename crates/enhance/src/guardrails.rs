//! Deterministic post-processing of generated completions.
//!
//! Steps run in a fixed order and never fail:
//! 1. strip known preambles,
//! 2. unwrap a fully double-quoted reply,
//! 3. keep only the first line,
//! 4. hard-truncate to `char_max`,
//! 5. make sure the text starts with the original prompt,
//! 6. add a closing period when there is room.

use serde::Serialize;

/// Preambles models like to prepend, matched case-insensitively in order.
const PREAMBLES: &[&str] = &[
    "Enhanced prompt:",
    "Here's the enhanced prompt:",
    "Enhanced version:",
    "Improved prompt:",
    "Here is the enhanced version:",
    "The enhanced prompt is:",
    "Completion:",
    "Enhanced completion:",
    "Result:",
    "Output:",
    "Response:",
];

/// Characters trimmed from the end after a hard truncation.
const TRUNCATION_TRIM: &[char] = &[',', ';', ':', '-', ' '];

/// A correction the guardrails applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Correction {
    PreambleStripped,
    QuotesStripped,
    ExtraLinesDropped,
    Truncated,
    PromptPrepended,
    /// The candidate was thrown away and the prompt returned
    Discarded,
    PeriodAppended,
}

/// The corrected text and what was done to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardrailOutcome {
    pub text: String,
    pub corrections: Vec<Correction>,
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\u{0b}'
            | '\u{0c}'
            | '\u{1c}'
            | '\u{1d}'
            | '\u{1e}'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

fn strip_preambles<'a>(mut text: &'a str, corrections: &mut Vec<Correction>) -> &'a str {
    for preamble in PREAMBLES {
        let matched = text
            .get(..preamble.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(preamble));
        if matched {
            text = text[preamble.len()..].trim();
            corrections.push(Correction::PreambleStripped);
        }
    }
    text
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// Run every guardrail over `text` for the given original prompt.
pub fn apply(text: &str, original: &str, char_max: usize) -> GuardrailOutcome {
    let mut corrections = Vec::new();

    let mut candidate = strip_preambles(text.trim(), &mut corrections);

    if candidate.len() >= 2 && candidate.starts_with('"') && candidate.ends_with('"') {
        candidate = candidate[1..candidate.len() - 1].trim();
        corrections.push(Correction::QuotesStripped);
    }

    if let Some((first, _)) = candidate.split_once(is_line_break) {
        candidate = first;
        corrections.push(Correction::ExtraLinesDropped);
    }
    let mut candidate = candidate.trim().to_string();

    if candidate.chars().count() > char_max {
        let cut: String = candidate.chars().take(char_max).collect();
        candidate = cut.trim_end_matches(TRUNCATION_TRIM).trim_end().to_string();
        corrections.push(Correction::Truncated);
    }

    if candidate.is_empty() {
        corrections.push(Correction::Discarded);
        candidate = original.to_string();
    } else if !starts_with_ignore_case(&candidate, original) {
        let prefixed = format!("{original} {candidate}");
        if prefixed.chars().count() <= char_max {
            candidate = prefixed;
            corrections.push(Correction::PromptPrepended);
        } else {
            candidate = original.to_string();
            corrections.push(Correction::Discarded);
        }
    }

    if !candidate.ends_with(['.', '!', '?']) && candidate.chars().count() < char_max {
        candidate.push('.');
        corrections.push(Correction::PeriodAppended);
    }

    GuardrailOutcome {
        text: candidate,
        corrections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_completion_only_gets_a_period() {
        let out = apply("Sara is on Orion", "Sara is", 20);
        assert_eq!(out.text, "Sara is on Orion.");
        assert_eq!(out.corrections, vec![Correction::PeriodAppended]);
    }

    #[test]
    fn preamble_stripped_case_insensitively() {
        let out = apply("ENHANCED PROMPT:   Sara is leading Orion", "Sara is", 40);
        assert_eq!(out.text, "Sara is leading Orion.");
        assert_eq!(out.corrections[0], Correction::PreambleStripped);
    }

    #[test]
    fn stacked_preambles_stripped_in_list_order() {
        let out = apply("Completion: Result: Sara is here", "Sara is", 40);
        assert_eq!(out.text, "Sara is here.");
    }

    #[test]
    fn wrapping_quotes_removed() {
        let out = apply("\"Sara is on Orion\"", "Sara is", 20);
        assert_eq!(out.text, "Sara is on Orion.");
        assert!(out.corrections.contains(&Correction::QuotesStripped));
    }

    #[test]
    fn only_first_line_kept() {
        let out = apply("Sara is on Orion\nAnd more\r\nstuff", "Sara is", 40);
        assert_eq!(out.text, "Sara is on Orion.");
        assert!(out.corrections.contains(&Correction::ExtraLinesDropped));

        let out = apply("Sara is here\u{2028}ignored", "Sara is", 40);
        assert_eq!(out.text, "Sara is here.");
    }

    #[test]
    fn overlong_text_truncated_and_trimmed() {
        // 19 chars then ", and more"
        let out = apply("Sara is on the Orio, and more", "Sara is", 20);
        assert_eq!(out.text, "Sara is on the Orio.");
        assert!(out.corrections.contains(&Correction::Truncated));
        assert!(out.text.chars().count() <= 20);
    }

    #[test]
    fn truncation_strips_trailing_punctuation_run() {
        let out = apply("Sara is working on -; things", "Sara is", 21);
        assert_eq!(out.text, "Sara is working on.");
    }

    #[test]
    fn missing_prompt_prepended_when_it_fits() {
        let out = apply("the Orion project", "Sara is", 30);
        assert_eq!(out.text, "Sara is the Orion project.");
        assert!(out.corrections.contains(&Correction::PromptPrepended));
    }

    #[test]
    fn missing_prompt_discards_when_too_long() {
        let out = apply("the Orion project", "Sara is", 20);
        assert_eq!(out.text, "Sara is.");
        assert!(out.corrections.contains(&Correction::Discarded));
    }

    #[test]
    fn prompt_match_is_case_insensitive() {
        let out = apply("sara IS on Orion!", "Sara is", 20);
        assert_eq!(out.text, "sara IS on Orion!");
        assert!(out.corrections.is_empty());
    }

    #[test]
    fn period_only_added_when_room() {
        let out = apply("Sara is on the Orion", "Sara is", 20);
        assert_eq!(out.text, "Sara is on the Orion");
        assert!(!out.corrections.contains(&Correction::PeriodAppended));
    }

    #[test]
    fn empty_after_cleanup_returns_prompt() {
        for text in ["Completion:", "\"\"", "  Output:  "] {
            let out = apply(text, "Sara is", 20);
            assert_eq!(out.text, "Sara is.", "{text:?}");
            assert!(out.corrections.contains(&Correction::Discarded));
        }
    }

    #[test]
    fn result_never_exceeds_char_max() {
        let replies = [
            "Sara is the lead engineer for the Orion project and more",
            "Here is the enhanced version: something quite long indeed",
            "\"quoted reply that is long\"",
            "x",
        ];
        for reply in replies {
            let out = apply(reply, "Sara is", 20);
            assert!(out.text.chars().count() <= 20, "{:?}", out.text);
            assert!(out.text.to_lowercase().starts_with("sara is"));
        }
    }

    #[test]
    fn multibyte_truncation_is_char_safe() {
        let out = apply("Café is très très très bien", "Café is", 20);
        assert!(out.text.chars().count() <= 20);
        assert!(out.text.starts_with("Café is"));
    }
}
