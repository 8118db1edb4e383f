//! Whitespace normalization for raw prompts.

/// Trim the prompt and collapse every internal whitespace run to one space.
pub fn normalize(prompt: &str) -> String {
    prompt.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_and_trims() {
        assert_eq!(normalize("  Sara   is\t\n working "), "Sara is working");
    }

    #[test]
    fn empty_and_blank_yield_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t "), "");
    }

    #[test]
    fn unicode_whitespace_collapsed() {
        assert_eq!(normalize("a\u{00a0}\u{2003}b"), "a b");
    }

    #[test]
    fn output_has_no_double_spaces() {
        let inputs = ["x  y", "\tx\r\ny  \u{3000} z", "already clean", "   "];
        for input in inputs {
            let out = normalize(input);
            assert_eq!(out, out.trim());
            assert!(!out.contains("  "), "{out:?}");
            assert!(!out.chars().any(|c| c.is_whitespace() && c != ' '));
        }
    }
}
