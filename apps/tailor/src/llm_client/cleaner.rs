//! AI Response Cleaner: strips code fences and stray quoting/bracket junk that
//! models wrap around otherwise plain text.

const FENCES: &[&str] = &["```", "~~~"];

fn is_leading_junk(c: char) -> bool {
    matches!(c, '[' | '{' | '"' | '\'') || c.is_whitespace()
}

fn is_trailing_junk(c: char) -> bool {
    matches!(c, ']' | '}' | '"' | '\'') || c.is_whitespace()
}

/// Removes one opening fence (with optional language tag) at the very start and
/// one closing fence at the very end.
fn strip_fences(text: &str) -> &str {
    let mut text = text;
    for fence in FENCES {
        if let Some(rest) = text.strip_prefix(fence) {
            let rest = rest.trim_start_matches(|c: char| {
                c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_')
            });
            text = rest.strip_prefix('\n').unwrap_or(rest);
            break;
        }
    }
    for fence in FENCES {
        if let Some(rest) = text.strip_suffix(fence) {
            text = rest.strip_suffix('\n').unwrap_or(rest);
            break;
        }
    }
    text
}

fn clean_once(text: &str) -> &str {
    strip_fences(text)
        .trim_start_matches(is_leading_junk)
        .trim_end_matches(is_trailing_junk)
        .trim()
}

/// Cleans raw generated text. Applied until a fixed point, so
/// `clean_ai_response(&clean_ai_response(x)) == clean_ai_response(x)`.
pub fn clean_ai_response(raw: &str) -> String {
    let mut current = raw;
    loop {
        let next = clean_once(current);
        if next.len() == current.len() {
            return next.to_string();
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_json_fence_and_brace_junk() {
        // The fence goes first, then the leading `{"` cluster and the trailing `}`.
        assert_eq!(clean_ai_response("```json\n{\"a\":1}\n```"), "a\":1");
    }

    #[test]
    fn test_bracketed_object_boundary_case() {
        // Leading `[{ "` and trailing `}]` are junk clusters; the inner quote after
        // `a` survives because it is not at either end.
        assert_eq!(clean_ai_response("[{ \"a\":1}]"), "a\":1");
    }

    #[test]
    fn test_strips_latex_fence() {
        let raw = "```latex\nExperienced engineer with a focus on \\textbf{Rust}.\n```";
        assert_eq!(
            clean_ai_response(raw),
            "Experienced engineer with a focus on \\textbf{Rust}."
        );
    }

    #[test]
    fn test_strips_surrounding_quotes() {
        assert_eq!(clean_ai_response("  \"Hello there.\"  "), "Hello there.");
        assert_eq!(clean_ai_response("'Single quoted.'"), "Single quoted.");
    }

    #[test]
    fn test_plain_text_is_untouched() {
        let text = "Line one.\nLine two.";
        assert_eq!(clean_ai_response(text), text);
    }

    #[test]
    fn test_inner_fences_are_kept() {
        let text = "Use ``` for code.";
        assert_eq!(clean_ai_response(text), text);
    }

    #[test]
    fn test_tilde_fences() {
        assert_eq!(clean_ai_response("~~~\nplain\n~~~"), "plain");
    }

    #[test]
    fn test_fence_hidden_behind_junk_is_still_removed() {
        // One pass would expose a fence; the fixed point removes it too.
        assert_eq!(clean_ai_response("[```py\nbody```]"), "body");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "```json\n{\"a\":1}\n```",
            "[{ \"a\":1}]",
            "  \"quoted\"  ",
            "[```py\nbody```]",
            "```\n```",
            "",
            "{}",
            "\"'[{}]'\"",
            "text with trailing brace }",
        ];
        for input in inputs {
            let once = clean_ai_response(input);
            assert_eq!(clean_ai_response(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_all_junk_becomes_empty() {
        assert_eq!(clean_ai_response("\"'[{}]'\""), "");
        assert_eq!(clean_ai_response("```\n```"), "");
    }
}
