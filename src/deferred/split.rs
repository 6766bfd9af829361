use crate::config::Delimiters;

/// A response split around its citation data block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResponse<'a> {
    pub visible_text: &'a str,
    /// Text between the delimiters, or `None` when there is no start delimiter.
    pub raw_block: Option<&'a str>,
    /// The end delimiter was missing; the block runs to end of input.
    pub unterminated: bool,
}

/// Byte offset of the first start delimiter, if any. An empty delimiter never matches.
pub fn find_start(input: &str, delimiters: &Delimiters) -> Option<usize> {
    if delimiters.start.is_empty() {
        return None;
    }
    input.find(&delimiters.start)
}

/// Split `input` at the first start delimiter.
pub fn split_response<'a>(input: &'a str, delimiters: &Delimiters) -> SplitResponse<'a> {
    let Some(start_idx) = find_start(input, delimiters) else {
        return SplitResponse {
            visible_text: input.trim_end(),
            raw_block: None,
            unterminated: false,
        };
    };

    let visible_text = input[..start_idx].trim();
    let after = &input[start_idx + delimiters.start.len()..];

    let end_idx = if delimiters.end.is_empty() {
        None
    } else {
        after.find(&delimiters.end)
    };

    match end_idx {
        Some(end) => SplitResponse {
            visible_text,
            raw_block: Some(&after[..end]),
            unterminated: false,
        },
        None => SplitResponse {
            visible_text,
            raw_block: Some(after),
            unterminated: true,
        },
    }
}

/// Strip a surrounding ```` ```json ```` / ```` ``` ```` fence pair from a block.
///
/// Only strips when both the opening fence line and a closing fence exist;
/// anything else comes back trimmed but otherwise untouched.
pub fn strip_code_fence(block: &str) -> &str {
    let trimmed = block.trim();
    let Some(after_fence) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Rest of the opening fence line is the language tag
    let Some(newline) = after_fence.find('\n') else {
        return trimmed;
    };
    let body = &after_fence[newline + 1..];

    match body.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delims() -> Delimiters {
        Delimiters::new("<START>", "<END>")
    }

    #[test]
    fn test_split_no_block() {
        let split = split_response("Just prose [1].  \n\n", &delims());
        assert_eq!(split.visible_text, "Just prose [1].");
        assert_eq!(split.raw_block, None);
    }

    #[test]
    fn test_split_with_block() {
        let input = "Prose [1].\n\n<START>\n[{\"id\":1}]\n<END>\ntrailing";
        let split = split_response(input, &delims());
        assert_eq!(split.visible_text, "Prose [1].");
        assert_eq!(split.raw_block, Some("\n[{\"id\":1}]\n"));
        assert!(!split.unterminated);
    }

    #[test]
    fn test_split_missing_end() {
        let split = split_response("Prose\n<START>\n[1, 2", &delims());
        assert_eq!(split.visible_text, "Prose");
        assert_eq!(split.raw_block, Some("\n[1, 2"));
        assert!(split.unterminated);
    }

    #[test]
    fn test_split_end_before_start_ignored() {
        let split = split_response("a <END> b <START>[]", &delims());
        assert_eq!(split.visible_text, "a <END> b");
        assert_eq!(split.raw_block, Some("[]"));
        assert!(split.unterminated);
    }

    #[test]
    fn test_split_uses_first_start() {
        let split = split_response("a <START>[1]<END> b <START>[2]<END>", &delims());
        assert_eq!(split.visible_text, "a");
        assert_eq!(split.raw_block, Some("[1]"));
    }

    #[test]
    fn test_empty_start_delimiter_never_matches() {
        let d = Delimiters::new("", "<END>");
        let split = split_response("text <END>", &d);
        assert_eq!(split.raw_block, None);
        assert_eq!(split.visible_text, "text <END>");
    }

    #[test]
    fn test_strip_json_fence() {
        assert_eq!(strip_code_fence("\n```json\n[{\"id\":1}]\n```\n"), "[{\"id\":1}]");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
    }

    #[test]
    fn test_strip_unterminated_fence_untouched() {
        assert_eq!(strip_code_fence("```json\n[1]"), "```json\n[1]");
        assert_eq!(strip_code_fence("```"), "```");
    }

    #[test]
    fn test_strip_no_fence() {
        assert_eq!(strip_code_fence("  [1, 2]  "), "[1, 2]");
    }
}
