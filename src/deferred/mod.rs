pub mod repair;
pub mod shape;
pub mod split;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::citation::normalize::{citations_with_phrase, deferred_citation_to_citation};
use crate::citation::types::{Citation, CitationId, RawCitationRecord};
use crate::config::Delimiters;

use shape::BlockShape;
use split::{find_start, split_response, strip_code_fence};

/// Error reported for unusable input. Callers match on the "Invalid input" prefix.
pub const INVALID_INPUT_ERROR: &str = "Invalid input: expected a non-empty response string";

/// Outcome of parsing one model response.
///
/// Every field is always serialized. An invalid-input result has
/// `success: false`, an `error`, and empty text and collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub success: bool,
    /// Prose before the citation block, without delimiters or payload.
    pub visible_text: String,
    /// Records in block order, compact keys expanded. Ids may repeat.
    pub citations: Vec<RawCitationRecord>,
    /// Last record for each id. Records without an id are left out.
    pub citation_map: BTreeMap<CitationId, RawCitationRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParseResult {
    fn invalid_input() -> Self {
        Self {
            success: false,
            error: Some(INVALID_INPUT_ERROR.to_string()),
            ..Default::default()
        }
    }

    fn from_records(visible_text: String, citations: Vec<RawCitationRecord>) -> Self {
        let citation_map = citations
            .iter()
            .filter_map(|r| r.id.map(|id| (id, r.clone())))
            .collect();
        Self {
            success: true,
            visible_text,
            citations,
            citation_map,
            error: None,
        }
    }

    /// Every record cited under marker `[id]`, in block order.
    pub fn records_for(&self, id: CitationId) -> impl Iterator<Item = &RawCitationRecord> {
        self.citations.iter().filter(move |r| r.id == Some(id))
    }

    /// Convert all records to display citations.
    pub fn to_citations(&self) -> Vec<Citation> {
        self.citations
            .iter()
            .map(|r| deferred_citation_to_citation(r, None))
            .collect()
    }
}

/// Parses model responses carrying a deferred citation block between a delimiter pair.
#[derive(Debug, Clone, Default)]
pub struct DeferredParser {
    delimiters: Delimiters,
}

impl DeferredParser {
    pub fn new(delimiters: Delimiters) -> Self {
        Self { delimiters }
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    pub fn has_citations(&self, input: &str) -> bool {
        find_start(input, &self.delimiters).is_some()
    }

    /// Like `has_citations`, but false for anything that is not a JSON string.
    pub fn has_citations_value(&self, input: &Value) -> bool {
        input.as_str().is_some_and(|s| self.has_citations(s))
    }

    pub fn extract_visible_text(&self, input: &str) -> String {
        split_response(input, &self.delimiters).visible_text.to_string()
    }

    /// Split, repair and normalize a response.
    ///
    /// Only empty input fails. A block that cannot be parsed, even after
    /// repair, is treated as absent.
    pub fn parse(&self, input: &str) -> ParseResult {
        if input.is_empty() {
            warn!("Rejecting empty response");
            return ParseResult::invalid_input();
        }

        let split = split_response(input, &self.delimiters);
        let visible_text = split.visible_text.to_string();

        let Some(raw_block) = split.raw_block else {
            debug!(input_len = input.len(), "No citation block found");
            return ParseResult::from_records(visible_text, Vec::new());
        };
        if split.unterminated {
            debug!("Citation block has no end delimiter, reading to end of input");
        }

        let block = strip_code_fence(raw_block);
        let value = match repair::parse_repaired(block) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    block_len = block.len(),
                    "Discarding unparseable citation block: {:#}", e
                );
                return ParseResult::from_records(visible_text, Vec::new());
            }
        };

        let shape = BlockShape::detect(value);
        debug!(shape = shape.name(), "Detected citation block shape");

        let citations = shape.into_records();
        debug!(count = citations.len(), "Parsed deferred citations");

        ParseResult::from_records(visible_text, citations)
    }

    /// Parse a dynamically typed input. Anything but a non-empty JSON string is invalid.
    pub fn parse_value(&self, input: &Value) -> ParseResult {
        match input.as_str() {
            Some(s) => self.parse(s),
            None => {
                warn!(kind = value_kind(input), "Rejecting non-string response");
                ParseResult::invalid_input()
            }
        }
    }

    /// Keyed citations for every record with a non-empty full phrase.
    pub fn all_citations(&self, input: &str) -> BTreeMap<String, Citation> {
        let result = self.parse(input);
        if !result.success {
            return BTreeMap::new();
        }
        citations_with_phrase(&result.citations)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse with the default delimiters.
pub fn parse_deferred_citation_response(input: &str) -> ParseResult {
    DeferredParser::default().parse(input)
}

pub fn has_deferred_citations(input: &str) -> bool {
    DeferredParser::default().has_citations(input)
}

pub fn has_deferred_citations_value(input: &Value) -> bool {
    DeferredParser::default().has_citations_value(input)
}

pub fn extract_visible_text(input: &str) -> String {
    DeferredParser::default().extract_visible_text(input)
}

pub fn get_all_citations_from_deferred_response(input: &str) -> BTreeMap<String, Citation> {
    DeferredParser::default().all_citations(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::markers::get_citation_marker_ids;
    use crate::config::{DEFAULT_END_DELIMITER, DEFAULT_START_DELIMITER};
    use serde_json::json;

    fn wrap(prose: &str, block: &str) -> String {
        format!(
            "{}\n\n{}\n{}\n{}",
            prose, DEFAULT_START_DELIMITER, block, DEFAULT_END_DELIMITER
        )
    }

    const PROSE: &str = "Revenue was $1B [1] with profit of $100M [2] in Q4 [3].";

    #[test]
    fn test_end_to_end() {
        let input = wrap(
            PROSE,
            r#"[
  {"id": 1, "attachment_id": "doc1", "full_phrase": "Revenue was $1B", "page_id": "1_0"},
  {"id": 2, "attachment_id": "doc1", "full_phrase": "profit of $100M", "page_id": "2_0"},
  {"id": 3, "attachment_id": "doc1", "full_phrase": "fourth quarter", "page_id": "0_0"}
]"#,
        );
        let result = parse_deferred_citation_response(&input);
        assert!(result.success);
        assert_eq!(result.error, None);
        assert_eq!(result.visible_text, PROSE);
        assert_eq!(result.citations.len(), 3);
        let ids: Vec<_> = result.citations.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(result.citation_map.len(), 3);
        assert_eq!(get_citation_marker_ids(&result.visible_text), vec![1, 2, 3]);

        let citations = result.to_citations();
        assert_eq!(citations[2].page_number, Some(1));
        assert_eq!(citations[2].start_page_id.as_deref(), Some("page_number_1_index_0"));
    }

    #[test]
    fn test_custom_delimiters() {
        let parser = DeferredParser::new(Delimiters::new("<START>", "<END>"));
        let input = format!("{}\n\n<START>\n[{{\"n\":1,\"f\":\"x\"}}]\n<END>", PROSE);
        let result = parser.parse(&input);
        assert_eq!(result.visible_text, PROSE);
        assert_eq!(result.citations.len(), 1);
        assert!(parser.has_citations(&input));
        assert!(!has_deferred_citations(&input));
    }

    #[test]
    fn test_fenced_block_with_repairs() {
        let input = wrap(
            "Throughput [1].",
            "```json\n[{\"id\": 1, \"full_phrase\": \"Output \\~100/hr\",},]\n```",
        );
        let result = parse_deferred_citation_response(&input);
        assert_eq!(result.citations.len(), 1);
        assert_eq!(
            result.citations[0].full_phrase.as_deref(),
            Some("Output ~100/hr")
        );
    }

    #[test]
    fn test_missing_end_delimiter_tolerated() {
        let input = format!(
            "Prose [1].\n{}\n[{{\"id\": 1, \"f\": \"x\"}}]",
            DEFAULT_START_DELIMITER
        );
        let result = parse_deferred_citation_response(&input);
        assert!(result.success);
        assert_eq!(result.visible_text, "Prose [1].");
        assert_eq!(result.citations.len(), 1);
    }

    #[test]
    fn test_unparseable_block_degrades() {
        let input = wrap("Prose [1].", "[{\"id\": 1, \"full_phrase\": ");
        let result = parse_deferred_citation_response(&input);
        assert!(result.success);
        assert_eq!(result.error, None);
        assert_eq!(result.visible_text, "Prose [1].");
        assert!(result.citations.is_empty());
        assert!(result.citation_map.is_empty());
    }

    #[test]
    fn test_unterminated_fence_degrades() {
        let input = wrap("Prose.", "```json\n[{\"id\": 1}]");
        let result = parse_deferred_citation_response(&input);
        assert!(result.success);
        assert!(result.citations.is_empty());
    }

    #[test]
    fn test_no_block() {
        let result = parse_deferred_citation_response("Plain answer [1].\n");
        assert!(result.success);
        assert_eq!(result.visible_text, "Plain answer [1].");
        assert!(result.citations.is_empty());
    }

    #[test]
    fn test_invalid_input() {
        let result = parse_deferred_citation_response("");
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("Invalid input"));
        assert!(result.citations.is_empty());

        let parser = DeferredParser::default();
        for input in [json!(null), json!(42), json!({"text": "x"}), json!("")] {
            let result = parser.parse_value(&input);
            assert!(!result.success);
            assert!(result.error.as_deref().unwrap().contains("Invalid input"));
        }
        assert!(parser.parse_value(&json!("hello")).success);
    }

    #[test]
    fn test_invalid_input_serializes_empty_fields() {
        let json = serde_json::to_value(parse_deferred_citation_response("")).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("Invalid input"));
        assert_eq!(json["visibleText"], "");
        assert_eq!(json["citations"], json!([]));
        assert_eq!(json["citationMap"], json!({}));
    }

    #[test]
    fn test_lone_record_object_with_line_ids() {
        let input = wrap("Claim [1].", r#"{"id":1,"full_phrase":"x","line_ids":[2,1]}"#);
        let result = parse_deferred_citation_response(&input);
        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.to_citations()[0].line_ids, Some(vec![1, 2]));
    }

    #[test]
    fn test_truncated_surrogate_keeps_block() {
        let input = wrap(
            "A [1] B [2].",
            r#"[{"id":1,"full_phrase":"emoji \ud83d cut"},{"id":2,"full_phrase":"fine"}]"#,
        );
        let result = parse_deferred_citation_response(&input);
        assert_eq!(result.citations.len(), 2);
        assert_eq!(
            result.citations[0].full_phrase.as_deref(),
            Some("emoji \u{fffd} cut")
        );
        assert_eq!(result.citations[1].full_phrase.as_deref(), Some("fine"));
    }

    #[test]
    fn test_has_deferred_citations_value() {
        let input = wrap("x", "[]");
        assert!(has_deferred_citations_value(&json!(input)));
        assert!(!has_deferred_citations_value(&json!("no block")));
        assert!(!has_deferred_citations_value(&json!(null)));
        assert!(!has_deferred_citations_value(&json!(["<<<CITATION_DATA>>>"])));
    }

    #[test]
    fn test_extract_visible_text_idempotent() {
        let input = wrap(PROSE, "[]");
        let once = extract_visible_text(&input);
        assert_eq!(once, PROSE);
        assert_eq!(extract_visible_text(&once), once);
        assert_eq!(extract_visible_text("no block here  \n"), "no block here");
    }

    #[test]
    fn test_grouped_numeric_key() {
        let input = wrap(
            "A [1] B [2].",
            r#"{"0": [{"n": 1, "f": "alpha"}], "abc123": [{"n": 2, "f": "beta"}]}"#,
        );
        let result = parse_deferred_citation_response(&input);
        assert_eq!(result.citations.len(), 2);
        assert_eq!(result.citations[0].attachment_id.as_deref(), Some("0"));
        assert_eq!(result.citations[1].attachment_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_duplicate_ids_grouped_under_one_marker() {
        let input = wrap(
            "Claim [1].",
            r#"[{"id": 1, "f": "first"}, {"id": 1, "f": "second"}, {"f": "no id"}]"#,
        );
        let result = parse_deferred_citation_response(&input);
        assert_eq!(result.citations.len(), 3);
        assert_eq!(result.citation_map.len(), 1);
        assert_eq!(result.citation_map[&1].full_phrase.as_deref(), Some("second"));
        let phrases: Vec<_> = result
            .records_for(1)
            .filter_map(|r| r.full_phrase.as_deref())
            .collect();
        assert_eq!(phrases, vec!["first", "second"]);
    }

    #[test]
    fn test_all_citations_requires_full_phrase() {
        let input = wrap(
            "A [1] B [2] C [3].",
            r#"[{"id": 1, "f": "kept"}, {"id": 2, "f": ""}, {"id": 3, "k": "anchor only"}]"#,
        );
        let all = get_all_citations_from_deferred_response(&input);
        assert_eq!(all.len(), 1);
        let citation = all.values().next().unwrap();
        assert_eq!(citation.full_phrase, "kept");
        assert_eq!(citation.citation_number, Some(1));

        assert!(get_all_citations_from_deferred_response("").is_empty());
    }

    #[test]
    fn test_parse_result_serializes_camel_case() {
        let input = wrap("A [1].", r#"[{"id": 1, "f": "x"}]"#);
        let json = serde_json::to_value(parse_deferred_citation_response(&input)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["visibleText"], "A [1].");
        assert_eq!(json["citationMap"]["1"]["full_phrase"], "x");
        assert!(json.get("error").is_none());
    }
}
