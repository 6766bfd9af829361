/// Default marker that opens the citation data block.
pub const DEFAULT_START_DELIMITER: &str = "<<<CITATION_DATA>>>";
/// Default marker that closes the citation data block.
pub const DEFAULT_END_DELIMITER: &str = "<<<END_CITATION_DATA>>>";

/// The delimiter pair surrounding the citation data block in a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub start: String,
    pub end: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_DELIMITER.to_string(),
            end: DEFAULT_END_DELIMITER.to_string(),
        }
    }
}

impl Delimiters {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Load delimiters from `CITATION_START_DELIMITER` / `CITATION_END_DELIMITER`,
    /// falling back to the defaults for anything unset or empty.
    pub fn from_env() -> Self {
        let start = dotenv::var("CITATION_START_DELIMITER")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_START_DELIMITER.to_string());
        let end = dotenv::var("CITATION_END_DELIMITER")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_END_DELIMITER.to_string());
        Self { start, end }
    }
}
