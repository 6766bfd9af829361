use serde::{Deserialize, Serialize};

/// Citation ordinal as referenced by `[N]` markers in the visible text.
pub type CitationId = i64;

/// A citation record recovered from the data block, with every compact alias
/// expanded to its canonical field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCitationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CitationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_phrase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_text: Option<String>,
    /// `"{page}_{index}"` or legacy `"page_number_{page}_index_{index}"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    /// Unordered, exactly as emitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_ids: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<RawTimestamps>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTimestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

/// Canonical citation handed to the rendering layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub attachment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub full_phrase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Always in the legacy `page_number_{P}_index_{I}` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_page_id: Option<String>,
    /// Ascending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_ids: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_number: Option<CitationId>,
}

/// Start/end offsets of an audio or video citation. Passed through unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}
