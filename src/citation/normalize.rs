use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{Citation, CitationId, RawCitationRecord, Timestamps};

static LEGACY_PAGE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^page_number_([0-9]+)_index_([0-9]+)$").unwrap());

static SIMPLE_PAGE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]+)_([0-9]+)$").unwrap());

/// Synthetic citation keys are this many hex chars of a blake3 digest.
const CITATION_KEY_LEN: usize = 16;

/// Page number and its normalized page id. Derived together from a `page_id`,
/// so a citation either carries both or neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocator {
    pub page_number: u32,
    pub start_page_id: String,
}

/// Parse a `page_id` in either `page_number_{P}_index_{I}` or `{P}_{I}` form.
///
/// `0_0` is taken to be a zero-indexed first page and corrected to page 1.
/// A zero page with a nonzero index is ambiguous and left as-is.
/// Returns `None` for anything that matches neither syntax.
pub fn parse_page_id(page_id: &str) -> Option<PageLocator> {
    let page_id = page_id.trim();
    let caps = LEGACY_PAGE_ID
        .captures(page_id)
        .or_else(|| SIMPLE_PAGE_ID.captures(page_id))?;

    let mut page: u32 = caps[1].parse().ok()?;
    let index: u32 = caps[2].parse().ok()?;

    if page == 0 && index == 0 {
        page = 1;
    }

    Some(PageLocator {
        page_number: page,
        start_page_id: format!("page_number_{}_index_{}", page, index),
    })
}

/// Convert a shape-normalized record into a display `Citation`.
///
/// `citation_number` overrides the record's own `id` when given.
pub fn deferred_citation_to_citation(
    record: &RawCitationRecord,
    citation_number: Option<CitationId>,
) -> Citation {
    let page = record.page_id.as_deref().and_then(parse_page_id);

    let line_ids = record.line_ids.as_ref().map(|ids| {
        let mut sorted = ids.clone();
        sorted.sort();
        sorted
    });

    let timestamps = record.timestamps.as_ref().map(|t| Timestamps {
        start_time: t.start_time.clone(),
        end_time: t.end_time.clone(),
    });

    let (page_number, start_page_id) = match page {
        Some(loc) => (Some(loc.page_number), Some(loc.start_page_id)),
        None => (None, None),
    };

    Citation {
        attachment_id: record.attachment_id.clone().unwrap_or_default(),
        reasoning: record.reasoning.clone(),
        full_phrase: record.full_phrase.clone().unwrap_or_default(),
        anchor_text: record.anchor_text.clone(),
        page_number,
        start_page_id,
        line_ids,
        timestamps,
        citation_number: citation_number.or(record.id),
    }
}

fn hash_field(hasher: &mut blake3::Hasher, value: &str) {
    hasher.update(value.as_bytes());
    hasher.update(&[0x1f]);
}

/// Stable content key for a citation. Identical citations share a key.
pub fn citation_key(citation: &Citation) -> String {
    let lines = citation
        .line_ids
        .as_ref()
        .map(|ids| {
            ids.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default();
    let number = citation
        .citation_number
        .map(|n| n.to_string())
        .unwrap_or_default();

    let mut hasher = blake3::Hasher::new();
    hash_field(&mut hasher, &citation.attachment_id);
    hash_field(&mut hasher, &citation.full_phrase);
    hash_field(&mut hasher, citation.anchor_text.as_deref().unwrap_or(""));
    hash_field(&mut hasher, citation.start_page_id.as_deref().unwrap_or(""));
    hash_field(&mut hasher, &lines);
    if let Some(t) = &citation.timestamps {
        hash_field(&mut hasher, t.start_time.as_deref().unwrap_or(""));
        hash_field(&mut hasher, t.end_time.as_deref().unwrap_or(""));
    }
    hash_field(&mut hasher, &number);

    let hex = hasher.finalize().to_hex();
    hex.as_str()[..CITATION_KEY_LEN].to_string()
}

/// Keyed citations for every record with a non-empty full phrase.
/// Records without one are dropped.
pub fn citations_with_phrase(records: &[RawCitationRecord]) -> BTreeMap<String, Citation> {
    records
        .iter()
        .filter(|r| {
            r.full_phrase
                .as_deref()
                .is_some_and(|p| !p.trim().is_empty())
        })
        .map(|r| {
            let citation = deferred_citation_to_citation(r, None);
            (citation_key(&citation), citation)
        })
        .collect()
}
