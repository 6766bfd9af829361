use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::types::{CitationId, RawCitationRecord};

static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([0-9]+)\]").unwrap());

/// How `replace_deferred_markers` substitutes each `[N]` marker.
#[derive(Default)]
pub struct ReplaceOptions<'a> {
    /// Takes precedence over everything else when set.
    pub replacer: Option<&'a dyn Fn(CitationId) -> String>,
    pub citation_map: Option<&'a BTreeMap<CitationId, RawCitationRecord>>,
    /// Substitute the cited anchor text (needs `citation_map`).
    pub show_anchor_text: bool,
}

impl fmt::Debug for ReplaceOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplaceOptions")
            .field("replacer", &self.replacer.map(|_| "<fn>"))
            .field("citation_map", &self.citation_map.map(|m| m.len()))
            .field("show_anchor_text", &self.show_anchor_text)
            .finish()
    }
}

/// Ids of every `[N]` marker in `text`, left to right, repeats included.
pub fn get_citation_marker_ids(text: &str) -> Vec<CitationId> {
    MARKER
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Replace every `[N]` marker in `text`. Markers are removed unless a
/// replacer or anchor-text lookup supplies something else; ids missing from
/// the map become empty strings.
pub fn replace_deferred_markers(text: &str, options: &ReplaceOptions<'_>) -> String {
    MARKER
        .replace_all(text, |caps: &Captures| {
            let Ok(id) = caps[1].parse::<CitationId>() else {
                return caps[0].to_string();
            };

            if let Some(replacer) = options.replacer {
                return replacer(id);
            }

            match options.citation_map {
                Some(map) if options.show_anchor_text => map
                    .get(&id)
                    .and_then(|r| r.anchor_text.clone())
                    .unwrap_or_default(),
                _ => String::new(),
            }
        })
        .into_owned()
}
