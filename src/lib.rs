//! Recovers deferred citation metadata from model responses.
//!
//! A response carries prose with `[N]` markers followed by a delimited JSON
//! block describing each citation. The block is often slightly malformed;
//! parsing repairs what it can and degrades to "no citations" otherwise.

pub mod citation;
pub mod config;
pub mod deferred;

pub use citation::{
    deferred_citation_to_citation, get_citation_marker_ids, replace_deferred_markers, Citation,
    CitationId, RawCitationRecord, ReplaceOptions, Timestamps,
};
pub use config::Delimiters;
pub use deferred::{
    extract_visible_text, get_all_citations_from_deferred_response, has_deferred_citations,
    has_deferred_citations_value, parse_deferred_citation_response, DeferredParser, ParseResult,
};
