pub mod markers;
pub mod normalize;
pub mod types;

pub use markers::{get_citation_marker_ids, replace_deferred_markers, ReplaceOptions};
pub use normalize::{citation_key, deferred_citation_to_citation, parse_page_id, PageLocator};
pub use types::{Citation, CitationId, RawCitationRecord, RawTimestamps, Timestamps};
