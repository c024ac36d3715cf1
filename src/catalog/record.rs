/// Catalog record definitions
///
/// A record is created from one listing item and enriched later with the
/// stream link resolved from its detail page.
use serde::Serialize;

/// One video entry as it appears on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CatalogRecord {
    /// Numeric identifier from the item link; empty when the link carries none
    pub external_id: String,

    /// Short title from the thumbnail anchor
    pub title: String,

    /// Thumbnail image URL
    pub image_url: String,

    /// Quality badge shown over the thumbnail (e.g. "HD")
    pub quality_label: String,

    /// Full title from the detail block
    pub full_title: String,

    /// Play count as displayed by the site
    pub play_count: String,

    /// Release date text as displayed by the site
    pub release_date: String,

    /// Resolved stream URL, absent until enrichment succeeds
    pub stream_link: Option<String>,
}

impl CatalogRecord {
    /// Returns true if the record carries an identifier usable for a detail fetch
    pub fn has_external_id(&self) -> bool {
        !self.external_id.is_empty()
    }

    /// Returns a copy of this record with the stream link set
    pub fn with_stream_link(mut self, link: Option<String>) -> Self {
        self.stream_link = link;
        self
    }
}
