//! Fetch-retry-extract pipeline
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with retry and backoff
//! - Listing and detail page extraction
//! - Bounded concurrent enrichment of records
//! - The single entry point that assembles a page result

mod extractor;
mod facade;
mod fanout;
mod fetcher;

pub use extractor::{
    external_id_from_href, extract_listing_item, extract_stream_link, parse_listing, ListingPage,
    PLAYER_MARKER,
};
pub use facade::CatalogPipeline;
pub use fanout::FanOutCoordinator;
pub use fetcher::{build_http_client, FetchOutcome, FetchTrace, PageFetcher, RetryPolicy};
