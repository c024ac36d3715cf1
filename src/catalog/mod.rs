//! Catalog data model
//!
//! This module defines the records and page envelopes that flow through the
//! pipeline.
//!
//! # Components
//!
//! - `CatalogRecord`: One listing item, optionally enriched with a stream link
//! - `PageQuery`: A validated request for one listing page
//! - `PageResult`: The assembled, paginated response for one listing page
//! - `SweepResult`: Records gathered across several categories and pages

mod query;
mod record;

// Re-export main types
pub use query::{PageQuery, PageResult, SweepResult, MAX_PAGE_SIZE};
pub use record::CatalogRecord;
