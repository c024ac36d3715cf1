/// Page query and result envelopes
use crate::catalog::CatalogRecord;
use crate::ScrapeError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: usize = 100;

/// A request for one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Site root, e.g. `https://www.example.com`
    pub base_location: String,

    /// Numeric category identifier
    pub category: u32,

    /// 1-based listing page number
    pub page: u32,

    /// Maximum number of records to return
    pub page_size: usize,
}

impl PageQuery {
    /// Creates a validated query
    ///
    /// # Returns
    ///
    /// * `Ok(PageQuery)` - All fields are in range
    /// * `Err(ScrapeError::InvalidQuery)` - A field is out of range
    pub fn new(
        base_location: impl Into<String>,
        category: u32,
        page: u32,
        page_size: usize,
    ) -> Result<Self, ScrapeError> {
        let query = Self {
            base_location: base_location.into(),
            category,
            page,
            page_size,
        };
        query.validate()?;
        Ok(query)
    }

    /// Checks the query bounds
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.base_location.trim().is_empty() {
            return Err(ScrapeError::InvalidQuery(
                "base_location cannot be empty".to_string(),
            ));
        }

        if self.page < 1 {
            return Err(ScrapeError::InvalidQuery(format!(
                "page must be >= 1, got {}",
                self.page
            )));
        }

        if self.page_size < 1 || self.page_size > MAX_PAGE_SIZE {
            return Err(ScrapeError::InvalidQuery(format!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }

        Ok(())
    }
}

/// The assembled response for one listing page
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub base_location: String,
    pub category: u32,
    pub page: u32,
    pub page_size: usize,

    /// Number of item fragments on the listing page before truncation
    pub total_items_seen: usize,

    /// True when the listing held more items than `page_size`
    pub has_next: bool,

    /// Records in listing order, at most `page_size` of them
    pub items: Vec<CatalogRecord>,

    /// When the listing page was fetched
    pub fetched_at: DateTime<Utc>,
}

impl PageResult {
    /// Builds a result from a query, the pre-truncation item count and the enriched items
    pub fn assemble(query: &PageQuery, total_items_seen: usize, items: Vec<CatalogRecord>) -> Self {
        debug_assert!(items.len() <= query.page_size);
        Self {
            base_location: query.base_location.clone(),
            category: query.category,
            page: query.page,
            page_size: query.page_size,
            total_items_seen,
            has_next: total_items_seen > query.page_size,
            items,
            fetched_at: Utc::now(),
        }
    }
}

/// Records gathered across several categories
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepResult {
    /// Records per category, in page order
    pub categories: BTreeMap<u32, Vec<CatalogRecord>>,

    /// Categories whose sweep stopped on a listing failure, with the error message
    pub failures: BTreeMap<u32, String>,
}

impl SweepResult {
    /// Total number of records across all categories
    pub fn record_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }
}
