//! Pipeline entry point
//!
//! `CatalogPipeline` composes fetching, extraction and enrichment into one
//! call per listing page. It holds no per-request state, so a single
//! instance can serve concurrent callers.

use crate::catalog::{PageQuery, PageResult, SweepResult};
use crate::config::{Config, SiteConfig};
use crate::pipeline::extractor::parse_listing;
use crate::pipeline::fanout::FanOutCoordinator;
use crate::pipeline::fetcher::{build_http_client, FetchOutcome, PageFetcher};
use crate::url::listing_url;
use crate::ScrapeError;
use reqwest::Client;

/// Listing-page pipeline
#[derive(Debug, Clone)]
pub struct CatalogPipeline {
    fetcher: PageFetcher,
    coordinator: FanOutCoordinator,
    site: SiteConfig,
}

impl CatalogPipeline {
    /// Creates a pipeline with a freshly built HTTP client
    ///
    /// # Returns
    ///
    /// * `Ok(CatalogPipeline)` - Ready to serve queries
    /// * `Err(ScrapeError)` - The HTTP client could not be built
    pub fn new(config: &Config) -> Result<Self, ScrapeError> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a pipeline over an existing client
    pub fn with_client(client: Client, config: &Config) -> Self {
        let fetcher = PageFetcher::from_config(client, &config.fetcher);
        let coordinator = FanOutCoordinator::from_config(fetcher.clone(), config);

        Self {
            fetcher,
            coordinator,
            site: config.site.clone(),
        }
    }

    /// Fetches one listing page and enriches its records
    ///
    /// # Flow
    ///
    /// 1. Validate the query and build the listing URL
    /// 2. Fetch the listing with the full retry policy
    /// 3. Count all item fragments, then truncate to `page_size` and extract
    /// 4. Resolve stream links concurrently
    /// 5. Assemble the result
    ///
    /// # Returns
    ///
    /// * `Ok(PageResult)` - Complete result; some records may lack a stream link
    /// * `Err(ScrapeError::UpstreamFetch)` - The listing page could not be fetched
    /// * `Err(ScrapeError)` - The query was invalid
    pub async fn get_videos(&self, query: &PageQuery) -> Result<PageResult, ScrapeError> {
        query.validate()?;

        let url = listing_url(&query.base_location, &self.site, query.category, query.page)?;
        tracing::debug!("Fetching listing page: {}", url);

        let body = match self.fetcher.fetch(url.as_str()).await {
            FetchOutcome::Success { body } => body,
            FetchOutcome::Failure { kind, message } => {
                tracing::error!("Listing fetch failed for {}: {}", url, kind);
                return Err(ScrapeError::UpstreamFetch {
                    url: url.to_string(),
                    kind,
                    message,
                });
            }
        };

        let listing = parse_listing(&body, query.page_size);
        tracing::debug!(
            "Listing {} holds {} items, {} extracted",
            url,
            listing.total_items_seen,
            listing.records.len()
        );

        let items = self
            .coordinator
            .enrich(&query.base_location, listing.records)
            .await;

        let resolved = items.iter().filter(|r| r.stream_link.is_some()).count();
        tracing::info!(
            "Category {} page {}: {} items, {} with stream links",
            query.category,
            query.page,
            items.len(),
            resolved
        );

        Ok(PageResult::assemble(query, listing.total_items_seen, items))
    }

    /// Walks several categories page by page
    ///
    /// Each category is read from page 1 up to `max_pages`, stopping early
    /// once a listing page holds no items. A listing failure ends that
    /// category's walk and is recorded in `failures`; other categories carry on.
    /// A category listed more than once is walked only the first time.
    ///
    /// # Returns
    ///
    /// * `Ok(SweepResult)` - Records and failures per category
    /// * `Err(ScrapeError::InvalidQuery)` - Bad base location, page size or page budget
    pub async fn sweep(
        &self,
        base_location: &str,
        categories: &[u32],
        max_pages: u32,
        page_size: usize,
    ) -> Result<SweepResult, ScrapeError> {
        if max_pages < 1 {
            return Err(ScrapeError::InvalidQuery(
                "max_pages must be >= 1".to_string(),
            ));
        }

        let mut sweep = SweepResult::default();

        for &category in categories {
            if sweep.categories.contains_key(&category) {
                tracing::debug!("Category {} already swept, skipping", category);
                continue;
            }
            let records = sweep.categories.entry(category).or_default();

            for page in 1..=max_pages {
                let query = PageQuery::new(base_location, category, page, page_size)?;

                match self.get_videos(&query).await {
                    Ok(result) => {
                        if result.total_items_seen == 0 {
                            tracing::debug!("Category {} ends at page {}", category, page);
                            break;
                        }
                        records.extend(result.items);
                    }
                    Err(e @ ScrapeError::UpstreamFetch { .. }) => {
                        tracing::warn!("Stopping category {} at page {}: {}", category, page, e);
                        sweep.failures.insert(category, e.to_string());
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        tracing::info!(
            "Sweep complete: {} categories, {} records, {} failures",
            sweep.categories.len(),
            sweep.record_count(),
            sweep.failures.len()
        );

        Ok(sweep)
    }
}
