//! Detail-page enrichment
//!
//! Resolves the stream link of every record on a listing page by fetching
//! its detail page. Fetches run concurrently, bounded by a semaphore, and
//! complete in any order; results are slotted back by index so the output
//! matches the input order exactly.

use crate::catalog::CatalogRecord;
use crate::config::{Config, SiteConfig};
use crate::pipeline::extractor::extract_stream_link;
use crate::pipeline::fetcher::{FetchOutcome, PageFetcher};
use crate::url::detail_url;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

/// Fans detail-page fetches out over a bounded number of concurrent requests
#[derive(Debug, Clone)]
pub struct FanOutCoordinator {
    fetcher: PageFetcher,
    site: SiteConfig,
    max_concurrent: usize,
    detail_attempts: u32,
}

impl FanOutCoordinator {
    /// Creates a coordinator
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetcher whose client and backoff policy are reused
    /// * `site` - Layout used to build detail URLs
    /// * `max_concurrent` - Upper bound on in-flight detail fetches
    /// * `detail_attempts` - Attempts per detail page
    pub fn new(
        fetcher: PageFetcher,
        site: SiteConfig,
        max_concurrent: usize,
        detail_attempts: u32,
    ) -> Self {
        Self {
            fetcher,
            site,
            max_concurrent: max_concurrent.max(1),
            detail_attempts: detail_attempts.max(1),
        }
    }

    /// Creates a coordinator from the fan-out and site configuration
    pub fn from_config(fetcher: PageFetcher, config: &Config) -> Self {
        Self::new(
            fetcher,
            config.site.clone(),
            config.fan_out.max_concurrent_details,
            config.fan_out.detail_max_attempts,
        )
    }

    /// Attaches stream links to records
    ///
    /// The output has the same length and order as `records`. A record whose
    /// id is empty, or whose detail page cannot be fetched or holds no player
    /// configuration, comes back with `stream_link` unset; siblings are
    /// unaffected.
    pub async fn enrich(
        &self,
        base_location: &str,
        records: Vec<CatalogRecord>,
    ) -> Vec<CatalogRecord> {
        let permits = Semaphore::new(self.max_concurrent);
        let mut slots: Vec<Option<CatalogRecord>> = vec![None; records.len()];

        let mut tasks: FuturesUnordered<_> = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let permits = &permits;
                async move {
                    let record = self.enrich_one(base_location, permits, record).await;
                    (index, record)
                }
            })
            .collect();

        while let Some((index, record)) = tasks.next().await {
            slots[index] = Some(record);
        }

        slots.into_iter().flatten().collect()
    }

    /// Resolves one record's link; never fails
    async fn enrich_one(
        &self,
        base_location: &str,
        permits: &Semaphore,
        record: CatalogRecord,
    ) -> CatalogRecord {
        if !record.has_external_id() {
            tracing::debug!("Skipping detail fetch for '{}': no id", record.title);
            return record;
        }

        let url = match detail_url(base_location, &self.site, &record.external_id) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    "Cannot build detail URL for id {}: {}",
                    record.external_id,
                    e
                );
                return record;
            }
        };

        // Closed only on drop, which cannot happen while tasks are running
        let Ok(_permit) = permits.acquire().await else {
            return record;
        };

        let outcome = self
            .fetcher
            .fetch_with(url.as_str(), self.detail_attempts, self.fetcher.timeout())
            .await;

        let link = match outcome {
            FetchOutcome::Success { body } => {
                let link = extract_stream_link(&body);
                if link.is_none() {
                    tracing::debug!("No player configuration on {}", url);
                }
                link
            }
            FetchOutcome::Failure { kind, message } => {
                tracing::warn!(
                    "Detail fetch for id {} failed, leaving link unset: {} ({})",
                    record.external_id,
                    kind,
                    message
                );
                None
            }
        };

        record.with_stream_link(link)
    }
}
