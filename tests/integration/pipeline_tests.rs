//! Integration tests for the catalog pipeline
//!
//! These tests use wiremock to stand in for the catalog site and exercise
//! fetching, retry, enrichment and assembly end-to-end.

use catalog_ripple::config::Config;
use catalog_ripple::pipeline::{FetchOutcome, PageFetcher, RetryPolicy};
use catalog_ripple::{CatalogPipeline, FetchErrorKind, PageQuery, ScrapeError};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Listing item markup for the given id; an empty id yields a link without one
fn listing_item(id: &str) -> String {
    let href = if id.is_empty() {
        "/vodplay/latest.html".to_string()
    } else {
        format!("/vodplay/id/{}/sid/1/nid/1.html", id)
    };

    format!(
        r#"<li><div class="stui-vodlist__box">
            <a class="stui-vodlist__thumb lazyload" href="{href}" title="Video {id}" data-original="https://img.example/{id}.jpg">
                <span class="pic-text text-right">HD</span>
            </a>
            <div class="stui-vodlist__detail">
                <h4 class="title text-overflow"><a href="{href}">Video {id} full title</a></h4>
                <p class="text text-overflow text-muted"><span>100 plays</span> 2024-05-01</p>
            </div>
        </div></li>"#,
        href = href,
        id = id
    )
}

fn listing_page(ids: &[&str]) -> String {
    let items: Vec<String> = ids.iter().map(|id| listing_item(id)).collect();
    format!(
        r#"<html><head><title>Category</title></head><body>
        <ul class="stui-vodlist clearfix">{}</ul>
        </body></html>"#,
        items.join("\n")
    )
}

fn detail_page(id: &str) -> String {
    format!(
        r#"<html><body><div class="stui-player">
        <script type="text/javascript">var player_aaaa={{"flag":"play","url":"https:\/\/cdn.example\/{}.m3u8","from":"m3u8"}}</script>
        </div></body></html>"#,
        id
    )
}

fn detail_path(id: &str) -> String {
    format!("/vodplay/id/{}/sid/1/nid/1.html", id)
}

fn stream_link(id: &str) -> String {
    format!("https://cdn.example/{}.m3u8", id)
}

/// Creates a config pointed at the mock server with fast retries
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::for_site(base_url);
    config.fetcher.base_delay_ms = 10;
    config.fetcher.max_delay_ms = 100;
    config.fetcher.jitter = 0.0;
    config.fetcher.timeout_secs = 5;
    config
}

fn test_fetcher(max_attempts: u32, jitter: f64) -> PageFetcher {
    PageFetcher::new(
        reqwest::Client::new(),
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(200),
            jitter,
        },
        Duration::from_secs(5),
    )
}

async fn mount_listing(server: &MockServer, category: u32, page: u32, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/vodtype/{}-{}.html", category, page)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(ids))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(detail_path(id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_page(id))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_retries_then_succeeds() {
    let mock_server = MockServer::start().await;

    // First two attempts fail, third succeeds
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(3, 0.5);
    let url = format!("{}/flaky", mock_server.uri());
    let trace = fetcher.fetch_traced(&url, 3, Duration::from_secs(5)).await;

    assert_eq!(
        trace.outcome,
        FetchOutcome::Success {
            body: "finally".to_string()
        }
    );
    assert_eq!(trace.attempts, 3);
    assert_eq!(trace.backoffs.len(), 2);
    assert!(trace.backoffs[0] <= trace.backoffs[1]);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_fetch_exhausts_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(3, 0.0);
    let outcome = fetcher.fetch(&format!("{}/down", mock_server.uri())).await;

    match outcome {
        FetchOutcome::Failure { kind, .. } => {
            assert_eq!(
                kind,
                FetchErrorKind::ExhaustedRetries {
                    attempts: 3,
                    last: Box::new(FetchErrorKind::HttpStatusError(503)),
                }
            );
        }
        other => panic!("expected failure, got {:?}", other),
    }

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_single_attempt_reports_raw_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(1, 0.0);
    let trace = fetcher
        .fetch_traced(
            &format!("{}/missing", mock_server.uri()),
            1,
            Duration::from_secs(5),
        )
        .await;

    assert!(trace.backoffs.is_empty());
    assert!(matches!(
        trace.outcome,
        FetchOutcome::Failure {
            kind: FetchErrorKind::HttpStatusError(404),
            ..
        }
    ));
}

#[tokio::test]
async fn test_fetch_timeout_is_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = test_fetcher(1, 0.0);
    let outcome = fetcher
        .fetch_with(
            &format!("{}/slow", mock_server.uri()),
            1,
            Duration::from_millis(100),
        )
        .await;

    assert!(matches!(
        outcome,
        FetchOutcome::Failure {
            kind: FetchErrorKind::Timeout,
            ..
        }
    ));
}

#[tokio::test]
async fn test_connection_refused_is_classified() {
    let fetcher = test_fetcher(1, 0.0);
    let outcome = fetcher.fetch("http://127.0.0.1:1/").await;

    assert!(matches!(
        outcome,
        FetchOutcome::Failure {
            kind: FetchErrorKind::ConnectionError,
            ..
        }
    ));
}

#[tokio::test]
async fn test_get_videos_truncates_and_reports_has_next() {
    let mock_server = MockServer::start().await;
    let ids = ["1", "2", "3", "4", "5"];

    mount_listing(&mock_server, 5, 1, &ids).await;
    for id in ids {
        mount_detail(&mock_server, id, Duration::ZERO).await;
    }

    let config = create_test_config(&mock_server.uri());
    let pipeline = CatalogPipeline::new(&config).expect("Failed to build pipeline");
    let query = PageQuery::new(mock_server.uri(), 5, 1, 2).unwrap();

    let result = pipeline.get_videos(&query).await.expect("Pipeline failed");

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.total_items_seen, 5);
    assert!(result.has_next);
    assert_eq!(result.category, 5);
    assert_eq!(result.page, 1);
    assert_eq!(result.page_size, 2);

    assert_eq!(result.items[0].external_id, "1");
    assert_eq!(result.items[0].title, "Video 1");
    assert_eq!(result.items[0].stream_link, Some(stream_link("1")));
    assert_eq!(result.items[1].external_id, "2");
    assert_eq!(result.items[1].stream_link, Some(stream_link("2")));

    // Only the truncated items have their detail pages fetched
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_get_videos_without_next_page() {
    let mock_server = MockServer::start().await;
    let ids = ["10", "11"];

    mount_listing(&mock_server, 3, 2, &ids).await;
    for id in ids {
        mount_detail(&mock_server, id, Duration::ZERO).await;
    }

    let config = create_test_config(&mock_server.uri());
    let pipeline = CatalogPipeline::new(&config).unwrap();
    let query = PageQuery::new(mock_server.uri(), 3, 2, 20).unwrap();

    let result = pipeline.get_videos(&query).await.unwrap();
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.total_items_seen, 2);
    assert!(!result.has_next);
}

#[tokio::test]
async fn test_enrich_preserves_order_under_scrambled_completion() {
    let mock_server = MockServer::start().await;
    let ids = ["1", "2", "3", "4", "5", "6"];

    mount_listing(&mock_server, 1, 1, &ids).await;

    // Earlier items answer later, so completion order is reversed
    for (position, id) in ids.iter().enumerate() {
        let delay = Duration::from_millis(40 * (ids.len() - position) as u64);
        mount_detail(&mock_server, id, delay).await;
    }

    let mut config = create_test_config(&mock_server.uri());
    config.fan_out.max_concurrent_details = ids.len();
    let pipeline = CatalogPipeline::new(&config).unwrap();
    let query = PageQuery::new(mock_server.uri(), 1, 1, 10).unwrap();

    let result = pipeline.get_videos(&query).await.unwrap();

    let returned: Vec<&str> = result
        .items
        .iter()
        .map(|r| r.external_id.as_str())
        .collect();
    assert_eq!(returned, ids.to_vec());

    for record in &result.items {
        assert_eq!(record.stream_link, Some(stream_link(&record.external_id)));
    }
}

#[tokio::test]
async fn test_failed_detail_only_affects_its_record() {
    let mock_server = MockServer::start().await;
    let ids = ["1", "2", "3"];

    mount_listing(&mock_server, 1, 1, &ids).await;
    mount_detail(&mock_server, "1", Duration::ZERO).await;
    mount_detail(&mock_server, "3", Duration::ZERO).await;

    Mock::given(method("GET"))
        .and(path(detail_path("2")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let pipeline = CatalogPipeline::new(&config).unwrap();
    let query = PageQuery::new(mock_server.uri(), 1, 1, 10).unwrap();

    let result = pipeline
        .get_videos(&query)
        .await
        .expect("Detail failure must not fail the page");

    assert_eq!(result.items.len(), 3);
    assert_eq!(result.items[0].stream_link, Some(stream_link("1")));
    assert_eq!(result.items[1].stream_link, None);
    assert_eq!(result.items[1].title, "Video 2");
    assert_eq!(result.items[1].full_title, "Video 2 full title");
    assert_eq!(result.items[2].stream_link, Some(stream_link("3")));
}

#[tokio::test]
async fn test_detail_without_player_config_leaves_link_unset() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, 1, &["8"]).await;
    Mock::given(method("GET"))
        .and(path(detail_path("8")))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body><p>Removed</p></body></html>"),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let pipeline = CatalogPipeline::new(&config).unwrap();
    let query = PageQuery::new(mock_server.uri(), 1, 1, 10).unwrap();

    let result = pipeline.get_videos(&query).await.unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].external_id, "8");
    assert_eq!(result.items[0].stream_link, None);
}

#[tokio::test]
async fn test_empty_id_skips_detail_fetch() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, 1, &["1", ""]).await;
    mount_detail(&mock_server, "1", Duration::ZERO).await;

    let config = create_test_config(&mock_server.uri());
    let pipeline = CatalogPipeline::new(&config).unwrap();
    let query = PageQuery::new(mock_server.uri(), 1, 1, 10).unwrap();

    let result = pipeline.get_videos(&query).await.unwrap();

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[1].external_id, "");
    assert_eq!(result.items[1].stream_link, None);

    // One listing request and one detail request
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_listing_failure_is_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vodtype/4-1.html"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let pipeline = CatalogPipeline::new(&config).unwrap();
    let query = PageQuery::new(mock_server.uri(), 4, 1, 10).unwrap();

    let err = pipeline.get_videos(&query).await.unwrap_err();

    match err {
        ScrapeError::UpstreamFetch { url, kind, .. } => {
            assert!(url.ends_with("/vodtype/4-1.html"));
            assert_eq!(kind.root(), &FetchErrorKind::HttpStatusError(502));
        }
        other => panic!("expected upstream fetch error, got {:?}", other),
    }

    // Full retry policy was applied to the listing
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), config.fetcher.max_attempts as usize);
}

#[tokio::test]
async fn test_invalid_query_is_rejected_before_fetching() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());
    let pipeline = CatalogPipeline::new(&config).unwrap();

    let query = PageQuery {
        base_location: mock_server.uri(),
        category: 1,
        page: 0,
        page_size: 10,
    };

    let err = pipeline.get_videos(&query).await.unwrap_err();
    assert!(matches!(err, ScrapeError::InvalidQuery(_)));

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_fan_out_respects_concurrency_limit() {
    let mock_server = MockServer::start().await;
    let ids = ["1", "2", "3"];

    mount_listing(&mock_server, 1, 1, &ids).await;
    for id in ids {
        mount_detail(&mock_server, id, Duration::from_millis(100)).await;
    }

    let mut config = create_test_config(&mock_server.uri());
    config.fan_out.max_concurrent_details = 1;
    let pipeline = CatalogPipeline::new(&config).unwrap();
    let query = PageQuery::new(mock_server.uri(), 1, 1, 10).unwrap();

    let start = Instant::now();
    let result = pipeline.get_videos(&query).await.unwrap();

    // Serialised detail fetches take at least the sum of their delays
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert!(result.items.iter().all(|r| r.stream_link.is_some()));
}

#[tokio::test]
async fn test_timed_out_call_stops_detail_retries() {
    let mock_server = MockServer::start().await;
    let ids = ["1", "2"];
    let delay = Duration::from_millis(200);

    mount_listing(&mock_server, 1, 1, &ids).await;
    for id in ids {
        Mock::given(method("GET"))
            .and(path(detail_path(id)))
            .respond_with(ResponseTemplate::new(500).set_delay(delay))
            .mount(&mock_server)
            .await;
    }

    // Left running, each detail fetch would retry four more times
    let mut config = create_test_config(&mock_server.uri());
    config.fan_out.detail_max_attempts = 5;
    let pipeline = CatalogPipeline::new(&config).unwrap();
    let query = PageQuery::new(mock_server.uri(), 1, 1, 10).unwrap();

    let call = pipeline.get_videos(&query);
    let outcome = tokio::time::timeout(Duration::from_millis(100), call).await;
    assert!(outcome.is_err());

    let before = mock_server.received_requests().await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    let after = mock_server.received_requests().await.unwrap().len();

    assert!(before >= 1);
    assert_eq!(after, before, "detail fetches outlived the call");
}

#[tokio::test]
async fn test_sweep_walks_categories_and_records_failures() {
    let mock_server = MockServer::start().await;

    // Category 1: two populated pages, then an empty one
    mount_listing(&mock_server, 1, 1, &["1", "2"]).await;
    mount_listing(&mock_server, 1, 2, &["3"]).await;
    mount_listing(&mock_server, 1, 3, &[]).await;
    for id in ["1", "2", "3"] {
        mount_detail(&mock_server, id, Duration::ZERO).await;
    }

    // Category 2: listing is down
    Mock::given(method("GET"))
        .and(path("/vodtype/2-1.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let pipeline = CatalogPipeline::new(&config).unwrap();

    let sweep = pipeline
        .sweep(&mock_server.uri(), &[1, 2], 5, 20)
        .await
        .expect("Sweep failed");

    let category_one: Vec<&str> = sweep.categories[&1]
        .iter()
        .map(|r| r.external_id.as_str())
        .collect();
    assert_eq!(category_one, vec!["1", "2", "3"]);
    assert!(sweep.categories[&2].is_empty());
    assert!(sweep.failures.contains_key(&2));
    assert!(!sweep.failures.contains_key(&1));
    assert_eq!(sweep.record_count(), 3);

    // Page 4 of category 1 is never requested
    let requests = mock_server.received_requests().await.unwrap();
    let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
    assert!(!paths.contains(&"/vodtype/1-4.html"));
}

#[tokio::test]
async fn test_sweep_rejects_zero_pages() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());
    let pipeline = CatalogPipeline::new(&config).unwrap();

    let result = pipeline.sweep(&mock_server.uri(), &[1], 0, 20).await;
    assert!(matches!(result, Err(ScrapeError::InvalidQuery(_))));
}

#[tokio::test]
async fn test_sweep_walks_repeated_category_once() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, 1, &["1", "2"]).await;
    for id in ["1", "2"] {
        mount_detail(&mock_server, id, Duration::ZERO).await;
    }

    let config = create_test_config(&mock_server.uri());
    let pipeline = CatalogPipeline::new(&config).unwrap();

    let sweep = pipeline
        .sweep(&mock_server.uri(), &[1, 1], 1, 20)
        .await
        .expect("Sweep failed");

    assert_eq!(sweep.categories.len(), 1);
    assert_eq!(sweep.categories[&1].len(), 2);
    assert_eq!(sweep.record_count(), 2);

    let requests = mock_server.received_requests().await.unwrap();
    let listing_fetches = requests
        .iter()
        .filter(|r| r.url.path() == "/vodtype/1-1.html")
        .count();
    assert_eq!(listing_fetches, 1);
}
