//! HTML extraction for listing and detail pages
//!
//! Listing pages hold one `<li>` per video inside a `stui-vodlist` list. Each
//! item needs a thumbnail anchor and a detail block; everything else is
//! optional and defaults to an empty string. Detail pages embed the player
//! configuration as a JSON object in an inline script.

use crate::catalog::CatalogRecord;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Token identifying the inline script that carries the player configuration
pub const PLAYER_MARKER: &str = "player_aaaa";

static ITEM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/id/(\d+)/").expect("valid item id pattern"));

static PLAYER_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""url"\s*:\s*"([^"]+)""#).expect("valid player url pattern"));

/// Selectors for the listing layout
struct ListingSelectors {
    item: Selector,
    thumb: Selector,
    detail: Selector,
    quality: Selector,
    full_title: Selector,
    meta: Selector,
    play_count: Selector,
}

static LISTING: LazyLock<ListingSelectors> = LazyLock::new(|| ListingSelectors {
    item: css("ul.stui-vodlist > li"),
    thumb: css("a.stui-vodlist__thumb"),
    detail: css(".stui-vodlist__detail"),
    quality: css("span.pic-text"),
    full_title: css("h4.title a"),
    meta: css("p.text"),
    play_count: css("span"),
});

static SCRIPT: LazyLock<Selector> = LazyLock::new(|| css("script"));

fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("valid static selector")
}

/// Item records from one listing page
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Number of item fragments on the page, before any truncation
    pub total_items_seen: usize,

    /// Records extracted from the first `limit` items, in page order
    pub records: Vec<CatalogRecord>,
}

/// Parses a listing page into records
///
/// Every item fragment counts toward `total_items_seen`; only the first
/// `limit` are extracted, and items missing required structure are dropped.
pub fn parse_listing(html: &str, limit: usize) -> ListingPage {
    let document = Html::parse_document(html);
    let items: Vec<ElementRef> = document.select(&LISTING.item).collect();

    let records = items
        .iter()
        .take(limit)
        .filter_map(|item| record_from_item(*item))
        .collect();

    ListingPage {
        total_items_seen: items.len(),
        records,
    }
}

/// Extracts a record from one listing item's HTML
///
/// Returns `None` when the thumbnail anchor or the detail block is missing.
///
/// # Example
///
/// ```
/// use catalog_ripple::pipeline::extract_listing_item;
///
/// let html = r#"<li>
///   <a class="stui-vodlist__thumb" href="/id/1234/sid/1.html" title="Clip"></a>
///   <div class="stui-vodlist__detail"><h4 class="title"><a>Clip (full)</a></h4></div>
/// </li>"#;
/// let record = extract_listing_item(html).unwrap();
/// assert_eq!(record.external_id, "1234");
/// assert_eq!(record.full_title, "Clip (full)");
/// ```
pub fn extract_listing_item(fragment: &str) -> Option<CatalogRecord> {
    let fragment = Html::parse_fragment(fragment);
    record_from_item(fragment.root_element())
}

fn record_from_item(item: ElementRef) -> Option<CatalogRecord> {
    let thumb = item.select(&LISTING.thumb).next()?;
    let detail = item.select(&LISTING.detail).next()?;

    let external_id = thumb
        .value()
        .attr("href")
        .and_then(external_id_from_href)
        .unwrap_or_default();

    let meta = detail.select(&LISTING.meta).next();

    Some(CatalogRecord {
        external_id,
        title: attr(thumb, "title").unwrap_or_default(),
        image_url: attr(thumb, "data-original").unwrap_or_default(),
        quality_label: first_text(thumb, &LISTING.quality).unwrap_or_default(),
        full_title: first_text(detail, &LISTING.full_title).unwrap_or_default(),
        play_count: meta
            .and_then(|meta| first_text(meta, &LISTING.play_count))
            .unwrap_or_default(),
        release_date: meta.and_then(trailing_text).unwrap_or_default(),
        stream_link: None,
    })
}

/// Pulls the numeric item id out of a link such as `/vodplay/id/1234/sid/1.html`
pub fn external_id_from_href(href: &str) -> Option<String> {
    ITEM_ID
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
}

fn attr(element: ElementRef, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(|value| value.trim().to_string())
}

fn first_text(scope: ElementRef, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}

/// Last non-blank text node directly under the element
fn trailing_text(element: ElementRef) -> Option<String> {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .last()
        .map(str::to_string)
}

/// Extracts the stream URL from a detail page's player configuration
///
/// Returns `None` when no script carries the player marker or the script
/// holds no `"url"` value.
///
/// # Example
///
/// ```
/// use catalog_ripple::pipeline::extract_stream_link;
///
/// let html = r#"<script>var player_aaaa={"url":"https:\/\/cdn.example\/a.m3u8"}</script>"#;
/// assert_eq!(
///     extract_stream_link(html).as_deref(),
///     Some("https://cdn.example/a.m3u8")
/// );
/// ```
pub fn extract_stream_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    document
        .select(&SCRIPT)
        .map(|script| script.text().collect::<String>())
        .filter(|source| source.contains(PLAYER_MARKER))
        .find_map(|source| {
            PLAYER_URL
                .captures(&source)
                .and_then(|caps| caps.get(1))
                .map(|url| url.as_str().replace('\\', ""))
        })
}
