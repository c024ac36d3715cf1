use crate::config::SiteConfig;
use crate::ScrapeError;
use url::Url;

/// Parses and checks a site root
///
/// # Arguments
///
/// * `base_location` - Site root such as `https://www.example.com`
///
/// # Returns
///
/// * `Ok(Url)` - The parsed root
/// * `Err(ScrapeError)` - Malformed URL or a non-HTTP(S) scheme
pub fn parse_base(base_location: &str) -> Result<Url, ScrapeError> {
    let url = Url::parse(base_location.trim())?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ScrapeError::InvalidQuery(format!(
            "base location must use http or https, got: {}",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Builds the URL of one listing page
///
/// # Examples
///
/// ```
/// use catalog_ripple::config::SiteConfig;
/// use catalog_ripple::url::listing_url;
///
/// let site = SiteConfig::with_base_url("https://example.com");
/// let url = listing_url("https://example.com/", &site, 5, 2).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/vodtype/5-2.html");
/// ```
pub fn listing_url(
    base_location: &str,
    site: &SiteConfig,
    category: u32,
    page: u32,
) -> Result<Url, ScrapeError> {
    let path = site
        .listing_path
        .replace("{category}", &category.to_string())
        .replace("{page}", &page.to_string());
    join_path(base_location, &path)
}

/// Builds the URL of a record's detail (player) page
///
/// # Examples
///
/// ```
/// use catalog_ripple::config::SiteConfig;
/// use catalog_ripple::url::detail_url;
///
/// let site = SiteConfig::with_base_url("https://example.com");
/// let url = detail_url("https://example.com", &site, "1234").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/vodplay/id/1234/sid/1/nid/1.html");
/// ```
pub fn detail_url(
    base_location: &str,
    site: &SiteConfig,
    external_id: &str,
) -> Result<Url, ScrapeError> {
    let path = site.detail_path.replace("{id}", external_id);
    join_path(base_location, &path)
}

/// Appends an absolute path to the root, keeping any path prefix the root carries
fn join_path(base_location: &str, path: &str) -> Result<Url, ScrapeError> {
    let base = parse_base(base_location)?;
    let root = base.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{}{}", root, path))?)
}
