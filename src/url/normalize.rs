use crate::UrlError;
use url::Url;

/// Normalizes a result link into a candidate identifier
///
/// # Normalization Steps
///
/// 1. Resolve `href` against `base` (result lists often use relative links)
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Lowercase the host
/// 4. Remove the query string (session and tracking state) and the fragment
/// 5. Remove a trailing slash (except for root /)
///
/// Two links to the same place therefore map to the same identifier no
/// matter which list render produced them.
///
/// # Examples
///
/// ```
/// use places_harvest::url::normalize_identifier;
/// use url::Url;
///
/// let base = Url::parse("https://www.google.com/maps/search/").unwrap();
/// let id = normalize_identifier("/maps/place/Acme/data=!4m7?authuser=0&hl=en", &base).unwrap();
/// assert_eq!(id, "https://www.google.com/maps/place/Acme/data=!4m7");
/// ```
pub fn normalize_identifier(href: &str, base: &Url) -> Result<String, UrlError> {
    let mut url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| UrlError::Malformed(format!("Missing host in {}", href)))?
        .to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    url.set_query(None);
    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Ok(url.to_string())
}

/// Builds the search URL for a query/location pair
///
/// The phrase "`query` in `location`" is appended to `base_url` as a single
/// percent-encoded path segment.
///
/// # Examples
///
/// ```
/// use places_harvest::url::build_search_url;
///
/// let url = build_search_url("https://www.google.com/maps/search/", "dentists", "Austin, TX").unwrap();
/// assert_eq!(url.as_str(), "https://www.google.com/maps/search/dentists%20in%20Austin,%20TX");
/// ```
pub fn build_search_url(base_url: &str, query: &str, location: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    let phrase = match (query.trim(), location.trim()) {
        (q, "") => q.to_string(),
        (q, l) => format!("{} in {}", q, l),
    };

    url.path_segments_mut()
        .map_err(|_| UrlError::Malformed(format!("{} cannot be a base", base_url)))?
        .pop_if_empty()
        .push(&phrase);

    Ok(url)
}
