use crate::UrlError;
use url::Url;

/// Normalizes a URL into its frontier form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject schemes other than http and https
/// 3. Reject URLs without a host
/// 4. Remove the query string
/// 5. Remove the fragment
///
/// Parsing also applies the `url` crate's canonical serialization (lowercase
/// scheme and host, `/` for an empty path), so the result is stable: feeding a
/// normalized URL back in returns it unchanged.
///
/// # Examples
///
/// ```
/// use tidepool::url::normalize_url;
///
/// let url = normalize_url("https://a.test/page?id=3#top").unwrap();
/// assert_eq!(url, "https://a.test/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_query(None);
    url.set_fragment(None);

    Ok(url.into())
}
