//! Site URL canonicalization and API root construction.

/// Path of the bulk manager REST namespace below a site's base URL.
pub const API_NAMESPACE: &str = "wp-json/wpbm/v1/";

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a site base URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove query and fragment
/// 5. Remove trailing slashes from the path
///
/// Sites installed in a subdirectory keep their path, so
/// `https://Example.com/blog/` becomes `https://example.com/blog`.
pub fn canonicalize_base(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);
    parsed.set_query(None);

    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);

    Ok(parsed)
}

/// Root URL of the REST namespace, always ending in `/` so that
/// [`url::Url::join`] appends endpoints instead of replacing the last segment.
pub fn api_root(base: &url::Url) -> Result<url::Url, UrlError> {
    let base = base.as_str().trim_end_matches('/');
    url::Url::parse(&format!("{base}/{API_NAMESPACE}")).map_err(|e| UrlError::InvalidUrl(e.to_string()))
}

/// Base URL as used in cache keys: no trailing slash.
pub fn base_key(base: &url::Url) -> String {
    base.as_str().trim_end_matches('/').to_string()
}
