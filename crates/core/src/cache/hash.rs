//! Site-qualified cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a GET request.
///
/// The key covers the site base URL, the endpoint (leading and trailing
/// slashes ignored) and the query parameters sorted by name then value, so
/// the order in which parameters were supplied never changes the key.
pub fn compute_cache_key<K, V>(site_url: &str, endpoint: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())).collect();
    pairs.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(site_url.trim_end_matches('/').as_bytes());
    hasher.update(b"\n");
    hasher.update(endpoint.trim_matches('/').as_bytes());
    hasher.update(b"\n");
    for (key, value) in pairs {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://example.com";

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key(SITE, "content", &[("type", "page")]);
        let hash2 = compute_cache_key(SITE, "content", &[("type", "page")]);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_param_order_independence() {
        let hash1 = compute_cache_key(SITE, "content", &[("a", "1"), ("b", "2")]);
        let hash2 = compute_cache_key(SITE, "content", &[("b", "2"), ("a", "1")]);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_is_site_qualified() {
        let hash1 = compute_cache_key("https://one.example", "content", &[("page", "1")]);
        let hash2 = compute_cache_key("https://two.example", "content", &[("page", "1")]);
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_params() {
        let hash1 = compute_cache_key(SITE, "content", &[("page", "1")]);
        let hash2 = compute_cache_key(SITE, "content", &[("page", "2")]);
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_endpoint_slashes_ignored() {
        let params: [(&str, &str); 0] = [];
        assert_eq!(compute_cache_key(SITE, "/media/", &params), compute_cache_key(SITE, "media", &params));
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key(SITE, "content", &[("type", "post")]);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
