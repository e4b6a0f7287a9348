//! Disambiguation tags in dispatched URLs.
//!
//! Timing entries are indexed by URL, so two concurrent requests to the same
//! endpoint (a REST resource hit with GET and POST, say) would resolve to
//! the same entry. Each request therefore carries its own tag as an extra
//! query parameter, and the timing lookup uses the tagged URL.

use url::Url;

use super::keys::RequestTag;

/// Default query parameter name carrying the tag.
pub const DEFAULT_TAG_PARAM: &str = "_eareqid";

/// Appends `param=tag` to `url`, keeping any fragment last.
pub fn append_tag(url: &str, param: &str, tag: RequestTag) -> String {
    let (base, fragment) = match url.find('#') {
        Some(idx) => url.split_at(idx),
        None => (url, ""),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{param}={tag}{fragment}")
}

/// Recovers the tag from a URL produced by [`append_tag`].
///
/// Relative URLs are resolved against a placeholder origin so that paths
/// such as `/api/users?_eareqid=1` parse as well.
pub fn extract_tag(url: &str, param: &str) -> Option<RequestTag> {
    let base = Url::parse("http://localhost/").ok()?;
    let parsed = Url::options().base_url(Some(&base)).parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(name, _)| name == param)
        .and_then(|(_, value)| value.parse().ok())
        .map(RequestTag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_without_query() {
        let url = append_tag("https://api.example.com/users", DEFAULT_TAG_PARAM, RequestTag(42));
        assert_eq!(url, "https://api.example.com/users?_eareqid=42");
    }

    #[test]
    fn test_append_with_existing_query() {
        let url = append_tag("/users?page=2", DEFAULT_TAG_PARAM, RequestTag(42));
        assert_eq!(url, "/users?page=2&_eareqid=42");
    }

    #[test]
    fn test_append_keeps_fragment_last() {
        let url = append_tag("/users?page=2#top", DEFAULT_TAG_PARAM, RequestTag(7));
        assert_eq!(url, "/users?page=2&_eareqid=7#top");

        let url = append_tag("/users#top", DEFAULT_TAG_PARAM, RequestTag(7));
        assert_eq!(url, "/users?_eareqid=7#top");
    }

    #[test]
    fn test_extract_round_trip() {
        let tag = RequestTag(1_700_000_000_123);
        for url in ["https://a.example/x", "/x?y=1", "/x?y=1#frag"] {
            let tagged = append_tag(url, DEFAULT_TAG_PARAM, tag);
            assert_eq!(extract_tag(&tagged, DEFAULT_TAG_PARAM), Some(tag));
        }
    }

    #[test]
    fn test_extract_missing_or_garbage() {
        assert_eq!(extract_tag("/x?y=1", DEFAULT_TAG_PARAM), None);
        assert_eq!(extract_tag("/x?_eareqid=abc", DEFAULT_TAG_PARAM), None);
    }

    #[test]
    fn test_custom_param_name() {
        let url = append_tag("/x", "rid", RequestTag(3));
        assert_eq!(url, "/x?rid=3");
        assert_eq!(extract_tag(&url, "rid"), Some(RequestTag(3)));
        assert_eq!(extract_tag(&url, DEFAULT_TAG_PARAM), None);
    }
}
