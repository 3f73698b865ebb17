//! Canonical page identifiers.
//!
//! A page_key is either a full URL (`https://host[:port]/path`) or, for sources
//! that only report paths, a bare path (`/path`). Normalization forces the https
//! scheme, lowercases the host, strips any leading `www.` labels, drops query,
//! fragment and userinfo, and trims trailing slashes except on the root path.
//! Two rows refer to the same page iff their normalized keys are byte-identical.

use url::Url;

/// Normalize a URL-like string into a page_key. Idempotent.
///
/// Inputs that cannot be parsed as a URL are returned trimmed but otherwise
/// untouched, so they only ever merge with themselves.
pub fn normalize_page_key(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if trimmed.starts_with('/') && !trimmed.starts_with("//") {
        return trim_trailing_slash(strip_query_and_fragment(trimmed)).to_string();
    }

    // Any scheme is rewritten to https before parsing so host handling is
    // always that of a special scheme.
    let with_scheme = if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{rest}")
    } else if let Some((_, rest)) = trimmed.split_once("://") {
        format!("https://{rest}")
    } else {
        format!("https://{trimmed}")
    };

    let Ok(parsed) = Url::parse(&with_scheme) else {
        return trimmed.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return trimmed.to_string();
    };

    let mut host = host;
    while let Some(rest) = host.strip_prefix("www.") {
        host = rest;
    }

    let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();

    format!(
        "https://{host}{port}{}",
        trim_trailing_slash(parsed.path())
    )
}

/// Path component of a page_key, used by sources keyed on paths only.
pub fn page_path(page_key: &str) -> String {
    let normalized = normalize_page_key(page_key);
    if normalized.starts_with('/') {
        return normalized;
    }
    match Url::parse(&normalized) {
        Ok(parsed) => trim_trailing_slash(parsed.path()).to_string(),
        Err(_) => "/".to_string(),
    }
}

fn strip_query_and_fragment(path: &str) -> &str {
    match path.find(['?', '#']) {
        Some(idx) => &path[..idx],
        None => path,
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forces_https_and_strips_www() {
        assert_eq!(
            normalize_page_key("http://www.Example.com/blog/"),
            "https://example.com/blog"
        );
    }

    #[test]
    fn root_keeps_its_slash() {
        assert_eq!(normalize_page_key("https://example.com"), "https://example.com/");
        assert_eq!(normalize_page_key("https://example.com///"), "https://example.com/");
        assert_eq!(normalize_page_key("/"), "/");
    }

    #[test]
    fn drops_query_and_fragment() {
        assert_eq!(
            normalize_page_key("https://example.com/a/?utm_source=x#top"),
            "https://example.com/a"
        );
        assert_eq!(normalize_page_key("/a/?ref=1"), "/a");
    }

    #[test]
    fn bare_domain_gets_scheme() {
        assert_eq!(normalize_page_key("example.com/a"), "https://example.com/a");
    }

    #[test]
    fn keeps_non_default_port() {
        assert_eq!(
            normalize_page_key("http://example.com:8080/a/"),
            "https://example.com:8080/a"
        );
        assert_eq!(normalize_page_key("http://example.com:443/a"), "https://example.com/a");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "http://www.Example.com/blog/",
            "https://www.www.example.com/",
            "example.com",
            "//cdn.example.com/x/",
            "/a/b/?q=1",
            "/",
            "",
            "  https://example.com/a b  ",
            "http://example.com:443/a",
            "https://example.com:80/a",
            "https://例え.jp/パス/",
            "not a url at all",
            "mailto:someone@example.com",
            "foo://EXAMPLE.com/x/",
            "https://www./",
        ];
        for s in samples {
            let once = normalize_page_key(s);
            assert_eq!(normalize_page_key(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn page_path_extracts_path() {
        assert_eq!(page_path("https://example.com/a/b/"), "/a/b");
        assert_eq!(page_path("https://example.com"), "/");
        assert_eq!(page_path("/c/"), "/c");
    }
}
