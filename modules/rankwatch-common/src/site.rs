use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::InsightError;
use crate::page_key::normalize_page_key;

/// A web property in Search Console addressing terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SiteKey {
    /// Whole-domain property, e.g. `example.com` (no `www.`).
    Domain(String),
    /// URL-prefix property, e.g. `https://example.com/blog` (no trailing slash).
    UrlPrefix(String),
}

impl SiteKey {
    /// Resolve free-form user input into a property identifier.
    ///
    /// A bare host becomes a domain property; anything carrying a path, query
    /// or fragment becomes a URL-prefix property.
    pub fn resolve(input: &str) -> Result<Self, InsightError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(InsightError::InvalidInput(
                "site URL is empty; expected something like https://example.com".to_string(),
            ));
        }

        if let Some(domain) = trimmed.strip_prefix("sc-domain:") {
            return Self::resolve(domain).and_then(|key| match key {
                SiteKey::Domain(d) => Ok(SiteKey::Domain(d)),
                SiteKey::UrlPrefix(_) => Err(InsightError::InvalidInput(format!(
                    "domain property must not carry a path: {trimmed}"
                ))),
            });
        }

        let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };

        let parsed = Url::parse(&with_scheme).map_err(|e| {
            InsightError::InvalidInput(format!(
                "invalid site URL {trimmed:?} ({e}); expected something like https://example.com"
            ))
        })?;
        let host = parsed.host_str().filter(|h| !h.is_empty()).ok_or_else(|| {
            InsightError::InvalidInput(format!("site URL has no hostname: {trimmed}"))
        })?;

        let has_path = !parsed.path().trim_matches(|c| c == '/' || c == ' ').is_empty();
        if has_path || parsed.query().is_some() || parsed.fragment().is_some() {
            let authority = match parsed.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            let prefix = format!(
                "{}://{}{}",
                parsed.scheme(),
                authority,
                parsed.path().trim_end_matches('/')
            );
            return Ok(SiteKey::UrlPrefix(prefix));
        }

        let mut domain = host;
        while let Some(rest) = domain.strip_prefix("www.") {
            domain = rest;
        }
        if domain.is_empty() {
            return Err(InsightError::InvalidInput(format!(
                "site URL has no hostname: {trimmed}"
            )));
        }
        Ok(SiteKey::Domain(domain.to_string()))
    }

    /// Identifier in the form the Search Console API expects.
    pub fn source_id(&self) -> String {
        match self {
            SiteKey::Domain(domain) => format!("sc-domain:{domain}"),
            SiteKey::UrlPrefix(prefix) => format!("{prefix}/"),
        }
    }

    /// Page key standing in for the whole site when no page can be selected.
    pub fn root_page_key(&self) -> String {
        match self {
            SiteKey::Domain(domain) => normalize_page_key(&format!("https://{domain}/")),
            SiteKey::UrlPrefix(prefix) => normalize_page_key(prefix),
        }
    }
}

impl std::fmt::Display for SiteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_is_domain_property() {
        let key = SiteKey::resolve("www.example.com").unwrap();
        assert_eq!(key, SiteKey::Domain("example.com".into()));
        assert_eq!(key.source_id(), "sc-domain:example.com");
        assert_eq!(key.root_page_key(), "https://example.com/");
    }

    #[test]
    fn trailing_slash_only_is_still_domain() {
        let key = SiteKey::resolve("https://example.com/").unwrap();
        assert_eq!(key, SiteKey::Domain("example.com".into()));
    }

    #[test]
    fn path_makes_url_prefix() {
        let key = SiteKey::resolve("https://example.com/blog/").unwrap();
        assert_eq!(key, SiteKey::UrlPrefix("https://example.com/blog".into()));
        assert_eq!(key.source_id(), "https://example.com/blog/");
        assert_eq!(key.root_page_key(), "https://example.com/blog");
    }

    #[test]
    fn existing_domain_property_accepted() {
        let key = SiteKey::resolve("sc-domain:example.com").unwrap();
        assert_eq!(key, SiteKey::Domain("example.com".into()));
    }

    #[test]
    fn garbage_is_invalid_input() {
        assert!(matches!(
            SiteKey::resolve("   "),
            Err(InsightError::InvalidInput(_))
        ));
        assert!(matches!(
            SiteKey::resolve("http://exa mple.com"),
            Err(InsightError::InvalidInput(_))
        ));
    }
}
