use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organic_results: Vec<OrganicResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One organic result. Only `link` and `title` are read; SerpAPI's own
/// `position` is ignored in favour of result order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Search locale: interface language (`hl`) and country (`gl`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub language: String,
    pub country: String,
}

impl Locale {
    pub fn new(language: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            country: country.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_organic_results_in_order() {
        let resp: SearchResponse = serde_json::from_str(
            r#"{"organic_results":[
                {"position":3,"link":"https://a.example","title":"A"},
                {"position":1,"link":"https://b.example"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(resp.organic_results.len(), 2);
        assert_eq!(resp.organic_results[0].link.as_deref(), Some("https://a.example"));
        assert!(resp.organic_results[1].title.is_none());
    }

    #[test]
    fn in_band_error_is_captured() {
        let resp: SearchResponse =
            serde_json::from_str(r#"{"error":"Your account has run out of searches."}"#).unwrap();
        assert!(resp.organic_results.is_empty());
        assert!(resp.error.is_some());
    }
}
