use serde::{Deserialize, Serialize};

// --- Search Console: searchAnalytics.query ---

#[derive(Debug, Clone, Serialize)]
pub struct SearchAnalyticsRequest {
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    pub dimensions: Vec<String>,
    #[serde(rename = "rowLimit")]
    pub row_limit: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchAnalyticsResponse {
    #[serde(default)]
    pub rows: Vec<SearchAnalyticsRow>,
}

/// One row of search performance data. `ctr` is a fraction (0.0-1.0),
/// `keys` follow the order of the requested dimensions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchAnalyticsRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

// --- Analytics Data API: properties.runReport ---

#[derive(Debug, Clone, Serialize)]
pub struct RunReportRequest {
    #[serde(rename = "dateRanges")]
    pub date_ranges: Vec<DateRange>,
    pub dimensions: Vec<NamedField>,
    pub metrics: Vec<NamedField>,
    #[serde(rename = "dimensionFilter", skip_serializing_if = "Option::is_none")]
    pub dimension_filter: Option<FilterExpression>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedField {
    pub name: String,
}

impl NamedField {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterExpression {
    pub filter: Filter,
}

#[derive(Debug, Clone, Serialize)]
pub struct Filter {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "stringFilter")]
    pub string_filter: StringFilter,
}

#[derive(Debug, Clone, Serialize)]
pub struct StringFilter {
    pub value: String,
    #[serde(rename = "matchType")]
    pub match_type: String,
}

impl FilterExpression {
    /// Exact string match on a single dimension.
    pub fn exact(field_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            filter: Filter {
                field_name: field_name.into(),
                string_filter: StringFilter {
                    value: value.into(),
                    match_type: "EXACT".to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunReportResponse {
    #[serde(default)]
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "dimensionValues", default)]
    pub dimension_values: Vec<ReportValue>,
    #[serde(rename = "metricValues", default)]
    pub metric_values: Vec<ReportValue>,
}

/// Report values arrive as strings, numeric metrics included.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportValue {
    #[serde(default)]
    pub value: String,
}

impl ReportRow {
    pub fn dimension(&self, idx: usize) -> Option<&str> {
        self.dimension_values.get(idx).map(|v| v.value.as_str())
    }

    /// Numeric metric value; unparseable or missing values read as 0.
    pub fn metric(&self, idx: usize) -> f64 {
        self.metric_values
            .get(idx)
            .and_then(|v| v.value.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_rows_default_missing_metrics() {
        let resp: SearchAnalyticsResponse =
            serde_json::from_str(r#"{"rows":[{"keys":["seo tips","https://example.com/a"],"clicks":3}]}"#)
                .unwrap();
        assert_eq!(resp.rows.len(), 1);
        assert_eq!(resp.rows[0].clicks, 3.0);
        assert_eq!(resp.rows[0].impressions, 0.0);
    }

    #[test]
    fn empty_search_response_has_no_rows() {
        let resp: SearchAnalyticsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.rows.is_empty());
    }

    #[test]
    fn report_metric_parses_string_values() {
        let resp: RunReportResponse = serde_json::from_str(
            r#"{"rows":[{"dimensionValues":[{"value":"/a"}],"metricValues":[{"value":"7"}]}]}"#,
        )
        .unwrap();
        assert_eq!(resp.rows[0].dimension(0), Some("/a"));
        assert_eq!(resp.rows[0].metric(0), 7.0);
        assert_eq!(resp.rows[0].metric(1), 0.0);
    }

    #[test]
    fn exact_filter_serializes_like_the_api_expects() {
        let json = serde_json::to_value(FilterExpression::exact("pagePath", "/a")).unwrap();
        assert_eq!(json["filter"]["fieldName"], "pagePath");
        assert_eq!(json["filter"]["stringFilter"]["matchType"], "EXACT");
    }
}
