use std::fmt::Write;

use rankwatch_common::MergedRecord;

/// Shown instead of a table when there are no records.
pub const NO_DATA_HTML: &str = "<p>No data</p>";

/// HTML table of merged records, one row per record in record order.
pub fn render_table_html(records: &[MergedRecord]) -> String {
    if records.is_empty() {
        return NO_DATA_HTML.to_string();
    }

    let mut html = String::from(
        "<table class=\"metrics\">\n<thead><tr><th>Page</th><th>Clicks</th><th>Impressions</th><th>CTR (%)</th><th>Avg. position</th><th>Conversions</th></tr></thead>\n<tbody>\n",
    );
    for r in records {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td></tr>",
            html_escape(&r.page_key),
            r.clicks,
            r.impressions,
            r.ctr,
            r.avg_position,
            r.conversions
        );
    }
    html.push_str("</tbody>\n</table>");
    html
}

/// Chart x-axis labels: page keys in record order.
pub fn chart_labels(records: &[MergedRecord]) -> Vec<String> {
    records.iter().map(|r| r.page_key.clone()).collect()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankwatch_common::MetricRow;

    #[test]
    fn empty_records_render_placeholder() {
        assert_eq!(render_table_html(&[]), NO_DATA_HTML);
    }

    #[test]
    fn rows_render_in_order_and_escaped() {
        let mut a = MetricRow::new("https://example.com/a?x=<b>");
        a.clicks = 10;
        a.impressions = 100;
        a.ctr = 10.0;
        a.avg_position = 3.25;
        let b = MetricRow::new("https://example.com/b");

        let html = render_table_html(&[a, b]);
        assert!(html.contains("<td>https://example.com/a?x=&lt;b&gt;</td><td>10</td><td>100</td><td>10.00</td><td>3.25</td><td>0</td>"));
        let pos_a = html.find("example.com/a").unwrap();
        let pos_b = html.find("example.com/b").unwrap();
        assert!(pos_a < pos_b);
        assert_eq!(html.matches("<tr><td>").count(), 2);
    }

    #[test]
    fn labels_follow_record_order() {
        let labels = chart_labels(&[MetricRow::new("/b"), MetricRow::new("/a")]);
        assert_eq!(labels, vec!["/b", "/a"]);
    }
}
