//! Title and description extraction from raw HTML.
//!
//! Malformed markup yields empty strings, never errors.

use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use ai_client::truncate_to_char_boundary;
use rankwatch_common::PageMetadata;

/// Bytes of markup handed to the parser.
const PARSE_LIMIT: usize = 200_000;

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head title").unwrap());
static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head meta[content]").unwrap());
static BLOCK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, p").unwrap());

/// Page title and meta description. `<title>` wins over `og:title`; the
/// `description` meta tag wins over `og:description`. Missing values are "".
pub fn extract_page_metadata(html: &str) -> PageMetadata {
    page_metadata(&parse(html))
}

/// A short description of a page in its own words: the meta description when
/// present, otherwise the first heading joined with the paragraph after it.
pub fn extract_self_description(html: &str) -> String {
    let document = parse(html);
    let meta = page_metadata(&document);
    if !meta.description.is_empty() {
        return meta.description;
    }

    // Document order, so the first <p> after the heading is its paragraph.
    let mut heading_text = String::new();
    let mut paragraph_text = String::new();
    for element in document.select(&BLOCK_SELECTOR) {
        let is_heading = element.value().name() != "p";
        if is_heading && heading_text.is_empty() {
            heading_text = element_text(&element);
            if !heading_text.is_empty() {
                paragraph_text.clear();
            }
        } else if !is_heading && paragraph_text.is_empty() {
            paragraph_text = element_text(&element);
            if !heading_text.is_empty() && !paragraph_text.is_empty() {
                break;
            }
        }
    }

    [heading_text, paragraph_text]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse(html: &str) -> Html {
    Html::parse_document(truncate_to_char_boundary(html, PARSE_LIMIT))
}

fn page_metadata(document: &Html) -> PageMetadata {
    let metas = meta_contents(document);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
        .or_else(|| metas.get("og:title").cloned())
        .unwrap_or_default();

    let description = metas
        .get("description")
        .or_else(|| metas.get("og:description"))
        .cloned()
        .unwrap_or_default();

    PageMetadata { title, description }
}

/// `name`/`property` -> `content` for every head meta tag, first occurrence wins.
fn meta_contents(document: &Html) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for element in document.select(&META_SELECTOR) {
        let attrs = element.value();
        let content = collapse_whitespace(attrs.attr("content").unwrap_or_default());
        if content.is_empty() {
            continue;
        }
        for key in ["name", "property"] {
            if let Some(name) = attrs.attr(key) {
                out.entry(name.trim().to_ascii_lowercase())
                    .or_insert_with(|| content.clone());
            }
        }
    }
    out
}

fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
