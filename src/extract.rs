use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Readable text and absolute link targets pulled out of one HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    pub links: Vec<String>,
}

/// Extracts the model-facing text and the outgoing links from raw HTML.
///
/// Text walks `p`, `h1`-`h6`, `li` and `a` elements in document order:
/// anchors become `Link: <text> (<href>) - Title: <title>` lines, list items
/// are bulleted, headings are set off on their own lines. Links are every
/// `a[href]` resolved against `page_url`; hrefs that cannot be resolved are
/// skipped.
pub fn extract(html: &str, page_url: &Url) -> Extracted {
    let doc = Html::parse_document(html);

    let content_selector = Selector::parse("p, h1, h2, h3, h4, h5, h6, li, a").unwrap();
    let mut lines: Vec<String> = Vec::new();
    for element in doc.select(&content_selector) {
        let text = visible_text(&element);
        let line = match element.value().name() {
            "a" => {
                let href = element.value().attr("href").unwrap_or("");
                let title = element
                    .value()
                    .attr("title")
                    .filter(|t| !t.is_empty())
                    .unwrap_or("No title");
                format!("Link: {text} ({href}) - Title: {title}")
            }
            "li" => format!("• {text}"),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => format!("\nHeading: {text}\n"),
            _ => text,
        };
        if !line.is_empty() {
            lines.push(line);
        }
    }

    let link_selector = Selector::parse("a[href]").unwrap();
    let mut links: Vec<String> = Vec::new();
    for element in doc.select(&link_selector) {
        if let Some(href) = element.value().attr("href") {
            if let Ok(absolute) = page_url.join(href) {
                links.push(absolute.to_string());
            }
        }
    }

    ::log::debug!("extracted {} links from {}", links.len(), page_url);

    Extracted {
        text: lines.join("\n"),
        links,
    }
}

/// Descendant text with script and style subtrees left out
fn visible_text(element: &ElementRef<'_>) -> String {
    use ego_tree::iter::Edge;

    let mut chunks: Vec<&str> = Vec::new();
    let mut skip_depth = 0usize;

    for edge in element.traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                scraper::Node::Element(el) => {
                    if matches!(el.name(), "script" | "style") {
                        skip_depth += 1;
                    }
                }
                scraper::Node::Text(text) => {
                    if skip_depth == 0 {
                        chunks.push(text);
                    }
                }
                _ => {}
            },
            Edge::Close(node) => {
                if let scraper::Node::Element(el) = node.value() {
                    if matches!(el.name(), "script" | "style") && skip_depth > 0 {
                        skip_depth -= 1;
                    }
                }
            }
        }
    }

    chunks.concat().trim().to_string()
}
