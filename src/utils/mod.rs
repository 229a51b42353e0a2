//! Utility functions and helpers.

pub mod date;
pub mod http;

use scraper::{Html, Node};
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Elements that break a line when rendered.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

/// Extract visible text from an HTML fragment.
///
/// Inline markup joins its text directly (`GPT-<i>4</i>o` reads `GPT-4o`);
/// block elements separate words.
pub fn strip_html(fragment: &str) -> String {
    if !fragment.contains('<') && !fragment.contains('&') {
        return normalize_whitespace(fragment);
    }
    let doc = Html::parse_fragment(fragment);
    let mut text = String::with_capacity(fragment.len());
    for node in doc.root_element().descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if BLOCK_ELEMENTS.contains(&e.name()) => text.push(' '),
            _ => {}
        }
    }
    normalize_whitespace(&text)
}

/// Keep at most `limit` words, appending an ellipsis when text was cut.
pub fn truncate_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > limit {
        format!("{}...", words[..limit].join(" "))
    } else {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Hello <b>world</b></p>\n<p>again</p>"),
            "Hello world again"
        );
        assert_eq!(strip_html("  plain   text "), "plain text");
        assert_eq!(strip_html("Fish &amp; chips"), "Fish & chips");
    }

    #[test]
    fn test_strip_html_inline_markup_keeps_words_whole() {
        assert_eq!(strip_html("GPT-<i>4</i>o release"), "GPT-4o release");
        assert_eq!(strip_html("Scaling LLM<sub>s</sub> further"), "Scaling LLMs further");
        assert_eq!(strip_html("<li>one</li><li>two</li>"), "one two");
        assert_eq!(strip_html("line<br>break"), "line break");
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("a b c d", 2), "a b...");
        assert_eq!(truncate_words("a  b", 5), "a b");
        assert_eq!(truncate_words("", 5), "");
    }
}
