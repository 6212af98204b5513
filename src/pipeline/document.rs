//! Parsing helpers shared by the fetcher, the transformer and the composer.
//!
//! The DOM ([`NodeRef`]) is reference-counted and `!Send`, so trees are
//! always built and dropped inside synchronous code. Async callers only ever
//! hand raw bytes around.

use kuchikiki::traits::*;
use kuchikiki::NodeRef;

/// CSS selector of the primary content container.
pub const ARTICLE_SELECTOR: &str = "article";

/// Parse a complete HTML document.
///
/// Bytes that are not valid UTF-8 are decoded lossily; html5ever never
/// rejects input, so parsing cannot fail.
pub fn parse_document(raw: &[u8]) -> NodeRef {
    kuchikiki::parse_html().one(&*String::from_utf8_lossy(raw))
}

/// First `<article>` element of `document`, if any.
pub fn find_article(document: &NodeRef) -> Option<NodeRef> {
    document
        .select_first(ARTICLE_SELECTOR)
        .ok()
        .map(|article| article.as_node().clone())
}

/// Whether `raw` contains an article region yet.
pub fn contains_article(raw: &[u8]) -> bool {
    find_article(&parse_document(raw)).is_some()
}

/// Whether `node` is a text node holding only whitespace.
pub fn is_blank_text(node: &NodeRef) -> bool {
    node.as_text()
        .map(|text| text.borrow().trim().is_empty())
        .unwrap_or(false)
}
