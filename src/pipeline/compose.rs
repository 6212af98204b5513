//! Page composition: wrap the cleaned article in a minimal HTML shell.
//!
//! The shell carries a charset declaration, the article title, the bundled
//! stylesheet, a viewport tag, the source page's author `<meta>` and a
//! visible byline. Every optional part is simply left out when the source
//! does not provide it, so the result is always a complete document.

use kuchikiki::NodeRef;
use maud::{html, PreEscaped, DOCTYPE};

/// Selector of the author tag re-embedded in the composed `<head>`.
pub const AUTHOR_SELECTOR: &str = "meta[name=author]";

/// Build the final page from a parsed document and its (already transformed)
/// article.
///
/// Title, byline and stylesheet href are escaped by `maud`; the author tag
/// and the article children are already-serialised markup.
pub fn compose_page(document: &NodeRef, article: Option<&NodeRef>, stylesheet_href: &str) -> String {
    let author_tag = document
        .select_first(AUTHOR_SELECTOR)
        .ok()
        .map(|tag| tag.as_node().clone());
    let title = article.and_then(article_title);
    let author = author_tag.as_ref().and_then(author_name);

    // Without a body the browser renders the markup as plain text.
    let page = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                @if let Some(text) = &title {
                    title { (text) }
                }
                link rel="stylesheet" href=(stylesheet_href);
                meta name="viewport" content="width=device-width,initial-scale=1";
                @if let Some(tag) = &author_tag {
                    (PreEscaped(tag.to_string()))
                }
            }
            body {
                @if let Some(name) = &author {
                    span class="author" { "Authored by " (name) }
                }
                @if let Some(article) = article {
                    @for child in article.children() {
                        (PreEscaped(child.to_string()))
                    }
                }
            }
        }
    };

    page.into_string()
}

/// Text of the article's first `<h1>`, trimmed; `None` when absent or blank.
pub fn article_title(article: &NodeRef) -> Option<String> {
    let heading = article.select_first("h1").ok()?;
    let text = heading.as_node().text_contents();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Non-empty `content` of an author `<meta>` tag.
fn author_name(tag: &NodeRef) -> Option<String> {
    let element = tag.as_element()?;
    let attributes = element.attributes.borrow();
    let content = attributes.get("content")?.trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}
