//! Article cleanup: strip presentation clutter from the article subtree.
//!
//! ## Step Order
//!
//! The steps run in a fixed order and later steps rely on earlier ones:
//!
//! 1. Strip the byline/date block that follows the first `<h1>`
//! 2. Remove `class` and `id` from every element
//! 3. Replace `<noscript>` image fallbacks with the image they carry
//! 4. Mark every image `loading="lazy"`
//! 5. Unwrap every `<section>`
//!
//! Every step is deterministic, so transforming a cached copy yields the same
//! page as transforming the fresh fetch it came from.

use crate::error::RenderWarning;
use crate::pipeline::document::is_blank_text;
use kuchikiki::traits::*;
use kuchikiki::NodeRef;
use tracing::debug;

/// Apply all cleanup steps to `article`, in place.
///
/// Never fails; fallbacks that could not be recovered are reported as
/// [`RenderWarning::NoscriptSkipped`].
pub fn transform_article(article: &NodeRef) -> Vec<RenderWarning> {
    let mut warnings = Vec::new();

    let stripped = strip_meta_header(article);
    let cleaned = remove_clutter(article);
    let recovered = recover_noscript_images(article, &mut warnings);
    let lazy = mark_images_lazy(article);
    let unwrapped = flatten_sections(article);

    debug!(
        "Transformed article: meta header {}, {} elements cleaned, {} images recovered, {} lazy, {} sections unwrapped",
        if stripped { "removed" } else { "absent" },
        cleaned,
        recovered,
        lazy,
        unwrapped
    );

    warnings
}

// ── Step 1: Strip meta header ────────────────────────────────────────────────
//
// The element right after the first heading carries the author avatar, the
// date and the reading time. This is positional, not content-aware: if the
// source layout changes, the wrong element goes.

fn strip_meta_header(article: &NodeRef) -> bool {
    let Ok(heading) = article.select_first("h1") else {
        return false;
    };
    match heading.as_node().following_siblings().elements().next() {
        Some(next) => {
            next.as_node().detach();
            true
        }
        None => false,
    }
}

// ── Step 2: Remove clutter ───────────────────────────────────────────────────

/// Remove `class` and `id` from `root` and every element below it.
///
/// Iterative walk over the subtree; returns the number of elements that lost
/// at least one attribute.
pub fn remove_clutter(root: &NodeRef) -> usize {
    let mut cleaned = 0;
    for element in root.inclusive_descendants().elements() {
        let mut attributes = element.attributes.borrow_mut();
        let had_class = attributes.remove("class").is_some();
        let had_id = attributes.remove("id").is_some();
        if had_class || had_id {
            cleaned += 1;
        }
    }
    cleaned
}

// ── Step 3: Recover noscript images ──────────────────────────────────────────
//
// The source page lazy-loads a low-resolution placeholder and keeps the real
// `<img>` inside `<noscript>`. With scripting enabled the parser keeps the
// noscript body as raw text, so it has to be parsed on its own.

fn recover_noscript_images(article: &NodeRef, warnings: &mut Vec<RenderWarning>) -> usize {
    let noscripts: Vec<NodeRef> = match article.select("noscript") {
        Ok(selection) => selection.map(|n| n.as_node().clone()).collect(),
        Err(()) => return 0,
    };

    let mut recovered = 0;
    for noscript in noscripts {
        // An earlier replacement may already have removed this one.
        if !noscript.ancestors().any(|ancestor| ancestor == *article) {
            continue;
        }

        match extract_fallback_image(&noscript) {
            Ok(image) => {
                remove_clutter(&image);
                let target = match noscript.parent() {
                    Some(parent) if parent != *article => parent,
                    _ => noscript,
                };
                target.insert_before(image);
                target.detach();
                recovered += 1;
            }
            Err(reason) => {
                debug!("Skipping noscript fallback: {}", reason);
                warnings.push(RenderWarning::NoscriptSkipped { reason });
            }
        }
    }
    recovered
}

/// Parse the raw markup of `noscript` and pull out its image.
///
/// The fragment must have exactly one top-level node (whitespace and
/// comments aside) and contain an `<img>`.
fn extract_fallback_image(noscript: &NodeRef) -> Result<NodeRef, String> {
    let markup = noscript.text_contents();
    if markup.trim().is_empty() {
        return Err("empty noscript".to_string());
    }

    let fragment = kuchikiki::parse_html().one(markup.as_str());
    let body = fragment
        .select_first("body")
        .map_err(|()| "fragment has no body".to_string())?;

    let top_level = body
        .as_node()
        .children()
        .filter(|child| !is_blank_text(child) && child.as_comment().is_none())
        .count();
    if top_level != 1 {
        return Err(format!("fragment has {top_level} top-level nodes"));
    }

    let image = body
        .as_node()
        .select_first("img")
        .map_err(|()| "fragment has no <img>".to_string())?;
    let image = image.as_node().clone();
    image.detach();
    Ok(image)
}

// ── Step 4: Lazy-load hinting ────────────────────────────────────────────────

fn mark_images_lazy(article: &NodeRef) -> usize {
    let Ok(images) = article.select("img") else {
        return 0;
    };
    let mut marked = 0;
    for image in images {
        image
            .attributes
            .borrow_mut()
            .insert("loading", "lazy".to_string());
        marked += 1;
    }
    marked
}

// ── Step 5: Flatten sections ─────────────────────────────────────────────────
//
// Headings inside `<section>` get demoted by some browsers' default
// stylesheets, so h1 and h2 end up looking alike.

fn flatten_sections(article: &NodeRef) -> usize {
    let sections: Vec<NodeRef> = match article.select("section") {
        Ok(selection) => selection.map(|s| s.as_node().clone()).collect(),
        Err(()) => return 0,
    };

    // Document order: an outer section is unwrapped before its inner ones,
    // which stay attached and are unwrapped in turn.
    for section in &sections {
        unwrap_node(section);
    }
    sections.len()
}

/// Replace `node` by its children, keeping their order.
fn unwrap_node(node: &NodeRef) {
    while let Some(child) = node.first_child() {
        node.insert_before(child);
    }
    node.detach();
}
