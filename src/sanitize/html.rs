//! Markup-aware sanitizer
//!
//! Classifies every element of an HTML document through a fixed tag→policy
//! table and renders the surviving content bottom-up into an inline
//! lightweight-markup form: `#`-prefixed headings, `[text](href)` anchors,
//! bulleted list items, `*`/`**`/backtick inline markers. Layout wrappers
//! are unwrapped in place, non-content subtrees are dropped entirely.

use crate::sanitize::Sanitized;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// What the policy table says to do with a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagPolicy {
    /// Content-bearing; rendered with its lightweight-markup form
    Keep,
    /// Discard the element, splice its children into place
    Unwrap,
    /// Discard the element and its entire subtree
    Remove,
}

/// Total tag→policy classification
///
/// Tags absent from the table fall open to `Unwrap`, so unknown or novel
/// elements lose their markup but never their text.
fn policy(tag: &str) -> TagPolicy {
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "a" | "ul" | "ol" | "li" | "table"
        | "thead" | "tbody" | "tr" | "th" | "td" | "em" | "i" | "strong" | "b" | "u" | "code"
        | "pre" | "blockquote" => TagPolicy::Keep,

        "script" | "style" | "iframe" | "noscript" | "template" | "meta" | "link" | "canvas"
        | "svg" | "img" | "picture" | "audio" | "video" | "source" | "track" | "embed"
        | "object" | "input" | "button" | "select" | "option" | "optgroup" | "textarea"
        | "label" | "datalist" | "output" => TagPolicy::Remove,

        // div, span, section, article, main, header, footer, nav, aside and
        // anything unlisted
        _ => TagPolicy::Unwrap,
    }
}

struct RenderContext<'a> {
    base: &'a Url,
    links: Vec<String>,
}

/// Sanitizes an HTML body into {title, links, clean text}
pub fn sanitize_markup(body: &str, base: &Url) -> Sanitized {
    let document = Html::parse_document(body);

    let title = extract_title(&document);

    let mut ctx = RenderContext {
        base,
        links: Vec::new(),
    };

    let mut rendered = String::new();
    if let Ok(body_selector) = Selector::parse("body") {
        if let Some(body_element) = document.select(&body_selector).next() {
            rendered = render_children(body_element, &mut ctx, false);
        }
    }

    Sanitized {
        title,
        links: ctx.links,
        clean_text: normalize_text(&rendered),
    }
}

/// Trimmed text of the first `title` element, if any
fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn render_children(element: ElementRef, ctx: &mut RenderContext, preserve: bool) -> String {
    let mut out = String::new();

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if preserve {
                    out.push_str(&text.text);
                } else {
                    push_collapsed(&mut out, &text.text);
                }
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    let rendered = render_element(child_element, ctx, preserve);
                    out.push_str(&rendered);
                }
            }
            _ => {}
        }
    }

    out
}

fn render_element(element: ElementRef, ctx: &mut RenderContext, preserve: bool) -> String {
    let tag = element.value().name();

    match policy(tag) {
        TagPolicy::Remove => String::new(),
        TagPolicy::Unwrap => render_children(element, ctx, preserve),
        TagPolicy::Keep => render_kept(tag, element, ctx, preserve),
    }
}

/// Renders a content-bearing element in its lightweight-markup form
///
/// Every attribute is ignored except `href` on anchors.
fn render_kept(tag: &str, element: ElementRef, ctx: &mut RenderContext, preserve: bool) -> String {
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().unwrap_or(1);
            let inner = render_children(element, ctx, false);
            format!("\n\n{} {}\n\n", "#".repeat(level), inner.trim())
        }
        "p" | "blockquote" => {
            let inner = render_children(element, ctx, false);
            format!("\n\n{}\n\n", inner.trim())
        }
        "li" => {
            let inner = render_children(element, ctx, false);
            format!("- {}\n", inner.trim())
        }
        "ul" | "ol" => {
            let inner = render_children(element, ctx, false);
            format!("\n\n{}\n", inner)
        }
        "a" => render_anchor(element, ctx),
        "em" | "i" => {
            let inner = render_children(element, ctx, false);
            format!("*{}*", inner.trim())
        }
        "strong" | "b" => {
            let inner = render_children(element, ctx, false);
            format!("**{}**", inner.trim())
        }
        "u" => render_children(element, ctx, false),
        "code" => {
            let inner = render_children(element, ctx, preserve);
            if preserve {
                inner
            } else {
                format!("`{}`", inner.trim())
            }
        }
        "pre" => {
            let inner = render_children(element, ctx, true);
            format!("\n\n{}\n\n", inner.trim_matches('\n'))
        }
        "table" => {
            let inner = render_children(element, ctx, false);
            format!("\n\n{}\n", inner)
        }
        "thead" | "tbody" => render_children(element, ctx, false),
        "tr" => {
            let inner = render_children(element, ctx, false);
            format!("{}\n", inner.trim_end())
        }
        "th" | "td" => {
            let inner = render_children(element, ctx, false);
            format!("{} ", inner.trim())
        }
        _ => render_children(element, ctx, preserve),
    }
}

/// Renders an anchor, recording its resolved target
///
/// Anchors whose href is a script-execution pseudo-scheme or a bare in-page
/// fragment are unwrapped: the inner text survives as plain content and no
/// link is recorded. Hrefs that fail to resolve against the base are dropped
/// the same way.
fn render_anchor(element: ElementRef, ctx: &mut RenderContext) -> String {
    let inner = render_children(element, ctx, false);

    let href = match element.value().attr("href") {
        Some(h) => h.trim(),
        None => return inner,
    };
    if href.is_empty() || is_inert_reference(href) {
        return inner;
    }

    match ctx.base.join(href) {
        Ok(absolute) => {
            let absolute = absolute.to_string();
            ctx.links.push(absolute.clone());
            format!("[{}]({})", inner.trim(), absolute)
        }
        Err(_) => inner,
    }
}

/// True for hrefs that never name a fetchable resource
fn is_inert_reference(href: &str) -> bool {
    href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:")
}

/// Appends a text node with HTML whitespace collapsing
///
/// Whitespace runs become a single space, and no space is emitted at the
/// start of the output or directly after a newline, so block separators stay
/// clean.
fn push_collapsed(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch.is_whitespace() {
            match out.chars().last() {
                None | Some('\n') | Some(' ') => {}
                _ => out.push(' '),
            }
        } else {
            out.push(ch);
        }
    }
}

/// Final clean-text normalization: runs of 3+ newlines collapse to exactly
/// 2, trailing spaces before a newline are dropped, ends are trimmed.
fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newline_run = 0usize;

    for ch in text.chars() {
        if ch == '\n' {
            newline_run += 1;
            if newline_run <= 2 {
                while out.ends_with(' ') {
                    out.pop();
                }
                out.push('\n');
            }
        } else {
            newline_run = 0;
            out.push(ch);
        }
    }

    out.trim().to_string()
}
