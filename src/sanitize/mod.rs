//! Content sanitization
//!
//! This module turns raw fetched bytes into the canonical
//! {title, links, clean text} triple the crawler records per resource.
//! Two variants exist: a markup-aware policy for HTML bodies and a
//! lightweight-markup policy for everything else. Variant selection is a
//! pure sniff of the body, never content-type negotiation.

mod html;
mod markdown;

pub use html::sanitize_markup;
pub use markdown::sanitize_light_markup;

use crate::graph::ContentKind;
use url::Url;

/// Canonical output of a sanitizer variant
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sanitized {
    /// Document title, if one was found
    pub title: Option<String>,

    /// Absolute outbound links in document order
    pub links: Vec<String>,

    /// Clean text rendering of the document
    pub clean_text: String,
}

/// Picks the sanitizer variant for a raw body
///
/// A body whose trimmed text begins with `<` is treated as markup; anything
/// else goes through the lightweight-markup lexer.
pub fn sniff_kind(body: &str) -> ContentKind {
    if body.trim_start().starts_with('<') {
        ContentKind::Markup
    } else {
        ContentKind::LightMarkup
    }
}

/// Runs the sanitizer variant for `kind` over `body`
///
/// `base` is the resource's own identifier; every discovered link is
/// resolved against it into absolute form.
pub fn sanitize(body: &str, base: &Url, kind: ContentKind) -> Sanitized {
    match kind {
        ContentKind::Markup => sanitize_markup(body, base),
        ContentKind::LightMarkup => sanitize_light_markup(body, base),
    }
}
