//! Lightweight-markup sanitizer
//!
//! Runs the body through the pulldown-cmark block/inline lexer and walks the
//! event stream once: the first level-1 heading becomes the title, every
//! link destination is resolved against the base, and the visible text is
//! concatenated with blank-line separation after headings and paragraphs.
//! Horizontal rules, raw embedded HTML, tables, and images contribute
//! nothing; link events contribute only their label text; code bodies are
//! kept verbatim.

use crate::sanitize::Sanitized;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag};
use url::Url;

/// Sanitizes a lightweight-markup body into {title, links, clean text}
pub fn sanitize_light_markup(body: &str, base: &Url) -> Sanitized {
    let mut options = Options::empty();
    // Tables must lex as table events so the exclusion rule can see them.
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(body, options);

    let mut title: Option<String> = None;
    let mut title_buf = String::new();
    let mut capturing_title = false;

    let mut links: Vec<String> = Vec::new();
    let mut out = String::new();

    // Depth of excluded containers (tables, images) currently open
    let mut excluded = 0usize;

    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::Table(_) | Tag::Image(..) => excluded += 1,
                Tag::Link(_, dest, _) => {
                    if let Ok(absolute) = base.join(&dest) {
                        links.push(absolute.to_string());
                    }
                }
                Tag::Heading(level, ..) => {
                    if level == HeadingLevel::H1 && title.is_none() {
                        capturing_title = true;
                        title_buf.clear();
                    }
                }
                Tag::Item => {
                    if excluded == 0 {
                        if !out.is_empty() && !out.ends_with('\n') {
                            out.push('\n');
                        }
                        out.push_str("- ");
                    }
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                Tag::Table(_) | Tag::Image(..) => excluded = excluded.saturating_sub(1),
                Tag::Heading(..) => {
                    if capturing_title {
                        title = Some(title_buf.trim().to_string());
                        capturing_title = false;
                    }
                    if excluded == 0 {
                        push_block_separator(&mut out);
                    }
                }
                Tag::Paragraph => {
                    if excluded == 0 {
                        push_block_separator(&mut out);
                    }
                }
                Tag::Item => {
                    if excluded == 0 && !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
                Tag::CodeBlock(_) => {
                    if excluded == 0 && !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(text) => {
                if capturing_title {
                    title_buf.push_str(&text);
                }
                if excluded == 0 {
                    out.push_str(&text);
                }
            }
            Event::Code(code) => {
                if capturing_title {
                    title_buf.push_str(&code);
                }
                if excluded == 0 {
                    out.push_str(&code);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if excluded == 0 {
                    out.push('\n');
                }
            }
            // Horizontal rules and raw embedded markup are excluded entirely
            Event::Rule | Event::Html(_) => {}
            Event::FootnoteReference(_) | Event::TaskListMarker(_) => {}
        }
    }

    Sanitized {
        title: title.filter(|t| !t.is_empty()),
        links,
        clean_text: out.trim().to_string(),
    }
}

/// Ends a heading or paragraph with a blank line, without stacking
/// separators when the block contributed no visible text
fn push_block_separator(out: &mut String) {
    if out.is_empty() || out.ends_with("\n\n") {
        return;
    }
    if out.ends_with('\n') {
        out.push('\n');
    } else {
        out.push_str("\n\n");
    }
}
