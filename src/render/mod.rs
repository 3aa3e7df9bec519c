//! Content rendering collaborator
//!
//! The pipeline consumes markup rendering through the [`MarkupRenderer`]
//! trait; [`CommonMark`] is the bundled implementation. `innertext` strips
//! markup back out of rendered HTML for search indexing and reading-time
//! word counts.

use pulldown_cmark::{html, Options, Parser};

/// Converts source markup to rendered HTML.
///
/// Consumed by the content mutation stage and, on preview, by the read
/// path when a draft revision exists.
pub trait MarkupRenderer: Send + Sync {
    fn render(&self, md: &str) -> String;
}

/// CommonMark renderer with tables, footnotes and strikethrough enabled
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonMark;

impl MarkupRenderer for CommonMark {
    fn render(&self, md: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let parser = Parser::new_ext(md, options);
        let mut out = String::with_capacity(md.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// Strips tags from an HTML fragment, leaving its text content.
///
/// Tag boundaries become spaces so adjacent block elements don't glue
/// words together.
pub fn innertext(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                if !text.ends_with(' ') && !text.is_empty() {
                    text.push(' ');
                }
            }
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Word count of an HTML fragment's text content
pub fn word_count(html: &str) -> usize {
    innertext(html).split_whitespace().count()
}
