mod add_ids;
mod autolink;
mod highlight;
mod rel_links;
mod toc;

pub use highlight::stylesheet;

use pulldown_cmark::{Options, Parser, TextMergeStream, html::push_html};
use regex::Regex;
use std::sync::LazyLock;

/// Deepest heading level listed in the table of contents.
pub const TOC_DEPTH: u8 = 4;

static LEADING_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A\s*#[ \t]*([^\n]*)").expect("heading pattern must be a valid regex")
});

pub struct Rendered {
    pub html: String,
    /// The nested table of contents, minus its outermost `<ul>`.
    pub toc: String,
    /// The first heading listed in the table of contents, if any, escaped
    /// the same way as its anchor text in `toc`.
    pub toc_title: Option<String>,
}

pub fn render(source: &str) -> Rendered {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);

    let mut html_buf = String::new();
    let mut toc_entries = vec![];

    let iter = TextMergeStream::new(Parser::new_ext(source, options));
    let iter = add_ids::AddHeadingIds::new(iter);
    let iter = rel_links::RewriteRelativeLinks::new(iter);
    let iter = autolink::AutoLinks::new(iter);
    let iter = highlight::HighlightCode::new(iter);
    let iter = toc::TableOfContents::new(iter, &mut toc_entries);

    push_html(&mut html_buf, iter);
    Rendered {
        html: html_buf,
        toc: toc::fragment(&toc_entries, TOC_DEPTH),
        toc_title: toc::first_title(&toc_entries, TOC_DEPTH).map(escape_html),
    }
}

/// The text of a `#` heading on the first non-blank line of `body`, trimmed.
///
/// This only looks at the source text, so it works without rendering.
pub fn leading_heading(body: &str) -> Option<&str> {
    LEADING_HEADING
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Escape text for use in HTML content or a quoted attribute.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_on_first_line() {
        assert_eq!(leading_heading("# Hello\n\nworld"), Some("Hello"));
    }

    #[test]
    fn heading_after_blank_lines() {
        assert_eq!(leading_heading("\n\n  #   Spaced out  \r\nbody"), Some("Spaced out"));
    }

    #[test]
    fn heading_without_space() {
        assert_eq!(leading_heading("#Tight"), Some("Tight"));
    }

    #[test]
    fn no_leading_heading() {
        assert_eq!(leading_heading("intro\n# Later"), None);
        assert_eq!(leading_heading(""), None);
    }

    #[test]
    fn rendered_title_and_toc() {
        let r = render("# Hello\n\nworld\n\n## Part one\n");
        assert_eq!(
            r.html,
            "<h1 id=\"hello\">Hello</h1>\n<p>world</p>\n<h2 id=\"part-one\">Part one</h2>\n"
        );
        assert_eq!(
            r.toc,
            "<li><a href=\"#hello\">Hello</a>\n<ul>\n  <li><a href=\"#part-one\">Part one</a></li>\n</ul></li>"
        );
        assert_eq!(r.toc_title.as_deref(), Some("Hello"));
    }

    #[test]
    fn no_headings() {
        let r = render("just text");
        assert_eq!(r.html, "<p>just text</p>\n");
        assert_eq!(r.toc, "");
        assert_eq!(r.toc_title, None);
    }

    #[test]
    fn toc_title_from_later_heading() {
        let r = render("intro\n\n## Setup\n");
        assert_eq!(r.toc_title.as_deref(), Some("Setup"));
    }

    #[test]
    fn toc_title_is_escaped() {
        let r = render("# a &lt;script&gt; & b\n");
        assert_eq!(r.toc_title.as_deref(), Some("a &lt;script&gt; &amp; b"));
        assert!(r.toc.contains(">a &lt;script&gt; &amp; b</a>"));
    }

    #[test]
    fn deep_headings_not_in_toc() {
        let r = render("##### Tiny\n");
        assert_eq!(r.html, "<h5 id=\"tiny\">Tiny</h5>\n");
        assert_eq!(r.toc, "");
        assert_eq!(r.toc_title, None);
    }

    #[test]
    fn tables() {
        let r = render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(r.html.contains("<table>"));
        assert!(r.html.contains("<td>1</td>"));
    }

    #[test]
    fn footnotes() {
        let r = render("text[^1]\n\n[^1]: the note\n");
        assert!(r.html.contains("footnote-reference"));
        assert!(r.html.contains("the note"));
    }

    #[test]
    fn fenced_code_is_highlighted() {
        let r = render("```python\nprint('hi')\n```\n");
        assert!(r.html.contains("codehilite"));
    }

    #[test]
    fn links_in_body() {
        let r = render("See [the intro](intro.md) or https://example.com.");
        assert!(r.html.contains("<a href=\"intro.html\">the intro</a>"));
        assert!(r.html.contains("<a href=\"https://example.com"));
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
