//! Syntax highlighting for fenced code blocks, using syntect's class-based
//! HTML output so the colors live in a separate stylesheet.

use super::escape_html;
use anyhow::{Result, anyhow};
use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};
use std::sync::LazyLock;
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Highlighted spans and the stylesheet must agree on this.
const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// Generate the CSS for a syntect theme, matching the markup produced by
/// [`HighlightCode`].
pub fn stylesheet(theme_name: &str) -> Result<String> {
    let themes = ThemeSet::load_defaults();
    let theme = themes
        .themes
        .get(theme_name)
        .ok_or_else(|| anyhow!("unknown highlight theme `{theme_name}`"))?;
    Ok(css_for_theme_with_class_style(theme, CLASS_STYLE)?)
}

/// Highlight `code` as the language named by `token`, falling back to plain
/// text for languages syntect doesn't know.
fn highlight(code: &str, token: &str) -> String {
    let ss = &*SYNTAX_SET;
    let syntax = ss
        .find_syntax_by_token(token)
        .unwrap_or_else(|| ss.find_syntax_plain_text());

    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, ss, CLASS_STYLE);
    let body = LinesWithEndings::from(code)
        .try_for_each(|line| generator.parse_html_for_line_which_includes_newline(line))
        .map(|()| generator.finalize())
        .unwrap_or_else(|_| escape_html(code));

    format!(
        "<div class=\"codehilite\"><pre><code class=\"language-{}\">{}</code></pre></div>\n",
        escape_html(token),
        body
    )
}

/// A pulldown-cmark adapter that replaces fenced code blocks carrying a
/// language tag with highlighted HTML. Other code blocks pass through.
pub struct HighlightCode<I> {
    iter: I,
}

impl<'a, I> HighlightCode<I>
where
    I: Iterator<Item = Event<'a>>,
{
    pub fn new(iter: I) -> Self {
        Self { iter }
    }

    /// Gather the text of the code block we're in, through its end.
    fn consume_code(&mut self) -> String {
        let mut code = String::new();
        for event in self.iter.by_ref() {
            match event {
                Event::Text(text) => code.push_str(&text),
                Event::End(TagEnd::CodeBlock) => break,
                _ => (),
            }
        }
        code
    }
}

impl<'a, I> Iterator for HighlightCode<I>
where
    I: Iterator<Item = Event<'a>>,
{
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.iter.next()?;
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                // The info string may carry more than the language, e.g.
                // `rust,ignore` or `python title="x"`.
                let token = info
                    .split(|c: char| c.is_whitespace() || c == ',')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                if token.is_empty() {
                    return Some(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))));
                }
                let code = self.consume_code();
                Some(Event::Html(highlight(&code, &token).into()))
            }
            _ => Some(event),
        }
    }
}
