use super::escape_html;
use pulldown_cmark::{Event, HeadingLevel, Tag, TagEnd};

#[derive(Debug, PartialEq, Eq)]
pub struct TocEntry {
    pub level: HeadingLevel,
    pub id: Option<String>,
    pub title: String,
}

/// A pulldown-cmark adapter that extracts a table of contents from a Markdown
/// document, i.e., a list of all the headings. When this iterator runs, it
/// pushes the TOC entries into a vector that you supply.
pub struct TableOfContents<'a, 'b, I>
where
    I: Iterator<Item = Event<'a>>,
{
    iter: I,
    pub entries: &'b mut Vec<TocEntry>,
    in_heading: bool,
}

impl<'a, 'b, I> TableOfContents<'a, 'b, I>
where
    I: Iterator<Item = Event<'a>>,
{
    pub fn new(iter: I, entries: &'b mut Vec<TocEntry>) -> Self {
        Self {
            iter,
            entries,
            in_heading: false,
        }
    }
}

impl<'a, 'b, I> Iterator for TableOfContents<'a, 'b, I>
where
    I: Iterator<Item = Event<'a>>,
{
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.iter.next()?;
        match &event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes: _,
                attrs: _,
            }) => {
                // Start building a new TOC entry for this heading.
                self.entries.push(TocEntry {
                    level: *level,
                    id: id.as_ref().map(|s| s.to_string()),
                    title: String::new(),
                });
                self.in_heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                // Finish a TOC entry.
                assert!(self.in_heading, "heading ended without starting");
                self.in_heading = false;
            }
            Event::Text(text) | Event::Code(text) => {
                if self.in_heading {
                    if let Some(entry) = self.entries.last_mut() {
                        entry.title += text;
                    } else {
                        panic!("no entry created for heading");
                    }
                }
            }
            _ => (),
        }
        Some(event)
    }
}

/// Close the list item on the last line, unless it's already closed.
fn close_item(lines: &mut [String]) {
    if let Some(last) = lines.last_mut()
        && !last.ends_with("</li>")
    {
        last.push_str("</li>");
    }
}

/// Lay out TOC entries as a nested `<ul>`, one tag per line, indented two
/// spaces per nesting level. Only headings up to `max_depth` are listed.
///
/// Levels that skip (an `h3` right under an `h1`) open a single nested list,
/// and an entry shallower than its list's parent (an `h2` at the top when the
/// document opens with `h3`s) joins the current list.
fn nested_list(entries: &[TocEntry], max_depth: u8) -> Vec<String> {
    let mut lines: Vec<String> = vec![];

    // Heading level of each open list. The bottom zero stands for "outside
    // any list".
    let mut stack: Vec<u8> = vec![0];
    let indent = |stack: &[u8]| "  ".repeat(stack.len() - 1);

    for entry in entries.iter().filter(|e| e.level as u8 <= max_depth) {
        let level = entry.level as u8;
        let top = stack.last().copied().unwrap_or(0);
        if level > top {
            lines.push(format!("{}<ul>", indent(&stack)));
            stack.push(level);
        } else {
            while stack.len() > 2 && level <= stack[stack.len() - 2] {
                stack.pop();
                close_item(&mut lines);
                lines.push(format!("{}</ul></li>", indent(&stack)));
            }
            close_item(&mut lines);
            if let Some(top) = stack.last_mut() {
                *top = level;
            }
        }
        lines.push(format!(
            "{}<li><a href=\"#{}\">{}</a>",
            indent(&stack),
            escape_html(entry.id.as_deref().unwrap_or_default()),
            escape_html(&entry.title),
        ));
    }

    while stack.len() > 1 {
        stack.pop();
        close_item(&mut lines);
        lines.push(format!("{}</ul>", indent(&stack)));
    }

    lines
}

/// Render the table of contents as an HTML fragment without the outermost
/// `<ul>` wrapper, so a template can embed it in a list of its own.
pub fn fragment(entries: &[TocEntry], max_depth: u8) -> String {
    let lines = nested_list(entries, max_depth);
    if lines.len() < 2 {
        return String::new();
    }
    lines[1..lines.len() - 1]
        .iter()
        .map(|line| line.strip_prefix("  ").unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The text of the first entry that appears in the table of contents.
pub fn first_title(entries: &[TocEntry], max_depth: u8) -> Option<&str> {
    entries
        .iter()
        .find(|e| e.level as u8 <= max_depth)
        .map(|e| e.title.as_str())
}
