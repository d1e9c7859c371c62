use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};
use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;

/// Bare URLs (`scheme://host`, `www.host`) and email-like `user@host` tokens,
/// each with an optional path, query, and fragment.
static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?:[A-Za-z]{3,9}:(?://)?(?:[-;:&=+$,\w]+@)?[A-Za-z0-9.-]+(?::[0-9]+)?",
        r"|(?:www\.|[-;:&=+$,\w]+@)[A-Za-z0-9.-]+)",
        r"(?:(?:/[+~%/.\w-]*)?\??[-+=&;%@.\w]*#?[.!/\\\w]*)?",
    ))
    .expect("link pattern must be a valid regex")
});

/// A pulldown-cmark adapter that turns bare URLs and email addresses in text
/// into links. The matched text is used verbatim as the link target. Text that
/// is already inside a link, an image, or a code block is left alone.
///
/// Expects adjacent text events to be merged already, or URLs may be split.
pub struct AutoLinks<'a, I>
where
    I: Iterator<Item = Event<'a>>,
{
    iter: I,
    buffer: VecDeque<Event<'a>>,
    link_depth: usize,
    in_code: bool,
}

impl<'a, I> AutoLinks<'a, I>
where
    I: Iterator<Item = Event<'a>>,
{
    pub fn new(iter: I) -> Self {
        Self {
            iter,
            buffer: VecDeque::new(),
            link_depth: 0,
            in_code: false,
        }
    }

    /// Split a text event into plain text and link events, buffering them all.
    fn linkify(&mut self, text: CowStr<'a>) {
        let spans: Vec<_> = LINK_PATTERN.find_iter(&text).map(|m| m.range()).collect();
        if spans.is_empty() {
            self.buffer.push_back(Event::Text(text));
            return;
        }

        let mut last = 0;
        for span in spans {
            if span.start > last {
                self.buffer
                    .push_back(Event::Text(text[last..span.start].to_string().into()));
            }
            let url: CowStr<'a> = text[span.clone()].to_string().into();
            self.buffer.push_back(Event::Start(Tag::Link {
                link_type: LinkType::Inline,
                dest_url: url.clone(),
                title: CowStr::from(""),
                id: CowStr::from(""),
            }));
            self.buffer.push_back(Event::Text(url));
            self.buffer.push_back(Event::End(TagEnd::Link));
            last = span.end;
        }
        if last < text.len() {
            self.buffer
                .push_back(Event::Text(text[last..].to_string().into()));
        }
    }
}

impl<'a, I> Iterator for AutoLinks<'a, I>
where
    I: Iterator<Item = Event<'a>>,
{
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.buffer.pop_front() {
            return Some(event);
        }

        let event = self.iter.next()?;
        match event {
            Event::Text(text) if self.link_depth == 0 && !self.in_code => {
                self.linkify(text);
                self.buffer.pop_front()
            }
            Event::Start(Tag::Link { .. } | Tag::Image { .. }) => {
                self.link_depth += 1;
                Some(event)
            }
            Event::End(TagEnd::Link | TagEnd::Image) => {
                self.link_depth = self.link_depth.saturating_sub(1);
                Some(event)
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.in_code = true;
                Some(event)
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code = false;
                Some(event)
            }
            _ => Some(event),
        }
    }
}
