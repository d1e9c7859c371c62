use pulldown_cmark::{CowStr, Event, Tag, TagEnd};
use std::collections::{HashMap, VecDeque};

/// Slugify a string and append it to a buffer.
fn slug_append(buf: &mut String, s: &str) {
    let mut last_is_dash = buf.ends_with('-');
    buf.extend(s.chars().filter_map(|c| {
        if c.is_alphanumeric() {
            last_is_dash = false;
            Some(c.to_ascii_lowercase())
        } else if last_is_dash {
            None
        } else {
            last_is_dash = true;
            Some('-')
        }
    }));
}

/// A pulldown-cmark adapter that adds IDs to headings that don't already have
/// them by "slugifying" the heading's text. Repeated slugs within one document
/// get a numeric suffix, so `# Notes` twice yields `notes` and `notes-2`.
pub struct AddHeadingIds<'a, I>
where
    I: Iterator<Item = Event<'a>>,
{
    iter: I,
    buffer: VecDeque<Event<'a>>,
    used: HashMap<String, usize>,
}

impl<'a, I> AddHeadingIds<'a, I>
where
    I: Iterator<Item = Event<'a>>,
{
    pub fn new(iter: I) -> Self {
        Self {
            iter,
            buffer: VecDeque::new(),
            used: HashMap::new(),
        }
    }

    /// Assuming that `self` is now just after the beginning of a header, buffer
    /// up all the events until the header in `self.buffer`. Return the
    /// slugified version of the header's text contents.
    fn consume_heading(&mut self) -> String {
        assert!(self.buffer.is_empty(), "nested headings are not allowed");
        let mut slugbuf = String::new();

        // This is crying out for a `take_until` iterator method; `take_while`
        // doesn't quite cut it.
        for future_event in self.iter.by_ref() {
            let is_end = match &future_event {
                Event::End(TagEnd::Heading(_)) => true,
                Event::Text(text) | Event::Code(text) => {
                    slug_append(&mut slugbuf, text);
                    false
                }
                _ => false,
            };
            self.buffer.push_back(future_event);
            if is_end {
                break;
            }
        }

        let slug = slugbuf.trim_matches('-');
        if slug.is_empty() {
            "section".to_string()
        } else {
            slug.to_string()
        }
    }

    /// Make `slug` unique among the IDs this adapter has handed out.
    fn dedupe(&mut self, slug: String) -> String {
        let count = self.used.entry(slug.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            slug
        } else {
            format!("{slug}-{count}")
        }
    }
}

impl<'a, I> Iterator for AddHeadingIds<'a, I>
where
    I: Iterator<Item = Event<'a>>,
{
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        // Unbuffer the next buffered event, if any.
        if let Some(event) = self.buffer.pop_front() {
            return Some(event);
        }

        let event = self.iter.next()?;
        match event {
            Event::Start(Tag::Heading {
                level,
                id: None,
                classes,
                attrs,
            }) => {
                // It's a heading without an ID. We do our thing.
                let slug = self.consume_heading();
                let slug = self.dedupe(slug);
                Some(Event::Start(Tag::Heading {
                    level,
                    id: Some(CowStr::from(slug)),
                    classes,
                    attrs,
                }))
            }
            _ => Some(event),
        }
    }
}
