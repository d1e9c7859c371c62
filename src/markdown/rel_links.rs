use pulldown_cmark::{CowStr, Event, Tag};

/// A pulldown_cmark adapter that rewrites relative links between articles. A
/// link to `./notes/foo.md` becomes a link to `foo.html`, since every article
/// is rendered at the top level of the output. Absolute links are left
/// unchanged.
pub struct RewriteRelativeLinks<I> {
    iter: I,
}

impl<'a, I> RewriteRelativeLinks<I>
where
    I: Iterator<Item = Event<'a>>,
{
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<'a, I> Iterator for RewriteRelativeLinks<I>
where
    I: Iterator<Item = Event<'a>>,
{
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(match self.iter.next()? {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let url = if is_absolute_url(&dest_url) {
                    dest_url
                } else {
                    rewrite_url(dest_url)
                };
                Event::Start(Tag::Link {
                    link_type,
                    dest_url: url,
                    title,
                    id,
                })
            }
            e => e,
        })
    }
}

/// Check whether a URL is absolute, i.e., starts with a protocol.
fn is_absolute_url(url: &str) -> bool {
    let colon = url.find(':');
    let slash = url.find('/');
    match (colon, slash) {
        (Some(c), Some(s)) if c < s => true,
        (Some(_), None) => true,
        (_, Some(s)) => match url.find("//") {
            Some(ss) if ss <= s => true,
            _ => false,
        },
        (None, None) => false,
    }
}

/// Rewrite a link to a `.md` file as a link to that article's page, keeping
/// any `#fragment` or `?query`. Other URLs are returned unchanged.
fn rewrite_url(url: CowStr) -> CowStr {
    let (path, suffix) = url.split_at(url.find(['#', '?']).unwrap_or(url.len()));
    let rewritten = path.strip_suffix(".md").map(|base| {
        let stem = base.rsplit('/').next().unwrap_or(base);
        format!("{stem}.html{suffix}")
    });
    match rewritten {
        Some(s) => s.into(),
        None => url,
    }
}
