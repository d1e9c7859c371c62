use crate::error::{Error, Result};
use crate::{frontmatter, markdown};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// The publish time of articles that don't give a `date`.
pub fn default_published_at() -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
        .fixed_offset()
}

/// One Markdown source file, which becomes one page of the site.
///
/// Every field always has a value. Until [`Article::load`] succeeds, the
/// derived ones hold empty or default values.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    /// Where to read the Markdown from.
    #[serde(skip)]
    pub path: PathBuf,

    /// The source path relative to the content root.
    #[serde(skip)]
    pub rel_path: PathBuf,

    /// File stem of the source, unique within a site. Also the output name.
    pub name: String,

    /// Compares by instant, whatever the offset.
    #[serde(rename = "datetime")]
    pub published_at: DateTime<FixedOffset>,

    /// `published_at` as `YYYY-MM-DD`, in its own offset.
    #[serde(rename = "date")]
    pub date_label: String,

    pub tags: Vec<String>,
    pub title: String,
    pub content: String,
    pub toc: String,
}

impl Article {
    /// Make an article for a source file, without reading it yet.
    pub fn new(path: &Path, rel_path: &Path) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut article = Self {
            path: path.into(),
            rel_path: rel_path.into(),
            name,
            published_at: default_published_at(),
            date_label: String::new(),
            tags: vec![],
            title: String::new(),
            content: String::new(),
            toc: String::new(),
        };
        article.reset();
        article
    }

    /// Put all derived fields back to their defaults.
    fn reset(&mut self) {
        self.set_published_at(default_published_at());
        self.tags.clear();
        self.title.clear();
        self.content.clear();
        self.toc.clear();
    }

    fn set_published_at(&mut self, published_at: DateTime<FixedOffset>) {
        self.published_at = published_at;
        self.date_label = published_at.format("%Y-%m-%d").to_string();
    }

    /// Read the source file and derive everything from it: front-matter,
    /// title, and (if `convert_markdown` is set) the HTML content and table of
    /// contents. Loading again re-reads the file from scratch.
    ///
    /// On error the article is left with default values.
    pub fn load(&mut self, convert_markdown: bool) -> Result<()> {
        self.reset();

        let source = fs::read_to_string(&self.path).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })?;
        let frontmatter_error = |source| Error::Frontmatter {
            path: self.path.clone(),
            source,
        };
        let (fm, body) = frontmatter::parse(&source).map_err(frontmatter_error)?;
        let published_at = fm.published_at().map_err(frontmatter_error)?;

        self.set_published_at(published_at.unwrap_or_else(default_published_at));
        self.tags = fm.tags;
        if !fm.extra.is_empty() {
            let keys: Vec<&String> = fm.extra.keys().collect();
            tracing::debug!(article = %self.name, "ignoring front-matter keys {keys:?}");
        }
        self.title = markdown::leading_heading(body)
            .unwrap_or_default()
            .to_string();

        if convert_markdown {
            let rendered = markdown::render(body);
            self.content = rendered.html;
            self.toc = rendered.toc;
            // Headings in the TOC carry their ids, so prefer that text. It is
            // already escaped, like the rest of the rendered HTML.
            if let Some(title) = rendered.toc_title {
                self.title = title;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.title)
    }
}
