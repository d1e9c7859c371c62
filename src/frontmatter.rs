//! Splitting `+++`-delimited TOML front-matter from a Markdown body.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use thiserror::Error;
use toml::Value;
use toml::value::Datetime;

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("invalid front-matter: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid date `{0}`: a calendar date is required")]
    InvalidDate(String),
}

/// The metadata block at the top of an article.
#[derive(Debug, Default)]
pub struct Frontmatter {
    pub date: Option<Datetime>,
    pub tags: Vec<String>,

    /// Keys we don't know about. Kept around, but nothing reads them.
    pub extra: toml::Table,
}

impl TryFrom<toml::Table> for Frontmatter {
    type Error = FrontmatterError;

    fn try_from(mut table: toml::Table) -> Result<Self, Self::Error> {
        let date = match table.remove("date") {
            None => None,
            Some(Value::Datetime(dt)) => Some(dt),
            Some(other) => return Err(FrontmatterError::InvalidDate(other.to_string())),
        };
        let tags = match table.remove("tags") {
            None => vec![],
            Some(value) => value.try_into()?,
        };
        Ok(Self {
            date,
            tags,
            extra: table,
        })
    }
}

impl Frontmatter {
    /// The publish timestamp, if a `date` was given. An explicit offset is
    /// kept as written.
    ///
    /// A bare date means midnight, and a datetime without an offset is taken
    /// to be UTC.
    pub fn published_at(&self) -> Result<Option<DateTime<FixedOffset>>, FrontmatterError> {
        let Some(date) = &self.date else {
            return Ok(None);
        };

        // `Datetime` displays as RFC 3339 (or the local subsets of it), so
        // go through its string form.
        let text = date.to_string();
        if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
            return Ok(Some(dt));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(Some(dt.and_utc().fixed_offset()));
        }
        NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Some(dt.and_utc().fixed_offset()))
            .ok_or(FrontmatterError::InvalidDate(text))
    }
}

/// Is this line (without its trailing newline) a `+++` delimiter?
fn is_delimiter(line: &str) -> bool {
    line.trim_end() == "+++"
}

/// Find the byte spans of delimiter lines, excluding their line terminators.
fn delimiters(source: &str) -> impl Iterator<Item = (usize, usize)> {
    let mut offset = 0;
    source.split_inclusive('\n').filter_map(move |line| {
        let start = offset;
        offset += line.len();
        let content = line.strip_suffix('\n').unwrap_or(line);
        is_delimiter(content).then_some((start, start + content.len()))
    })
}

/// Split a document into its metadata text and its body.
///
/// Returns `None` when the document doesn't open with a delimited block: no
/// delimiters, only one, or some text before the first.
pub fn split(source: &str) -> Option<(&str, &str)> {
    let mut delims = delimiters(source);
    let (open_start, open_end) = delims.next()?;
    let (close_start, close_end) = delims.next()?;
    if open_start != 0 {
        return None;
    }
    Some((&source[open_end..close_start], &source[close_end..]))
}

/// Parse the front-matter of a document, returning it with the remaining
/// Markdown body. Without a metadata block, the front-matter is empty and the
/// body is the whole input.
pub fn parse(source: &str) -> Result<(Frontmatter, &str), FrontmatterError> {
    match split(source) {
        Some((meta, body)) => {
            let table: toml::Table = toml::from_str(meta)?;
            Ok((Frontmatter::try_from(table)?, body))
        }
        None => Ok((Frontmatter::default(), source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimited_block() {
        let src = "+++\ndate = 2023-05-01\n+++\n# Hi\n";
        assert_eq!(split(src), Some(("\ndate = 2023-05-01\n", "\n# Hi\n")));
    }

    #[test]
    fn no_delimiters() {
        let src = "# Hi\n\nthere";
        assert_eq!(split(src), None);
        let (fm, body) = parse(src).unwrap();
        assert!(fm.date.is_none());
        assert!(fm.tags.is_empty());
        assert_eq!(body, src);
    }

    #[test]
    fn single_delimiter() {
        let src = "+++\ntitle = 'x'\n# Hi\n";
        let (fm, body) = parse(src).unwrap();
        assert!(fm.extra.is_empty());
        assert_eq!(body, src);
    }

    #[test]
    fn text_before_block() {
        let src = "intro\n+++\ndate = 2023-05-01\n+++\nbody";
        let (fm, body) = parse(src).unwrap();
        assert!(fm.date.is_none());
        assert_eq!(body, src);
    }

    #[test]
    fn trailing_whitespace_on_delimiter() {
        let src = "+++  \r\ntags = ['a']\n+++\t\nbody";
        let (fm, body) = parse(src).unwrap();
        assert_eq!(fm.tags, vec!["a"]);
        assert_eq!(body, "\nbody");
    }

    #[test]
    fn indented_plus_is_not_delimiter() {
        assert_eq!(split(" +++\na = 1\n+++\nbody"), None);
    }

    #[test]
    fn later_delimiters_stay_in_body() {
        let src = "+++\n+++\none\n+++\ntwo";
        assert_eq!(split(src), Some(("\n", "\none\n+++\ntwo")));
    }

    #[test]
    fn tags_and_unknown_keys() {
        let src = "+++\ntags = ['rust', 'web']\nauthor = 'me'\n+++\nbody";
        let (fm, body) = parse(src).unwrap();
        assert_eq!(fm.tags, vec!["rust", "web"]);
        assert_eq!(fm.extra.get("author").and_then(|v| v.as_str()), Some("me"));
        assert_eq!(body, "\nbody");
    }

    #[test]
    fn malformed_toml() {
        let src = "+++\ndate = [unclosed\n+++\nbody";
        assert!(matches!(parse(src), Err(FrontmatterError::Toml(_))));
    }

    #[test]
    fn tags_must_be_strings() {
        let src = "+++\ntags = 3\n+++\nbody";
        assert!(parse(src).is_err());
    }

    #[test]
    fn local_date() {
        let (fm, _) = parse("+++\ndate = 2023-05-01\n+++\n").unwrap();
        let dt = fm.published_at().unwrap().unwrap();
        assert_eq!(dt.to_rfc3339(), "2023-05-01T00:00:00+00:00");
    }

    #[test]
    fn local_datetime() {
        let (fm, _) = parse("+++\ndate = 2023-05-01T10:30:00\n+++\n").unwrap();
        let dt = fm.published_at().unwrap().unwrap();
        assert_eq!(dt.to_rfc3339(), "2023-05-01T10:30:00+00:00");
    }

    #[test]
    fn offset_datetime() {
        let (fm, _) = parse("+++\ndate = 2023-05-01T09:00:00+09:00\n+++\n").unwrap();
        let dt = fm.published_at().unwrap().unwrap();
        assert_eq!(dt.to_rfc3339(), "2023-05-01T09:00:00+09:00");
        assert_eq!(dt.timestamp(), 1_682_899_200);
    }

    #[test]
    fn time_without_date() {
        let (fm, _) = parse("+++\ndate = 07:32:00\n+++\n").unwrap();
        assert!(matches!(
            fm.published_at(),
            Err(FrontmatterError::InvalidDate(_))
        ));
    }

    #[test]
    fn string_date() {
        let src = "+++\ndate = '2023-05-01'\n+++\n";
        assert!(matches!(parse(src), Err(FrontmatterError::InvalidDate(_))));
    }

    #[test]
    fn missing_date() {
        let (fm, _) = parse("+++\ntags = []\n+++\n").unwrap();
        assert_eq!(fm.published_at().unwrap(), None);
    }
}
