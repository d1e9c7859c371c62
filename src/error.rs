use crate::frontmatter::FrontmatterError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the content pipeline: collecting the source tree and loading
/// individual articles.
#[derive(Debug, Error)]
pub enum Error {
    /// Two `.md` files anywhere in the tree share a stem. Stems double as
    /// output file names, so this aborts the whole collection.
    #[error(
        "duplicate article name `{name}`: {} and {}",
        .first.display(),
        .second.display()
    )]
    DuplicateArticleName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{}: {source}", .path.display())]
    Frontmatter {
        path: PathBuf,
        source: FrontmatterError,
    },

    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}
