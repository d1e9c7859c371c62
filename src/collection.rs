use crate::article::Article;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Everything found in one walk of the content directory: the Markdown
/// articles and the other files (assets) that get copied alongside them.
#[derive(Debug)]
pub struct AssetCollection {
    root: PathBuf,

    /// Articles in the order they were found, until [`Self::sort_by_date`].
    pub articles: Vec<Article>,

    /// Non-Markdown files, relative to the root. In walk order, which is
    /// whatever order the filesystem lists directories in.
    pub assets: Vec<PathBuf>,

    /// Article names seen so far, with the file that claimed each one.
    seen_names: HashMap<String, PathBuf>,
}

/// Should we skip a given file or directory? We skip hidden ones (prefixed
/// with .), along with everything inside them.
pub fn ignore_filename(name: &OsStr) -> bool {
    name.as_encoded_bytes().starts_with(b".")
}

/// Does this source filename look like a Markdown article?
fn is_article(path: &Path) -> bool {
    matches!(path.extension(), Some(e) if e == "md")
}

/// Walk `root` and gather its articles and assets, following symlinks. Fails
/// if two articles, anywhere in the tree, have the same name.
///
/// Nothing is read yet: see [`AssetCollection::load_all`].
pub fn collect(root: &Path) -> Result<AssetCollection> {
    let mut collection = AssetCollection::new(root);
    let walk = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !ignore_filename(e.file_name()));
    for entry in walk {
        collection.visit(entry?)?;
    }
    Ok(collection)
}

impl AssetCollection {
    fn new(root: &Path) -> Self {
        Self {
            root: root.into(),
            articles: vec![],
            assets: vec![],
            seen_names: HashMap::new(),
        }
    }

    /// The directory this collection was gathered from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn visit(&mut self, entry: DirEntry) -> Result<()> {
        if !entry.file_type().is_file() {
            return Ok(());
        }
        let path = entry.path();
        let rel_path = path.strip_prefix(&self.root).unwrap_or(path);
        if is_article(path) {
            self.add_article(Article::new(path, rel_path))
        } else {
            self.assets.push(rel_path.into());
            Ok(())
        }
    }

    fn add_article(&mut self, article: Article) -> Result<()> {
        if let Some(first) = self.seen_names.get(&article.name) {
            return Err(Error::DuplicateArticleName {
                name: article.name,
                first: first.clone(),
                second: article.rel_path,
            });
        }
        self.seen_names
            .insert(article.name.clone(), article.rel_path.clone());
        self.articles.push(article);
        Ok(())
    }

    /// Load every article. This is best-effort: an article that fails to load
    /// is logged and keeps its default (empty) values.
    pub fn load_all(&mut self, convert_markdown: bool) {
        for article in &mut self.articles {
            if let Err(e) = article.load(convert_markdown) {
                tracing::warn!(article = %article.name, "failed to load article: {e}");
            }
        }
    }

    /// Order articles newest first. Articles with the same date keep the
    /// order they were in.
    pub fn sort_by_date(&mut self) {
        self.articles
            .sort_by(|a, b| b.published_at.cmp(&a.published_at));
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.name == name)
    }

    /// Find an asset by its file name, wherever it is in the tree, and return
    /// its full path. Assets are published flat, so this is how a request for
    /// `/photo.png` finds `trips/2024/photo.png`.
    pub fn find_asset(&self, file_name: &OsStr) -> Option<PathBuf> {
        self.assets
            .iter()
            .find(|a| a.file_name() == Some(file_name))
            .map(|a| self.root.join(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn names(collection: &AssetCollection) -> Vec<&str> {
        collection.articles.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn end_to_end() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("articles");
        write(&root, "a.md", "+++\ndate = 2024-01-01\n+++\n# A\ntext");
        write(&root, "sub/b.md", "+++\ndate = 2024-02-01\n+++\n# B\ntext");

        let mut collection = collect(&root).unwrap();
        assert!(collection.assets.is_empty());
        collection.load_all(true);
        collection.sort_by_date();

        assert_eq!(names(&collection), ["b", "a"]);
        assert_eq!(collection.find_by_name("b").unwrap().title, "B");
        assert_eq!(collection.find_by_name("a").unwrap().title, "A");
        assert_eq!(
            collection.find_by_name("b").unwrap().rel_path,
            Path::new("sub/b.md")
        );
    }

    #[test]
    fn duplicate_names() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "x.md", "# one");
        write(dir.path(), "sub/x.md", "# two");

        match collect(dir.path()) {
            Err(Error::DuplicateArticleName { name, .. }) => assert_eq!(name, "x"),
            other => panic!("expected a duplicate name error, got {other:?}"),
        }
    }

    #[test]
    fn same_stem_different_extension() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "x.md", "# one");
        write(dir.path(), "x.png", "png");

        let collection = collect(dir.path()).unwrap();
        assert_eq!(names(&collection), ["x"]);
        assert_eq!(collection.assets, [PathBuf::from("x.png")]);
    }

    #[test]
    fn hidden_entries_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".draft.md", "# hidden");
        write(dir.path(), ".git/config", "");
        write(dir.path(), ".hidden/x.md", "# hidden");
        write(dir.path(), "x.md", "# shown");

        let collection = collect(dir.path()).unwrap();
        assert_eq!(names(&collection), ["x"]);
        assert!(collection.assets.is_empty());
    }

    #[test]
    fn assets_are_relative() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "img/photo.png", "png");
        write(dir.path(), "style.css", "css");

        let collection = collect(dir.path()).unwrap();
        let mut assets = collection.assets.clone();
        assets.sort();
        assert_eq!(
            assets,
            [PathBuf::from("img/photo.png"), PathBuf::from("style.css")]
        );
        assert_eq!(
            collection.find_asset(OsStr::new("photo.png")),
            Some(dir.path().join("img/photo.png"))
        );
        assert_eq!(collection.find_asset(OsStr::new("nope.png")), None);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_followed() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        write(outside.path(), "real.md", "# Linked\n");
        write(outside.path(), "pics/cat.jpg", "meow");
        std::os::unix::fs::symlink(outside.path().join("real.md"), dir.path().join("linked.md"))
            .unwrap();
        std::os::unix::fs::symlink(outside.path().join("pics"), dir.path().join("pics")).unwrap();

        let mut collection = collect(dir.path()).unwrap();
        assert_eq!(names(&collection), ["linked"]);
        assert_eq!(collection.assets, [PathBuf::from("pics/cat.jpg")]);

        collection.load_all(true);
        assert_eq!(collection.find_by_name("linked").unwrap().title, "Linked");
    }

    #[test]
    fn missing_root() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            collect(&dir.path().join("nope")),
            Err(Error::Walk(_))
        ));
    }

    #[test]
    fn sort_is_stable_and_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut collection = AssetCollection::new(dir.path());
        for (name, date) in [
            ("old", "2020-01-01"),
            ("first", "2022-06-01"),
            ("second", "2022-06-01"),
            ("new", "2023-01-01"),
            ("third", "2022-06-01"),
        ] {
            write(dir.path(), &format!("{name}.md"), &format!("+++\ndate = {date}\n+++\n"));
            let path = dir.path().join(format!("{name}.md"));
            collection
                .add_article(Article::new(&path, Path::new(&format!("{name}.md"))))
                .unwrap();
        }
        collection.load_all(false);

        collection.sort_by_date();
        let once: Vec<String> = names(&collection).iter().map(|s| s.to_string()).collect();
        assert_eq!(once, ["new", "first", "second", "third", "old"]);

        collection.sort_by_date();
        assert_eq!(names(&collection), once);
    }

    #[test]
    fn load_all_is_best_effort() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "good.md", "+++\ndate = 2024-03-01\n+++\n# Good\n");
        write(dir.path(), "bad.md", "+++\ndate = [\n+++\n# Bad\n");

        let mut collection = collect(dir.path()).unwrap();
        collection.load_all(true);
        collection.sort_by_date();

        assert_eq!(names(&collection), ["good", "bad"]);
        let bad = collection.find_by_name("bad").unwrap();
        assert_eq!(bad.title, "");
        assert_eq!(bad.content, "");
        assert_eq!(bad.date_label, "2000-01-01");
    }

    #[test]
    fn find_by_name_missing() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", "# A");
        let mut collection = collect(dir.path()).unwrap();
        assert!(collection.find_by_name("b").is_none());
        assert!(collection.find_by_name("a").is_some());
    }

    #[test]
    fn ignored_names() {
        assert!(ignore_filename(OsStr::new(".git")));
        assert!(ignore_filename(OsStr::new(".draft.md")));
        assert!(!ignore_filename(OsStr::new("notes.md")));
        assert!(!ignore_filename(OsStr::new("_notes.md")));
    }
}
