use crate::article::Article;
use crate::collection::{self, AssetCollection};
use crate::markdown;
use anyhow::Result;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the generated syntax-highlighting stylesheet.
pub const CSS_NAME: &str = "default.css";

const LIVERELOAD_JS: &str = include_str!("../templates/livereload.js");

pub struct Site {
    pub src_dir: PathBuf,
    pub livereload: bool,
    pub config: Config,
    tmpls: minijinja::Environment<'static>,
}

impl Site {
    /// Set up a site rooted at `src_dir`, which holds `articles/` (Markdown
    /// and assets), `templates/` (`index.html` and `article.html`), and an
    /// optional `_config.toml`.
    pub fn new(src_dir: &Path, livereload: bool) -> Result<Self> {
        let config = Config::load(src_dir)?;

        let mut tmpls = minijinja::Environment::new();
        tmpls.set_loader(minijinja::path_loader(src_dir.join("templates")));
        // Article content and TOCs are already HTML.
        tmpls.set_auto_escape_callback(|_| minijinja::AutoEscape::None);

        Ok(Self {
            src_dir: src_dir.into(),
            livereload,
            config,
            tmpls,
        })
    }

    pub fn articles_dir(&self) -> PathBuf {
        self.src_dir.join("articles")
    }

    /// Walk the articles directory.
    pub fn collect(&self) -> Result<AssetCollection> {
        Ok(collection::collect(&self.articles_dir())?)
    }

    /// Forget cached templates, so the next render reads them from disk again.
    pub fn reload_templates(&mut self) {
        self.tmpls.clear_templates();
    }

    fn render_page(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let tmpl = self.tmpls.get_template(name)?;
        let html = tmpl.render(ctx)?;
        if self.livereload {
            Ok(inject_livereload(html))
        } else {
            Ok(html)
        }
    }

    /// Render the index page listing `articles`.
    pub fn render_index(&self, articles: &[Article]) -> Result<String> {
        self.render_page(
            "index.html",
            minijinja::context! {
                css_path => CSS_NAME,
                articles => articles,
            },
        )
    }

    /// Render the page for one (loaded) article.
    pub fn render_article(&self, article: &Article) -> Result<String> {
        self.render_page(
            "article.html",
            minijinja::context! {
                css_path => CSS_NAME,
                a => article,
            },
        )
    }

    /// Render the index from scratch, reading only article metadata.
    pub fn render_listing(&self) -> Result<String> {
        let mut collection = self.collect()?;
        collection.load_all(false);
        collection.sort_by_date();
        self.render_index(&collection.articles)
    }

    /// The syntax-highlighting stylesheet for the configured theme.
    pub fn stylesheet(&self) -> Result<String> {
        markdown::stylesheet(&self.config.highlight_theme)
    }

    /// Render the whole site into `dest_dir`, replacing whatever it held.
    pub fn generate(&self, dest_dir: &Path) -> Result<()> {
        tracing::info!("{} => {}", self.src_dir.display(), dest_dir.display());

        let mut collection = self.collect()?;
        collection.load_all(true);
        collection.sort_by_date();

        clear_dir(dest_dir)?;

        fs::write(
            dest_dir.join("index.html"),
            self.render_index(&collection.articles)?,
        )?;
        tracing::info!("index.html");

        for article in &collection.articles {
            let file_name = format!("{}.html", article.name);
            fs::write(dest_dir.join(&file_name), self.render_article(article)?)?;
            tracing::info!("{file_name}: {article}");
        }

        fs::write(dest_dir.join(CSS_NAME), self.stylesheet()?)?;
        tracing::info!("{CSS_NAME}");

        // Assets are published flat, next to the pages.
        let mut written = HashSet::new();
        for asset in &collection.assets {
            let Some(file_name) = asset.file_name() else {
                continue;
            };
            if !written.insert(file_name) {
                tracing::warn!(
                    "{} overwrites an earlier asset with the same name",
                    asset.display()
                );
            }
            hard_link_or_copy(
                &collection.root().join(asset),
                &dest_dir.join(file_name),
            )?;
            tracing::info!("{}", file_name.to_string_lossy());
        }

        Ok(())
    }
}

/// Add the livereload script to a rendered page, just before `</body>` if
/// there is one.
fn inject_livereload(mut html: String) -> String {
    let script = format!("<script>{LIVERELOAD_JS}</script>\n");
    match html.rfind("</body>") {
        Some(pos) => html.insert_str(pos, &script),
        None => html.push_str(&script),
    }
    html
}

/// Try to hard-link `from` at `to`, falling back to a copy if the link fails
/// (e.g., the two paths are on different filesystems). This always removes the
/// current file at `to`.
fn hard_link_or_copy(from: &Path, to: &Path) -> std::io::Result<Option<u64>> {
    if to.exists() {
        fs::remove_file(to)?;
    }
    match fs::hard_link(from, to) {
        Ok(_) => Ok(None),
        Err(_) => fs::copy(from, to).map(Some),
    }
}

/// Empty out a directory, creating it if it doesn't exist yet. The directory
/// itself is kept.
fn clear_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        return fs::create_dir_all(path);
    }
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// A theme name from syntect's default set.
    pub highlight_theme: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            highlight_theme: "InspiredGitHub".into(),
        }
    }
}

impl Config {
    pub fn load(src_dir: &Path) -> Result<Self> {
        match fs::read_to_string(src_dir.join("_config.toml")) {
            // Silently proceed if the file isn't found, but crash on other errors.
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e)?,
            Ok(s) => Ok(toml::from_str(&s)?),
        }
    }
}
