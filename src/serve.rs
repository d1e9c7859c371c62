use crate::core::{CSS_NAME, Site};
use crate::watch::Watch;
use anyhow::Result;
use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response, sse},
    routing::get,
};
use axum_extra::body::AsyncReadBody;
use std::convert::Infallible;
use std::path::{self, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::fs;
use tokio_stream::{Stream, StreamExt};

type HttpError = (StatusCode, String);

#[derive(Clone)]
struct AppState {
    site: Arc<RwLock<Site>>,
    watch: Arc<Watch>,
}

/// Serve the site on localhost, rendering every page fresh on each request,
/// and tell open pages to reload when anything under the source changes.
#[tokio::main]
pub async fn serve(site: Site, port: u16) -> Result<()> {
    let watch = Watch::new(&site.src_dir)?;
    tracing::info!("watching {}", site.src_dir.display());
    let state = AppState {
        site: Arc::new(RwLock::new(site)),
        watch: Arc::new(watch),
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/index.html", get(index))
        .route(&format!("/{CSS_NAME}"), get(stylesheet))
        .route("/_notify", get(notify))
        .route("/{*path}", get(resource))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn internal_error(e: anyhow::Error) -> HttpError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Respond with the contents of a file on the filesystem.
async fn send_file(path: &path::Path) -> Result<Response, HttpError> {
    let mime = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(mime_guess::mime::OCTET_STREAM.as_str());

    let file = fs::File::open(path)
        .await
        .map_err(|e| (StatusCode::NOT_FOUND, format!("not found: {e}")))?;

    let headers = [(header::CONTENT_TYPE, mime)];
    let body = AsyncReadBody::new(file);
    Ok((headers, body).into_response())
}

/// The article listing, built from front-matter alone.
async fn index(State(state): State<AppState>) -> Result<Html<String>, HttpError> {
    tracing::debug!("GET index");
    let mut site = state.site.write().unwrap();
    site.reload_templates();
    site.render_listing().map(Html).map_err(internal_error)
}

async fn stylesheet(State(state): State<AppState>) -> Result<Response, HttpError> {
    let css = state
        .site
        .read()
        .unwrap()
        .stylesheet()
        .map_err(internal_error)?;
    Ok(([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response())
}

/// What a request path turned out to be.
enum Target {
    Page(String),
    Asset(PathBuf),
    Missing(String),
    Failed(String),
}

/// Work out what to send for `path`. Paths without an extension, or ending in
/// `.html`, name an article by stem. Anything else is an asset, looked up by
/// file name.
fn resolve(site: &Site, path: &str) -> Target {
    let collection = match site.collect() {
        Ok(c) => c,
        Err(e) => return Target::Failed(e.to_string()),
    };

    let requested = path::Path::new(path);
    let is_page = match requested.extension() {
        None => true,
        Some(ext) => ext == "html",
    };

    if is_page {
        let name = requested
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(article) = collection.find_by_name(&name) else {
            return Target::Missing(format!("{name} not found"));
        };
        let mut article = article.clone();
        let rendered = article
            .load(true)
            .map_err(anyhow::Error::from)
            .and_then(|()| site.render_article(&article));
        match rendered {
            Ok(html) => Target::Page(html),
            Err(e) => Target::Failed(format!("{path} => {e}")),
        }
    } else {
        match requested
            .file_name()
            .and_then(|name| collection.find_asset(name))
        {
            Some(src_path) => Target::Asset(src_path),
            None => Target::Missing(format!("{path} not found")),
        }
    }
}

/// Serve an article page or an asset.
async fn resource(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, HttpError> {
    tracing::debug!("GET {path}");

    let target = {
        let mut site = state.site.write().unwrap();
        site.reload_templates();
        resolve(&site, &path)
    };
    match target {
        Target::Page(html) => Ok(Html(html).into_response()),
        Target::Asset(src_path) => send_file(&src_path).await,
        Target::Missing(msg) => Err((StatusCode::NOT_FOUND, msg)),
        Target::Failed(msg) => {
            tracing::warn!("{msg}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, msg))
        }
    }
}

/// Server-Sent Events endpoint for getting change notifications.
async fn notify(
    State(state): State<AppState>,
) -> sse::Sse<impl Stream<Item = Result<sse::Event, Infallible>>> {
    let stream = state.watch.stream().map(|_| {
        tracing::info!("sending reload event");
        Ok(sse::Event::default().event("reload").data("_"))
    });
    sse::Sse::new(stream)
}
