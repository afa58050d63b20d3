use std::fmt::Write as _;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::Configuration;
use crate::state::{Slideshow, Snapshot};

const SAFE_PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Prefix under which image bytes are served.
pub const PHOTOS_PREFIX: &str = "/photos/";

/// Settings the handlers need besides the shared slideshow.
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub title: String,
    pub photo_root: PathBuf,
    pub advance_interval: Duration,
}

impl PageOptions {
    pub fn from_config(cfg: &Configuration) -> Self {
        Self {
            title: cfg.server.title.clone(),
            photo_root: cfg.photo_library_path.clone(),
            advance_interval: cfg.advance_interval,
        }
    }

    /// Page refresh period in whole seconds, at least one.
    fn refresh_secs(&self) -> u64 {
        let ms = self.advance_interval.as_millis();
        ms.div_ceil(1000).max(1) as u64
    }
}

#[derive(Clone)]
struct AppState {
    slideshow: Slideshow,
    page: Arc<PageOptions>,
}

/// JSON view of the slideshow position.
#[derive(Debug, Serialize)]
struct SlideshowView {
    index: usize,
    count: usize,
    current: Option<String>,
    revision: u64,
    advance_interval_ms: u64,
}

pub fn router(slideshow: Slideshow, page: PageOptions) -> Router {
    let state = AppState {
        slideshow,
        page: Arc::new(page),
    };
    Router::new()
        .route("/", get(slideshow_page))
        .route("/images", get(list_images))
        .route("/api/slideshow", get(slideshow_json))
        .route("/api/next", post(next_image))
        .route("/api/previous", post(previous_image))
        .route("/photos/{*path}", get(serve_photo))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Bind `bind_addr` and serve until `cancel` fires.
pub async fn run(
    bind_addr: SocketAddr,
    slideshow: Slideshow,
    page: PageOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind slideshow listener on {bind_addr}"))?;
    let local = listener.local_addr().unwrap_or(bind_addr);
    tracing::info!(addr = %local, "slideshow server listening");

    axum::serve(listener, router(slideshow, page).into_make_service())
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await
        .context("slideshow server exited")?;
    Ok(())
}

async fn slideshow_page(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.slideshow.snapshot();
    Html(render_page(&state.page, &snapshot))
}

async fn list_images(State(state): State<AppState>) -> Json<Vec<String>> {
    let snapshot = state.slideshow.snapshot();
    Json(snapshot.images.iter().map(|p| image_url(p)).collect())
}

async fn slideshow_json(State(state): State<AppState>) -> Json<SlideshowView> {
    Json(view(&state.page, &state.slideshow.snapshot()))
}

async fn next_image(State(state): State<AppState>) -> Json<SlideshowView> {
    if let Some(path) = state.slideshow.advance() {
        tracing::debug!(path = %path.display(), "manual advance");
    }
    Json(view(&state.page, &state.slideshow.snapshot()))
}

async fn previous_image(State(state): State<AppState>) -> Json<SlideshowView> {
    if let Some(path) = state.slideshow.step_back() {
        tracing::debug!(path = %path.display(), "manual step back");
    }
    Json(view(&state.page, &state.slideshow.snapshot()))
}

async fn serve_photo(State(state): State<AppState>, Path(requested): Path<String>) -> Response {
    // Path comparison ignores empty and `.` segments, so reject them before
    // matching; only paths from the current scan are served.
    if requested
        .split('/')
        .any(|segment| matches!(segment, "" | "." | ".."))
    {
        return not_found();
    }
    let rel: PathBuf = requested.split('/').collect();
    if !state.slideshow.contains(&rel) {
        return not_found();
    }
    let full = state.page.photo_root.join(&rel);
    match tokio::fs::read(&full).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(content_type_for(&rel))),
                (
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ),
                (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            ],
            bytes,
        )
            .into_response(),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %full.display(), "photo vanished before it could be served");
            not_found()
        }
        Err(err) => {
            tracing::error!(error = %err, path = %full.display(), "failed to read photo");
            (StatusCode::INTERNAL_SERVER_ERROR, "unable to read image").into_response()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "image not found").into_response()
}

fn view(page: &PageOptions, snapshot: &Snapshot) -> SlideshowView {
    SlideshowView {
        index: snapshot.index,
        count: snapshot.len(),
        current: snapshot.current().map(image_url),
        revision: snapshot.revision,
        advance_interval_ms: u64::try_from(page.advance_interval.as_millis()).unwrap_or(u64::MAX),
    }
}

/// URL under which `rel` (a path relative to the photo root) is served.
pub fn image_url(rel: &FsPath) -> String {
    let mut url = String::from(PHOTOS_PREFIX);
    for (i, component) in rel.components().enumerate() {
        if i > 0 {
            url.push('/');
        }
        let segment = component.as_os_str().to_string_lossy();
        url.extend(utf8_percent_encode(&segment, SAFE_PATH_SEGMENT));
    }
    url
}

/// MIME type for an image path, by extension.
pub fn content_type_for(path: &FsPath) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        Some("svg") => "image/svg+xml",
        Some("avif") => "image/avif",
        _ => "application/octet-stream",
    }
}

fn render_page(page: &PageOptions, snapshot: &Snapshot) -> String {
    let title = escape_html(&page.title);
    let mut body = String::new();
    match snapshot.current() {
        Some(current) => {
            let name = current
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            writeln!(
                &mut body,
                "<img id=\"slideshow\" src=\"{}\" alt=\"{}\">",
                escape_html(&image_url(current)),
                escape_html(&name)
            )
            .ok();
            writeln!(
                &mut body,
                "<p class=\"caption\">{} / {}</p>",
                snapshot.index + 1,
                snapshot.len()
            )
            .ok();
        }
        None => {
            body.push_str("<p class=\"empty\">No images found. Add photos to the library folder; this page checks again shortly.</p>");
        }
    }
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"><meta http-equiv=\"refresh\" content=\"{}\"><title>{}</title><style>{}</style></head><body>{}</body></html>",
        page.refresh_secs(),
        title,
        styles(),
        body
    )
}

fn styles() -> &'static str {
    "body { margin: 0; height: 100vh; width: 100vw; overflow: hidden; background: #000; color: #ccc; font-family: sans-serif; text-align: center; display: flex; align-items: center; justify-content: center; }\n#slideshow { max-width: 100%; max-height: 100%; object-fit: contain; }\n.caption { position: fixed; bottom: 8px; right: 12px; margin: 0; font-size: 0.8rem; opacity: 0.5; }\n.empty { font-size: 1.2rem; }"
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_urls_encode_each_segment() {
        assert_eq!(image_url(FsPath::new("a.jpg")), "/photos/a.jpg");
        assert_eq!(
            image_url(FsPath::new("trip 2024/día #1.png")),
            "/photos/trip%202024/d%C3%ADa%20%231.png"
        );
    }

    #[test]
    fn refresh_rounds_up_to_whole_seconds() {
        let mut page = PageOptions {
            title: "t".into(),
            photo_root: PathBuf::from("photos"),
            advance_interval: Duration::from_millis(1500),
        };
        assert_eq!(page.refresh_secs(), 2);
        page.advance_interval = Duration::from_millis(10);
        assert_eq!(page.refresh_secs(), 1);
    }

    #[test]
    fn html_escaping_covers_attribute_quotes() {
        assert_eq!(escape_html("<a href='x'>\"&\""), "&lt;a href=&#39;x&#39;&gt;&quot;&amp;&quot;");
    }

    #[test]
    fn unknown_extensions_fall_back_to_octet_stream() {
        assert_eq!(content_type_for(FsPath::new("a.JPEG")), "image/jpeg");
        assert_eq!(content_type_for(FsPath::new("a.raw")), "application/octet-stream");
    }
}
