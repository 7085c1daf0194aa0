// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Web dashboard for inspecting and editing a pack

use axum::{
    extract::{Path as UrlPath, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::history::{History, HistoryEntry};
use crate::pack::metadata::{locate_metadata_file, update_metadata_file, PackField, PackInfo};
use crate::pack::rename::rename_file;
use crate::pack::{Diagnostic, ObjectGroup, ObjectKind, PackReport, PackWalker};
use crate::source::{FsSource, PackSource, TypedContent};
use crate::watcher::PackWatcher;
use crate::{PackLensError, Result};

/// Shared application state
pub struct AppState<S> {
    pub walker: PackWalker<S>,
    pub config: AppConfig,
    pub root: PathBuf,
    pub history: History,
    report: RwLock<Option<PackReport>>,
}

impl<S: PackSource + 'static> AppState<S> {
    pub fn new(source: Arc<S>, config: AppConfig, root: PathBuf) -> Self {
        Self {
            walker: PackWalker::new(source, &config),
            history: History::new(&config.history.path),
            config,
            root,
            report: RwLock::new(None),
        }
    }

    /// Walk the pack again; `None` when a newer walk overtook this one
    pub async fn rescan(&self) -> Result<Option<u64>> {
        match self.walker.walk(&self.root).await {
            Ok(report) => {
                let generation = report.generation;
                self.publish(report).await;
                Ok(Some(generation))
            }
            Err(e) if e.is_superseded() => {
                debug!("{}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Store a report unless a newer one is already shown
    async fn publish(&self, report: PackReport) -> bool {
        let mut slot = self.report.write().await;
        if slot.as_ref().is_some_and(|r| r.generation >= report.generation) {
            return false;
        }
        *slot = Some(report);
        true
    }

    pub async fn report(&self) -> Option<PackReport> {
        self.report.read().await.clone()
    }

    async fn read_content(&self, path: &Path) -> Option<TypedContent> {
        match self.walker.source().read_typed(path).await {
            Ok(content) => Some(content),
            Err(e) => {
                warn!("Cannot read {:?}: {}", path, e);
                None
            }
        }
    }
}

/// Create the web application router
pub fn create_router<S: PackSource + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        // Pages
        .route("/", get(index_page::<S>))
        .route("/grid", get(grid_page::<S>))
        .route("/group/:index", get(group_page::<S>))
        // API endpoints
        .route("/api/report", get(api_get_report::<S>))
        .route("/api/groups", get(api_get_groups::<S>))
        .route("/api/diagnostics", get(api_get_diagnostics::<S>))
        .route("/api/file", get(api_get_file::<S>))
        .route("/api/rename", post(api_rename::<S>))
        .route("/api/metadata", post(api_set_metadata::<S>))
        .route("/api/rescan", post(api_rescan::<S>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

impl IntoResponse for PackLensError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidFileName { .. } | Self::Config(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::AlreadyExists { .. } | Self::Superseded { .. } => StatusCode::CONFLICT,
            Self::MalformedMetadata(_) | Self::Json(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

// === Page Handlers ===

async fn index_page<S: PackSource + 'static>(State(state): State<Arc<AppState<S>>>) -> Html<String> {
    match state.report().await {
        Some(report) => Html(render_index(&report, &state.config)),
        None => Html(render_empty()),
    }
}

async fn grid_page<S: PackSource + 'static>(State(state): State<Arc<AppState<S>>>) -> Html<String> {
    let Some(report) = state.report().await else {
        return Html(render_empty());
    };

    let mut thumbnails = Vec::with_capacity(report.groups.len());
    for group in &report.groups {
        let uri = match group.representative() {
            Some(file) => state.read_content(&file.path).await.map(|c| data_uri(&c)),
            None => None,
        };
        thumbnails.push(uri);
    }

    Html(render_grid(&report, &thumbnails))
}

async fn group_page<S: PackSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
    UrlPath(index): UrlPath<usize>,
) -> Response {
    let Some(report) = state.report().await else {
        return Html(render_empty()).into_response();
    };
    let Some(group) = report.groups.get(index) else {
        return (StatusCode::NOT_FOUND, Html(render_not_found())).into_response();
    };

    let mut frames = Vec::with_capacity(group.files.len());
    for file in &group.files {
        if let Some(content) = state.read_content(&file.path).await {
            frames.push(data_uri(&content));
        }
    }
    let tags = report.tags_for_group(group);

    Html(render_group(index, group, &frames, &tags)).into_response()
}

// === API Handlers ===

async fn api_get_report<S: PackSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<PackReport>> {
    state
        .report()
        .await
        .map(Json)
        .ok_or_else(|| PackLensError::NotFound { path: state.root.clone() })
}

async fn api_get_groups<S: PackSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<Vec<ObjectGroup>> {
    Json(state.report().await.map(|r| r.groups).unwrap_or_default())
}

async fn api_get_diagnostics<S: PackSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<Vec<Diagnostic>> {
    Json(state.report().await.map(|r| r.diagnostics).unwrap_or_default())
}

#[derive(Deserialize)]
struct FileQuery {
    path: PathBuf,
}

async fn api_get_file<S: PackSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<FileQuery>,
) -> Result<Response> {
    let path = resolve_in_root(&state.root, &query.path)?;
    let content = state.walker.source().read_typed(&path).await?;
    Ok(([(header::CONTENT_TYPE, content.media_type)], content.bytes).into_response())
}

#[derive(Deserialize)]
struct RenameRequest {
    path: PathBuf,
    new_name: String,
}

async fn api_rename<S: PackSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<HistoryEntry>> {
    let path = resolve_in_root(&state.root, &request.path)?;
    let group_key = state
        .report()
        .await
        .and_then(|r| r.group_of(&path).map(|g| g.key.clone()));

    let entry = rename_file(
        state.walker.source().as_ref(),
        &path,
        &request.new_name,
        group_key,
        Some(&state.history),
    )
    .await?;

    state.rescan().await?;
    Ok(Json(entry))
}

#[derive(Deserialize)]
struct MetadataRequest {
    field: PackField,
    value: String,
}

async fn api_set_metadata<S: PackSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<MetadataRequest>,
) -> Result<Json<PackInfo>> {
    let source = state.walker.source().as_ref();
    let file = locate_metadata_file(source, &state.root, &state.config.layout.metadata_file).await?;
    let metadata = update_metadata_file(source, &file, request.field, &request.value).await?;

    state.rescan().await?;
    Ok(Json(metadata.info()))
}

#[derive(Serialize)]
struct RescanResponse {
    generation: Option<u64>,
}

async fn api_rescan<S: PackSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<RescanResponse>> {
    let generation = state.rescan().await?;
    Ok(Json(RescanResponse { generation }))
}

/// Join a requested path onto the pack root, refusing anything outside it
fn resolve_in_root(root: &Path, requested: &Path) -> Result<PathBuf> {
    let relative = requested.strip_prefix(root).unwrap_or(requested);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(PackLensError::PermissionDenied {
            path: requested.to_path_buf(),
        });
    }
    Ok(root.join(relative))
}

fn data_uri(content: &TypedContent) -> String {
    format!("data:{};base64,{}", content.media_type, STANDARD.encode(&content.bytes))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// === Template Rendering ===

fn base_template(title: &str, content: &str) -> String {
    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - packlens</title>
    <style>
        :root {{
            --bg-primary: #1a1a2e;
            --bg-secondary: #16213e;
            --bg-card: #0f3460;
            --text-primary: #e8e8e8;
            --text-secondary: #a0a0a0;
            --accent: #e94560;
            --warning: #f5a623;
            --success: #00d9a5;
            --border: #2a2a4a;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }}
        .container {{ max-width: 1400px; margin: 0 auto; padding: 20px; }}
        nav {{
            background: var(--bg-secondary);
            padding: 15px 20px;
            display: flex;
            align-items: center;
            gap: 30px;
            border-bottom: 1px solid var(--border);
        }}
        nav .logo {{ font-size: 1.5em; font-weight: bold; color: var(--accent); text-decoration: none; }}
        nav a {{ color: var(--text-secondary); text-decoration: none; }}
        nav a:hover {{ color: var(--text-primary); }}
        .card {{ background: var(--bg-card); border-radius: 12px; padding: 20px; margin-bottom: 20px; }}
        .card h2 {{ margin-bottom: 15px; color: var(--accent); }}
        .stats-grid {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
            gap: 20px;
            margin-bottom: 30px;
        }}
        .stat-card {{ background: var(--bg-card); border-radius: 12px; padding: 20px; text-align: center; }}
        .stat-card .number {{ font-size: 2.5em; font-weight: bold; color: var(--accent); }}
        .stat-card .label {{ color: var(--text-secondary); font-size: 0.9em; }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ padding: 10px; text-align: left; border-bottom: 1px solid var(--border); }}
        th {{ color: var(--text-secondary); font-weight: 500; }}
        .diag-error {{ color: var(--accent); }}
        .diag-warning {{ color: var(--warning); }}
        .tag {{
            display: inline-block;
            background: var(--accent);
            color: white;
            padding: 2px 8px;
            border-radius: 12px;
            font-size: 0.8em;
            margin: 2px;
        }}
        .sprite-grid {{
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(120px, 1fr));
            gap: 12px;
        }}
        .sprite {{ background: var(--bg-card); border-radius: 8px; padding: 8px; text-align: center; color: inherit; text-decoration: none; }}
        .sprite img {{ max-width: 100%; height: 96px; object-fit: contain; image-rendering: pixelated; }}
        .preview img {{ height: 256px; image-rendering: pixelated; }}
        textarea, input {{ width: 100%; background: var(--bg-secondary); color: var(--text-primary); border: 1px solid var(--border); padding: 6px; }}
    </style>
</head>
<body>
    <nav>
        <a href="/" class="logo">packlens</a>
        <a href="/">Summary</a>
        <a href="/grid">Sprites</a>
    </nav>
    <main class="container">
        {}
    </main>
    <script>
        async function postJson(url, body) {{
            const res = await fetch(url, {{
                method: 'POST',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify(body),
            }});
            if (!res.ok) {{
                const err = await res.json();
                alert(err.error);
                return;
            }}
            location.reload();
        }}
    </script>
</body>
</html>"#, escape_html(title), content)
}

fn render_empty() -> String {
    base_template(
        "Scanning",
        r#"<div class="card"><h2>No report yet</h2><p>The pack has not been walked yet.</p>
        <button onclick="postJson('/api/rescan', {})">Scan now</button></div>"#,
    )
}

fn render_not_found() -> String {
    base_template("Not found", r#"<div class="card"><h2>No such sprite</h2><a href="/grid">Back to the sprites</a></div>"#)
}

fn render_index(report: &PackReport, config: &AppConfig) -> String {
    let counts: String = ObjectKind::ALL
        .iter()
        .map(|kind| {
            format!(
                r#"<div class="stat-card"><div class="number">{}</div><div class="label">{}</div></div>"#,
                report.counts.get(*kind),
                kind.label()
            )
        })
        .collect();

    let diagnostics: String = if report.diagnostics.is_empty() {
        "<p>No problems found.</p>".to_string()
    } else {
        let rows: String = report
            .diagnostics
            .iter()
            .map(|d| {
                let class = if d.is_error() { "diag-error" } else { "diag-warning" };
                let help = d
                    .help_url
                    .as_deref()
                    .map(|url| format!(r#" <a href="{}" target="_blank">docs</a>"#, escape_html(url)))
                    .unwrap_or_default();
                format!(
                    r#"<tr><td class="{}">{:?}</td><td>{}{}</td></tr>"#,
                    class,
                    d.severity,
                    escape_html(&d.message),
                    help
                )
            })
            .collect();
        format!("<table><tr><th>Severity</th><th>Message</th></tr>{}</table>", rows)
    };

    let tags: String = report
        .root
        .tags
        .iter()
        .map(|t| format!(r#"<span class="tag">{}</span>"#, escape_html(t)))
        .collect();

    let content = format!(
        r#"
        <h1>{}</h1>
        <div class="stats-grid">{}</div>
        <div style="display: grid; grid-template-columns: 2fr 1fr; gap: 20px;">
            <div class="card">
                <h2>Diagnostics</h2>
                {}
            </div>
            <div class="card">
                <h2>Pack tags</h2>
                {}
            </div>
        </div>
        {}
    "#,
        escape_html(&report.root.name),
        counts,
        diagnostics,
        if tags.is_empty() { "No tags".to_string() } else { tags },
        render_metadata_form(report, config)
    );

    base_template("Summary", &content)
}

fn render_metadata_form(report: &PackReport, config: &AppConfig) -> String {
    let Some(document) = report.root_metadata() else {
        return format!(
            r#"<div class="card"><h2>Package Information</h2><p>No readable "{}" in the pack root.</p></div>"#,
            escape_html(&config.layout.metadata_file)
        );
    };
    let info = PackInfo::from_value(&document.content);

    let fields: String = PackField::ALL
        .iter()
        .map(|field| {
            format!(
                r#"<p><strong>{}:</strong><br><textarea id="{key}" rows="{}">{}</textarea>
                <button onclick="postJson('/api/metadata', {{ field: '{key}', value: document.getElementById('{key}').value }})">Save</button></p>"#,
                field.label(),
                if *field == PackField::LongDescription { 6 } else { 1 },
                escape_html(info.get(*field).unwrap_or_default()),
                key = field.key(),
            )
        })
        .collect();

    format!(r#"<div class="card"><h2>Package Information</h2>{}</div>"#, fields)
}

fn render_grid(report: &PackReport, thumbnails: &[Option<String>]) -> String {
    let sprites: String = report
        .groups
        .iter()
        .zip(thumbnails)
        .enumerate()
        .map(|(index, (group, thumbnail))| {
            let image = match thumbnail {
                Some(uri) => format!(r#"<img src="{}" alt="{}">"#, uri, escape_html(&group.key)),
                None => "<div>unreadable</div>".to_string(),
            };
            format!(
                r#"<a class="sprite" href="/group/{}">{}<div>{}</div></a>"#,
                index,
                image,
                escape_html(&group.key)
            )
        })
        .collect();

    let content = format!(
        r#"
        <h1>Sprites</h1>
        <div class="card">
            <div class="sprite-grid">{}</div>
        </div>
    "#,
        if sprites.is_empty() { "No sprites found".to_string() } else { sprites }
    );

    base_template("Sprites", &content)
}

fn render_group(index: usize, group: &ObjectGroup, frames: &[String], tags: &[String]) -> String {
    let chips: String = tags
        .iter()
        .map(|t| format!(r#"<span class="tag">{}</span>"#, escape_html(t)))
        .collect();

    let frame_list = serde_json::to_string(frames).unwrap_or_else(|_| "[]".to_string());

    let files: String = group
        .files
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let path = escape_html(&f.path.to_string_lossy().replace('\\', "\\\\").replace('\'', "\\'"));
            format!(
                r#"<tr><td>{}</td><td><input id="name-{i}" value="{}"></td>
                <td><button onclick="postJson('/api/rename', {{ path: '{}', new_name: document.getElementById('name-{i}').value }})">Rename</button></td></tr>"#,
                escape_html(&f.name),
                escape_html(&f.name),
                path,
                i = i,
            )
        })
        .collect();

    let content = format!(
        r#"
        <h1>{}</h1>
        <div class="card preview">
            <img id="frame" src="{}" alt="{}">
            <div>{}</div>
        </div>
        <div class="card">
            <h2>Files</h2>
            <table><tr><th>Name</th><th>New name</th><th></th></tr>{}</table>
        </div>
        <a href="/grid">Back to the sprites</a> | <a href="/group/{}">Next</a>
        <script>
            const frames = {};
            let current = 0;
            if (frames.length > 1) {{
                setInterval(() => {{
                    current = (current + 1) % frames.length;
                    document.getElementById('frame').src = frames[current];
                }}, 100);
            }}
        </script>
    "#,
        escape_html(&group.key),
        frames.first().map(String::as_str).unwrap_or_default(),
        escape_html(&group.key),
        if chips.is_empty() { "No tags".to_string() } else { chips },
        files,
        index + 1,
        frame_list,
    );

    base_template(&group.key, &content)
}

/// Re-walk the pack whenever the watcher reports a burst of changes
pub fn spawn_watch_task<S: PackSource + 'static>(state: Arc<AppState<S>>) -> Result<JoinHandle<()>> {
    let mut watcher = PackWatcher::new(&state.root)?;
    let quiet_period = Duration::from_millis(state.config.web.debounce_ms);

    Ok(tokio::spawn(async move {
        while let Some(changes) = watcher.next_batch(quiet_period).await {
            debug!("{} changes, rescanning", changes);
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                if let Err(e) = state.rescan().await {
                    warn!("Rescan failed: {}", e);
                }
            });
        }
    }))
}

/// Start the web server for the pack at `root`
pub async fn start_server(config: AppConfig, root: PathBuf) -> Result<()> {
    let state = Arc::new(AppState::new(Arc::new(FsSource::new()), config.clone(), root));

    if let Err(e) = state.rescan().await {
        warn!("Initial scan failed: {}", e);
    }

    let _watch_task = if config.web.watch {
        Some(spawn_watch_task(Arc::clone(&state))?)
    } else {
        None
    };

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Dashboard available at http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router)
        .await
        .map_err(|e| PackLensError::Server(e.to_string()))?;

    Ok(())
}
