//! HTTP server
//!
//! Two routers: the public one serves pages and htmx partials, the internal
//! one binds to loopback and exposes the cron refresh endpoints. Notion
//! content is served through the cache; a stale hit answers immediately and
//! refreshes in a background task.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use percent_encoding::{utf8_percent_encode, CONTROLS};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tera::Context;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::cache::ContentCache;
use crate::config::{Secrets, SiteConfig};
use crate::manga::MangaClient;
use crate::notion::{collect_reading_now, render_blocks, NotionClient, SlugEntry};
use crate::reviews::ReviewLibrary;
use crate::strava::StravaClient;
use crate::templates::{ActivityRow, TemplateRenderer};
use crate::Blog;

/// Shared server state
pub struct AppState {
    pub config: SiteConfig,
    pub templates: TemplateRenderer,
    pub notion: NotionClient,
    pub cache: ContentCache,
    pub strava: StravaClient,
    pub manga: MangaClient,
    pub reviews: ReviewLibrary,
    pub images_dir: PathBuf,
}

type SharedState = Arc<AppState>;

/// Start the blog server
pub async fn start(blog: &Blog, host: Option<&str>, port: Option<u16>) -> Result<()> {
    let secrets = Secrets::from_env()?;
    let config = blog.config.clone();

    let state = Arc::new(AppState {
        templates: TemplateRenderer::new()?,
        notion: NotionClient::new(&config.notion, &secrets.notion_token),
        cache: ContentCache::new(
            config.cache.ttl_secs,
            blog.base_dir.join(&config.cache.snapshot_file),
        ),
        strava: StravaClient::new(&config.strava, &secrets, &blog.data_dir),
        manga: MangaClient::new(&config.manga, &secrets, &blog.data_dir),
        reviews: ReviewLibrary::new(&blog.reviews_dir),
        images_dir: blog.images_dir.clone(),
        config,
    });

    refresh_integrations_on_startup(&state);
    spawn_internal_server(state.clone());

    let mut app = Router::new()
        .route("/", get(home))
        .route("/readingNow", get(home))
        .route("/reviews", get(reviews_list))
        .route("/reviews/:slug", get(review_page))
        .route("/notion/allposts/:filter", get(all_posts_partial))
        .route("/notion/posts/:id", get(post_page))
        .route("/notion/content/:id", get(post_content_partial))
        .route("/strava", get(strava_page))
        .route("/manga", get(manga_page))
        .route("/api/proxy/covers/*path", get(cover_proxy))
        .nest_service("/static", ServeDir::new(&blog.static_dir));

    // local image mirror is only served directly in dev; prod puts it
    // behind the CDN at config.url
    if state.config.dev {
        app = app.nest_service("/images", ServeDir::new(&blog.images_dir));
    }

    let app = app.layer(TraceLayer::new_for_http()).with_state(state.clone());

    let host = host.unwrap_or(&state.config.server.host);
    let bind_host = if host == "localhost" { "127.0.0.1" } else { host };
    let port = port.unwrap_or(state.config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_host, port).parse()?;

    tracing::info!("server started on http://{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Data refreshes the Go-era cron jobs used to kick off at boot
fn refresh_integrations_on_startup(state: &SharedState) {
    if state.manga.is_configured() {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = state.manga.update_data().await {
                tracing::error!("error updating manga data: {}", e);
            }
        });
    }

    if !state.config.dev && state.strava.is_configured() {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = state.strava.refresh_and_update().await {
                tracing::error!("error refreshing strava token: {}", e);
            }
        });
    }
}

/// The cron endpoints bind to a loopback-only listener
fn spawn_internal_server(state: SharedState) {
    let internal = Router::new()
        .route("/cron/refreshStrava", get(refresh_strava))
        .route("/cron/refreshManga", get(refresh_manga))
        .with_state(state.clone());

    let addr = format!(
        "{}:{}",
        state.config.server.internal_host, state.config.server.internal_port
    );

    tokio::spawn(async move {
        tracing::info!("Starting internal API server on {}", addr);
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!("internal server bind failed: {}", e);
                return;
            }
        };
        if let Err(e) = axum::serve(listener, internal).await {
            tracing::error!("internal server died: {}", e);
        }
    });
}

// ---- page handlers ----

async fn home(State(state): State<SharedState>) -> Response {
    let block_id = state.config.notion.reading_now_block_id.clone();

    let books = if block_id.is_empty() {
        Vec::new()
    } else {
        match cached_blocks(&state, &block_id).await {
            Ok(blocks) => collect_reading_now(&blocks),
            Err(e) => return internal_error("error getting reading now blocks", e),
        }
    };

    let mut context = base_context(&state);
    context.insert("books", &books);
    render_html(&state, "home.html", &context)
}

async fn reviews_list(State(state): State<SharedState>) -> Response {
    let reviews = match state.reviews.list() {
        Ok(reviews) => reviews,
        Err(e) => return internal_error("error listing reviews", e),
    };

    let mut context = Context::new();
    context.insert("reviews", &reviews);
    render_html(&state, "reviews_list.html", &context)
}

async fn review_page(State(state): State<SharedState>, Path(slug): Path<String>) -> Response {
    let review = match state.reviews.get(&slug) {
        Ok(Some(review)) => review,
        Ok(None) => return (StatusCode::NOT_FOUND, "no such review").into_response(),
        Err(e) => return internal_error("error loading review", e),
    };

    let mut context = base_context(&state);
    context.insert("title", &review.title);
    context.insert("published", &review.published);
    context.insert("content", &review.content);
    render_html(&state, "review.html", &context)
}

async fn all_posts_partial(
    State(state): State<SharedState>,
    Path(filter): Path<String>,
) -> Response {
    let entries = match cached_slug_entries(&state, &filter).await {
        Ok(entries) => entries,
        Err(e) => return internal_error("error getting slug entries", e),
    };

    let mut context = Context::new();
    context.insert("entries", &entries);
    render_html(&state, "entries.html", &context)
}

async fn post_page(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let blocks = match cached_blocks(&state, &id).await {
        Ok(blocks) => blocks,
        Err(e) => return internal_error("error getting post", e),
    };
    let title = match cached_title(&state, &id).await {
        Ok(title) => title,
        Err(e) => {
            tracing::warn!("error getting post title for {}: {}", id, e);
            None
        }
    };

    let mut context = base_context(&state);
    context.insert("title", &title);
    context.insert("content", &render_blocks(&blocks));
    render_html(&state, "post.html", &context)
}

async fn post_content_partial(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let blocks = match cached_blocks(&state, &id).await {
        Ok(blocks) => blocks,
        Err(e) => return internal_error("error getting post", e),
    };

    Html(render_blocks(&blocks)).into_response()
}

async fn strava_page(State(state): State<SharedState>) -> Response {
    let activities = match state.strava.load_activities() {
        Ok(activities) => activities,
        Err(e) => return internal_error("error getting strava data", e),
    };

    let rows: Vec<ActivityRow> = activities.iter().map(ActivityRow::from_activity).collect();
    let mut context = base_context(&state);
    context.insert("activities", &rows);
    render_html(&state, "strava.html", &context)
}

async fn manga_page(State(state): State<SharedState>) -> Response {
    let mangas = match state.manga.load_manga() {
        Ok(mangas) => mangas,
        Err(e) => return internal_error("error getting manga data", e),
    };

    let mut context = base_context(&state);
    context.insert("mangas", &mangas);
    render_html(&state, "manga.html", &context)
}

async fn cover_proxy(State(state): State<SharedState>, Path(path): Path<String>) -> Response {
    let safe_path = utf8_percent_encode(&path, CONTROLS).to_string();

    match state.manga.fetch_cover(&safe_path).await {
        Ok((content_type, bytes)) => {
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(e) => internal_error("error fetching cover", e),
    }
}

// ---- internal handlers ----

async fn refresh_strava(State(state): State<SharedState>) -> Response {
    match state.strava.refresh_and_update().await {
        Ok(()) => "access token refreshed".into_response(),
        Err(e) => internal_error("error refreshing access token", e),
    }
}

async fn refresh_manga(State(state): State<SharedState>) -> Response {
    match state.manga.update_data().await {
        Ok(()) => "manga data updated".into_response(),
        Err(e) => internal_error("error updating manga data", e),
    }
}

// ---- cache plumbing ----

/// Cached block children for a page or block id.
///
/// A stale hit is served as-is while a background task refreshes the entry,
/// so a slow Notion never slows a page view that has been seen before.
async fn cached_blocks(
    state: &SharedState,
    block_id: &str,
) -> crate::error::Result<Vec<serde_json::Value>> {
    let key = format!("blocks:{}", block_id);

    if let Some(hit) = state.cache.get(&key) {
        if hit.stale {
            let state = state.clone();
            let block_id = block_id.to_string();
            tokio::spawn(async move {
                let key = format!("blocks:{}", block_id);
                if let Err(e) = fetch_blocks(&state, &key, &block_id).await {
                    tracing::error!("error updating cache for {}: {}", key, e);
                }
            });
        }
        return Ok(as_array(hit.payload));
    }

    fetch_blocks(state, &key, block_id).await
}

async fn fetch_blocks(
    state: &SharedState,
    key: &str,
    block_id: &str,
) -> crate::error::Result<Vec<serde_json::Value>> {
    let mut blocks = state.notion.block_children(block_id).await?;

    // signed image urls expire, mirror them while the blocks are fresh
    let prefix = if state.config.dev {
        "/images".to_string()
    } else {
        format!("{}/images", state.config.url.trim_end_matches('/'))
    };
    if let Err(e) = state
        .notion
        .mirror_images(&mut blocks, &state.images_dir, &prefix)
        .await
    {
        tracing::error!("error mirroring images for {}: {}", block_id, e);
    }

    state.cache.put(key, serde_json::Value::Array(blocks.clone()));
    persist_cache(state);
    Ok(blocks)
}

/// Cached slug entries for a category filter
async fn cached_slug_entries(
    state: &SharedState,
    filter: &str,
) -> crate::error::Result<Vec<SlugEntry>> {
    let database_id = state.notion.database_id().to_string();
    let key = format!("posts:{}:{}", database_id, filter);

    if let Some(hit) = state.cache.get(&key) {
        if hit.stale {
            let state = state.clone();
            let filter = filter.to_string();
            tokio::spawn(async move {
                if let Err(e) = fetch_slug_entries(&state, &filter).await {
                    tracing::error!("error updating slug entry cache: {}", e);
                }
            });
        }
        return Ok(serde_json::from_value(hit.payload).unwrap_or_default());
    }

    fetch_slug_entries(state, filter).await
}

async fn fetch_slug_entries(
    state: &SharedState,
    filter: &str,
) -> crate::error::Result<Vec<SlugEntry>> {
    let database_id = state.notion.database_id().to_string();
    let entries = state
        .notion
        .slug_entries(&database_id, Some(filter))
        .await?;

    let key = format!("posts:{}:{}", database_id, filter);
    state.cache.put(&key, serde_json::to_value(&entries)?);
    persist_cache(state);
    Ok(entries)
}

/// Cached page title
async fn cached_title(state: &SharedState, page_id: &str) -> crate::error::Result<Option<String>> {
    let key = format!("title:{}", page_id);

    if let Some(hit) = state.cache.get(&key) {
        // titles barely change; stale ones refresh along with the blocks
        return Ok(hit.payload.as_str().map(String::from));
    }

    let title = state.notion.page_title(page_id).await?;
    state.cache.put(
        &key,
        title
            .as_deref()
            .map(|t| serde_json::Value::String(t.to_string()))
            .unwrap_or(serde_json::Value::Null),
    );
    persist_cache(state);
    Ok(title)
}

fn persist_cache(state: &SharedState) {
    if let Err(e) = state.cache.save() {
        tracing::warn!("failed to persist cache snapshot: {}", e);
    }
}

fn as_array(payload: serde_json::Value) -> Vec<serde_json::Value> {
    match payload {
        serde_json::Value::Array(values) => values,
        _ => Vec::new(),
    }
}

// ---- helpers ----

fn base_context(state: &SharedState) -> Context {
    let mut context = Context::new();
    context.insert("site_title", &state.config.title);
    context
}

fn render_html(state: &SharedState, template: &str, context: &Context) -> Response {
    match state.templates.render(template, context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => internal_error("failed to render html page", e),
    }
}

fn internal_error(msg: &str, e: impl std::fmt::Display) -> Response {
    tracing::error!("{}: {}", msg, e);
    (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string()).into_response()
}
