use crate::config::Config;
use crate::filters::FilterCriteria;
use crate::finder::{ExclusionList, FinderError, MovieFinder};
use crate::tmdb::TmdbClient;
use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{Query as MultiQuery, QueryRejection};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub finder: Arc<MovieFinder>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid movie ID.")]
    InvalidMovieId,
    #[error("{0}")]
    InvalidInput(String),
    #[error("No trailer found.")]
    NoTrailer,
    #[error("{0}")]
    NotFound(String),
    #[error("Remote catalog error: {0}")]
    Upstream(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(FinderError::ListNotFound(name)) = err.downcast_ref::<FinderError>() {
            return ApiError::NotFound(format!("No list named '{}' on this account.", name));
        }
        ApiError::Upstream(format!("{:#}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidMovieId | ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NoTrailer | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }
        (
            status,
            Json(json!({ "success": false, "message": self.to_string() })),
        )
            .into_response()
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let catalog = Arc::new(TmdbClient::new(&config)?);
    let finder = Arc::new(MovieFinder::with_list_names(catalog, config.list_names()));
    let app = build_router(AppState { finder });

    info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/discover", get(discover))
        .route("/mark_watched", post(mark_watched))
        .route("/mark_neverwatch", post(mark_neverwatch))
        .route("/get_trailer", get(get_trailer))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct DiscoverQuery {
    #[serde(default = "default_min_votes")]
    min_votes: u32,
    #[serde(default = "default_release_date")]
    release_date: String,
    #[serde(default = "default_language")]
    original_language: String,
    #[serde(default = "default_min_rating")]
    min_rating: f64,
    #[serde(default = "default_certification")]
    us_certification: String,
    #[serde(default, rename = "genre[]")]
    genres: Vec<String>,
}

fn default_min_votes() -> u32 {
    150
}

fn default_release_date() -> String {
    "2020-01-01".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_min_rating() -> f64 {
    7.0
}

fn default_certification() -> String {
    "R".to_string()
}

impl DiscoverQuery {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            min_votes: Some(self.min_votes),
            release_date_min: Some(self.release_date.clone()),
            original_language: Some(self.original_language.clone()),
            min_rating: Some(self.min_rating),
            us_certification: Some(self.us_certification.clone()),
            genre_groups: Vec::new(),
        }
    }
}

async fn discover(
    State(state): State<AppState>,
    query: Result<MultiQuery<DiscoverQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let MultiQuery(query) = query.map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    let mut criteria = query.criteria();

    // The selected genres form a single group, used only if any of them exist.
    if !query.genres.is_empty()
        && !state
            .finder
            .genre_ids(query.genres.as_slice())
            .await?
            .is_empty()
    {
        criteria.genre_groups = vec![query.genres.clone()];
    }
    criteria
        .validate()
        .map_err(|e| ApiError::InvalidInput(format!("{:#}", e)))?;

    let movies = state.finder.discover_new(&criteria).await?;
    info!("Discover request returned {} movies", movies.len());
    Ok(Json(json!({
        "success": true,
        "count": movies.len(),
        "movies": movies.into_vec(),
    })))
}

#[derive(Debug, Deserialize)]
struct MarkRequest {
    #[serde(default)]
    movie_id: Option<Value>,
}

async fn mark_watched(
    State(state): State<AppState>,
    body: Result<Json<MarkRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    mark(&state, body, ExclusionList::Watched, "Movie marked as watched.").await
}

async fn mark_neverwatch(
    State(state): State<AppState>,
    body: Result<Json<MarkRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    mark(
        &state,
        body,
        ExclusionList::NeverWatch,
        "Movie added to Never Watch list.",
    )
    .await
}

async fn mark(
    state: &AppState,
    body: Result<Json<MarkRequest>, JsonRejection>,
    list: ExclusionList,
    message: &str,
) -> Result<Json<Value>, ApiError> {
    let movie_id = body
        .ok()
        .and_then(|Json(req)| req.movie_id)
        .as_ref()
        .and_then(parse_movie_id)
        .ok_or(ApiError::InvalidMovieId)?;
    state.finder.mark(list, movie_id).await?;
    Ok(Json(json!({ "success": true, "message": message })))
}

#[derive(Debug, Deserialize)]
struct TrailerQuery {
    movie_id: Option<String>,
}

async fn get_trailer(
    State(state): State<AppState>,
    Query(query): Query<TrailerQuery>,
) -> Result<Json<Value>, ApiError> {
    let movie_id = query
        .movie_id
        .as_deref()
        .and_then(parse_id_str)
        .ok_or(ApiError::InvalidMovieId)?;
    let url = state
        .finder
        .trailer_url(movie_id)
        .await?
        .ok_or(ApiError::NoTrailer)?;
    Ok(Json(json!({ "success": true, "trailer_url": url })))
}

/// Front-ends send ids either as JSON numbers or as strings read from the DOM.
pub fn parse_movie_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().filter(|id| *id > 0),
        Value::String(s) => parse_id_str(s),
        _ => None,
    }
}

fn parse_id_str(s: &str) -> Option<i64> {
    s.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
