use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use docsearch_core::config::DEFAULT_SIMILAR_LIMIT;
use docsearch_core::{Category, DocsRepository, DocumentId, SearchMode, SearchOptions, WeightBreakdown};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Upper bound on `limit` for HTTP callers.
pub const MAX_HTTP_LIMIT: usize = 10;
/// Excerpts are cut to this many characters.
pub const EXCERPT_CHARS: usize = 200;
const METADATA_KEYWORDS: usize = 10;
const GUIDE_LIMIT: usize = 5;
const PROJECT_ID_PLACEHOLDER: &str = "[PROJECT_ID]";
/// Platform endpoints the project id is used against.
pub const API_ENDPOINT: &str = "https://api.aiapp.link";
pub const COOKIE_DOMAIN: &str = ".aiapp.link";

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<DocsRepository>,
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    /// Comma separated; takes precedence over `q`.
    pub keywords: Option<String>,
    pub category: Option<String>,
    pub mode: Option<String>,
    pub limit: Option<usize>,
    pub min_score: Option<f64>,
    pub weights: Option<bool>,
    pub synonyms: Option<bool>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: SearchMode,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocumentId,
    pub title: String,
    pub url: String,
    pub category: Category,
    pub description: String,
    pub score: f64,
    pub bm25_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<WeightBreakdown>,
    pub excerpts: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocParams {
    #[serde(default)]
    pub metadata: bool,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: DocumentId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocMetadata>,
    pub content: String,
    pub similar: Vec<SimilarDoc>,
}

#[derive(Serialize)]
pub struct DocMetadata {
    pub category: Category,
    pub url: String,
    pub description: String,
    pub keywords: Vec<String>,
}

#[derive(Serialize)]
pub struct SimilarDoc {
    pub doc_id: DocumentId,
    pub title: String,
    pub description: String,
    pub url: String,
    pub similarity: f64,
}

#[derive(Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct GuideParams {
    pub feature: Option<String>,
    pub framework: Option<String>,
    pub keywords: Option<String>,
}

#[derive(Serialize)]
pub struct GuideResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub documents: Vec<GuideDoc>,
}

#[derive(Serialize)]
pub struct GuideDoc {
    pub doc_id: DocumentId,
    pub title: String,
    pub category: Category,
    pub description: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct ConfigResponse {
    pub configured: bool,
    pub project_id: Option<String>,
    pub api_endpoint: &'static str,
    pub cookie_domain: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

/// JSON error body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

pub fn build_app(repo: Arc<DocsRepository>, project_id: Option<String>) -> Router {
    let state = AppState { repo, project_id: project_id.filter(|p| !p.trim().is_empty()) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/categories", get(categories_handler))
        .route("/guide", get(guide_handler))
        .route("/config", get(config_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();

    let keywords: Vec<&str> = params
        .keywords
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect();
    let query = if !keywords.is_empty() {
        keywords.join(" ")
    } else {
        params.q.as_deref().map(str::trim).unwrap_or_default().to_string()
    };
    if query.is_empty() {
        return Err(ApiError::bad_request("a search needs `q` or `keywords`, e.g. keywords=login,react"));
    }

    let mode = match params.mode.as_deref() {
        Some(m) => m.parse::<SearchMode>().map_err(|e| ApiError::bad_request(e.to_string()))?,
        None => SearchMode::default(),
    };
    let mut options = SearchOptions::new()
        .mode(mode)
        .limit(params.limit.unwrap_or(docsearch_core::config::DEFAULT_LIMIT).min(MAX_HTTP_LIMIT))
        .use_weights(params.weights.unwrap_or(true))
        .use_synonyms(params.synonyms.unwrap_or(true));
    if let Some(category) = params.category.as_deref() {
        options = options.category(parse_category(category)?);
    }
    if let Some(min_score) = params.min_score {
        options = options.min_score(min_score);
    }

    let results = state.repo.search(&query, &options);
    let hits: Vec<SearchHit> = results
        .into_iter()
        .filter_map(|r| {
            let doc = state.repo.get_document_by_id(r.document_id)?;
            Some(SearchHit {
                doc_id: r.document_id,
                title: doc.title().to_string(),
                url: doc.url().to_string(),
                category: doc.category(),
                description: doc.description().to_string(),
                score: r.score,
                bm25_score: r.bm25_score,
                breakdown: r.weight_breakdown,
                excerpts: r.relevant_chunks.iter().map(|c| excerpt(&c.text)).collect(),
            })
        })
        .collect();

    let elapsed = start.elapsed();
    tracing::debug!(query = %query, hits = hits.len(), "search handled");
    Ok(Json(SearchResponse { query, mode, took_s: elapsed.as_secs_f64(), total_hits: hits.len(), results: hits }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocumentId>,
    Query(params): Query<DocParams>,
) -> Result<Json<DocResponse>, ApiError> {
    let doc = state
        .repo
        .get_document_by_id(doc_id)
        .ok_or_else(|| ApiError::not_found(format!("document {doc_id} not found; search first to find valid ids")))?;

    let content = match &state.project_id {
        Some(project_id) => doc.content().replace(PROJECT_ID_PLACEHOLDER, project_id),
        None => doc.content().to_string(),
    };
    let metadata = params.metadata.then(|| DocMetadata {
        category: doc.category(),
        url: doc.url().to_string(),
        description: doc.description().to_string(),
        keywords: doc.keywords().iter().take(METADATA_KEYWORDS).cloned().collect(),
    });
    let similar = state
        .repo
        .similar_documents_scored(doc_id, DEFAULT_SIMILAR_LIMIT)
        .into_iter()
        .map(|(d, similarity)| SimilarDoc {
            doc_id: d.id(),
            title: d.title().to_string(),
            description: d.description().to_string(),
            url: d.url().to_string(),
            similarity,
        })
        .collect();

    Ok(Json(DocResponse {
        doc_id,
        title: doc.title().to_string(),
        project_id: state.project_id.clone(),
        metadata,
        content,
        similar,
    }))
}

pub async fn categories_handler(State(state): State<AppState>) -> Json<Vec<CategoryCount>> {
    let counts = state
        .repo
        .categories()
        .into_iter()
        .map(|category| CategoryCount { category, count: state.repo.documents_by_category(category).len() })
        .collect();
    Json(counts)
}

/// Full documents for implementing a feature in a framework.
pub async fn guide_handler(State(state): State<AppState>, Query(params): Query<GuideParams>) -> Json<GuideResponse> {
    let mut parts: Vec<&str> = [params.feature.as_deref(), params.framework.as_deref(), params.keywords.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        parts.push("auth authentication");
    }
    let query = parts.join(" ");

    let results = state.repo.search(&query, &SearchOptions::new().limit(GUIDE_LIMIT));
    let documents = results
        .iter()
        .filter_map(|r| state.repo.get_document_by_id(r.document_id))
        .map(|doc| GuideDoc {
            doc_id: doc.id(),
            title: doc.title().to_string(),
            category: doc.category(),
            description: doc.description().to_string(),
            content: match &state.project_id {
                Some(project_id) => doc.content().replace(PROJECT_ID_PLACEHOLDER, project_id),
                None => doc.content().to_string(),
            },
        })
        .collect();
    Json(GuideResponse { query, project_id: state.project_id.clone(), documents })
}

/// The project id documents are rendered with, if any.
pub async fn config_handler(State(state): State<AppState>) -> Json<ConfigResponse> {
    let configured = state.project_id.is_some();
    Json(ConfigResponse {
        configured,
        project_id: state.project_id.clone(),
        api_endpoint: API_ENDPOINT,
        cookie_domain: COOKIE_DOMAIN,
        hint: (!configured).then_some("start the server with --project-id <id> or set BAAS_PROJECT_ID"),
    })
}

fn parse_category(raw: &str) -> Result<Category, ApiError> {
    let category = Category::parse(raw);
    if category == Category::Unknown && !raw.trim().eq_ignore_ascii_case("unknown") {
        return Err(ApiError::bad_request(format!("unknown category: {raw}")));
    }
    Ok(category)
}

fn excerpt(text: &str) -> String {
    let mut out: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().count() > EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}
