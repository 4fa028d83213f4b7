use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use docsearch_core::{Category, DocsRepository, DocumentMetadata, SourceDocument};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn source(title: &str, description: &str, content: &str, category: Category) -> SourceDocument {
    SourceDocument {
        content: content.to_string(),
        metadata: DocumentMetadata {
            title: title.to_string(),
            description: description.to_string(),
            keywords: Vec::new(),
            category,
        },
        url: format!("https://docs.example.com/{category}/{}.md", title.to_lowercase().replace(' ', "-")),
    }
}

fn tiny_repo() -> Arc<DocsRepository> {
    Arc::new(DocsRepository::from_sources(
        vec![
            source(
                "Login API",
                "Sign a user in",
                "# Login\n\nPOST /auth/login with header x-project-id: [PROJECT_ID]. The login call sets a session cookie.",
                Category::Api,
            ),
            source("Signup Form", "Registration template", "# Signup\n\nRender the signup form, then login the user.", Category::Templates),
            source("React Setup", "Provider setup", "# React\n\nWrap the app with the provider component.", Category::Frameworks),
        ],
        vec![source("Errors", "Error codes", "# Errors\n\nA 401 means the login session cookie expired.", Category::Errors)],
    ))
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn call_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = call(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health() {
    let (status, body) = call(docsearch_server::build_app(tiny_repo(), None), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let app = docsearch_server::build_app(tiny_repo(), None);
    let (status, json) = call_json(app, "/search?q=login&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"].as_u64(), Some(0));
    assert_eq!(arr[0]["category"], "api");
    assert!(arr[0]["breakdown"]["category_weight"].as_f64().unwrap() > 1.0);
    assert!(arr[0]["score"].as_f64().unwrap() >= arr[1]["score"].as_f64().unwrap());
    assert!(!arr[0]["excerpts"].as_array().unwrap().is_empty());
    // reference documents are never ranked
    assert!(arr.iter().all(|h| h["doc_id"].as_u64() != Some(3)));
}

#[tokio::test]
async fn keywords_take_precedence_over_q() {
    let app = docsearch_server::build_app(tiny_repo(), None);
    let (status, json) = call_json(app, "/search?q=login&keywords=provider,%20react").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["query"], "provider react");
    assert_eq!(json["results"][0]["doc_id"].as_u64(), Some(2));
}

#[tokio::test]
async fn search_filters_and_unweighted_mode() {
    let app = docsearch_server::build_app(tiny_repo(), None);
    let (_, json) = call_json(app.clone(), "/search?q=login&category=templates").await;
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["doc_id"].as_u64(), Some(1));

    let (_, json) = call_json(app.clone(), "/search?q=login&weights=false&mode=broad").await;
    assert_eq!(json["mode"], "broad");
    assert!(json["results"][0].get("breakdown").is_none());

    let (_, json) = call_json(app, "/search?q=login&limit=50").await;
    assert!(json["results"].as_array().unwrap().len() <= docsearch_server::MAX_HTTP_LIMIT);
}

#[tokio::test]
async fn search_rejects_bad_input() {
    let app = docsearch_server::build_app(tiny_repo(), None);
    let (status, json) = call_json(app.clone(), "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
    let (status, _) = call_json(app.clone(), "/search?q=login&mode=fuzzy").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call_json(app, "/search?q=login&category=misc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn doc_replaces_project_id_and_lists_similar() {
    let app = docsearch_server::build_app(tiny_repo(), Some("proj-123".into()));
    let (status, json) = call_json(app, "/doc/0?metadata=true").await;
    assert_eq!(status, StatusCode::OK);
    let content = json["content"].as_str().unwrap();
    assert!(content.contains("x-project-id: proj-123"));
    assert!(!content.contains("[PROJECT_ID]"));
    assert_eq!(json["project_id"], "proj-123");
    assert_eq!(json["metadata"]["category"], "api");
    let similar = json["similar"].as_array().unwrap();
    assert!(similar.len() <= 3);
    assert!(similar.iter().all(|s| s["doc_id"].as_u64() != Some(0)));
}

#[tokio::test]
async fn doc_without_project_id_and_reference_docs() {
    let app = docsearch_server::build_app(tiny_repo(), None);
    let (status, json) = call_json(app.clone(), "/doc/0").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["content"].as_str().unwrap().contains("[PROJECT_ID]"));
    assert!(json.get("metadata").is_none());

    let (status, json) = call_json(app, "/doc/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Errors");
}

#[tokio::test]
async fn unknown_doc_is_404_json() {
    let app = docsearch_server::build_app(tiny_repo(), None);
    let (status, json) = call_json(app, "/doc/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("42"));
}

#[tokio::test]
async fn categories_with_counts() {
    let app = docsearch_server::build_app(tiny_repo(), None);
    let (status, json) = call_json(app, "/categories").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json.as_array().unwrap();
    assert_eq!(arr.len(), 4);
    assert_eq!(arr[0]["category"], "api");
    assert_eq!(arr[0]["count"], 1);
}

#[tokio::test]
async fn guide_returns_full_documents() {
    let app = docsearch_server::build_app(tiny_repo(), Some("proj-9".into()));
    let (status, json) = call_json(app, "/guide?feature=login").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["query"], "login");
    let docs = json["documents"].as_array().unwrap();
    assert_eq!(docs[0]["doc_id"].as_u64(), Some(0));
    assert!(docs[0]["content"].as_str().unwrap().contains("proj-9"));
}

#[tokio::test]
async fn config_reports_project_id() {
    let app = docsearch_server::build_app(tiny_repo(), Some("proj-7".into()));
    let (status, json) = call_json(app, "/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["configured"], true);
    assert_eq!(json["project_id"], "proj-7");
    assert_eq!(json["api_endpoint"], docsearch_server::API_ENDPOINT);
    assert!(json.get("hint").is_none());
}

#[tokio::test]
async fn config_without_project_id_explains_setup() {
    let app = docsearch_server::build_app(tiny_repo(), Some("   ".into()));
    let (status, json) = call_json(app, "/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["configured"], false);
    assert!(json["project_id"].is_null());
    assert!(json["hint"].as_str().unwrap().contains("BAAS_PROJECT_ID"));
}
