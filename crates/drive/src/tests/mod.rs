//! Client and source tests against a local Drive stand-in.

use crate::auth::TokenSource;
use crate::client::{list_query, DriveClient, DriveFile};
use crate::credentials::ServiceAccountKey;
use crate::source::DriveSource;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use itt_core::AppError;
use itt_knowledge::DocumentSource;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const ACCESS_TOKEN: &str = "ya29.local";

#[derive(Clone, Default)]
struct Recorded {
    token_requests: Arc<Mutex<u32>>,
    list_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", ACCESS_TOKEN))
}

async fn issue_token(State(recorded): State<Recorded>) -> Json<serde_json::Value> {
    *recorded.token_requests.lock().unwrap() += 1;
    Json(json!({"access_token": ACCESS_TOKEN, "expires_in": 3600, "token_type": "Bearer"}))
}

async fn list_files(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    recorded.list_queries.lock().unwrap().push(params.clone());

    if params.get("q").is_some_and(|q| q.contains("'denied'")) {
        return (StatusCode::FORBIDDEN, "insufficient permissions").into_response();
    }

    let page = match params.get("pageToken").map(String::as_str) {
        None => json!({
            "nextPageToken": "p2",
            "files": [{"id": "f1", "name": "Estatuto.pdf"}]
        }),
        Some("p2") => json!({
            "files": [{"id": "f2", "name": "Regimento Interno"}]
        }),
        Some(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    Json(page).into_response()
}

async fn file_media(
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if params.get("alt").map(String::as_str) != Some("media") || id == "missing" {
        return StatusCode::NOT_FOUND.into_response();
    }
    format!("%PDF-1.4 conteudo {}", id).into_response()
}

/// Serve the stand-in on an ephemeral port and return its base URL.
async fn spawn_drive(recorded: Recorded) -> String {
    let app = Router::new()
        .route("/token", post(issue_token))
        .route("/files", get(list_files))
        .route("/files/:id", get(file_media))
        .with_state(recorded);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str) -> DriveClient {
    let key = ServiceAccountKey {
        client_email: "sync@itt.iam.gserviceaccount.com".to_string(),
        private_key: include_str!("service_account.pem").to_string(),
        private_key_id: Some("k1".to_string()),
        token_uri: format!("{}/token", base_url),
    };
    let http = reqwest::Client::new();
    let tokens = TokenSource::new(key, http.clone()).unwrap();
    DriveClient::with_base_url(base_url, tokens, http)
}

#[tokio::test]
async fn test_list_pdfs_follows_every_page() {
    let recorded = Recorded::default();
    let base_url = spawn_drive(recorded.clone()).await;

    let files = client(&base_url).list_pdfs("folder-1").await.unwrap();

    let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["f1", "f2"]);

    let queries = recorded.list_queries.lock().unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0]["q"], list_query("folder-1"));
    assert_eq!(queries[0]["pageSize"], "100");
    assert_eq!(queries[0]["supportsAllDrives"], "true");
    assert_eq!(queries[0]["includeItemsFromAllDrives"], "true");
    assert!(!queries[0].contains_key("pageToken"));
    assert_eq!(queries[1]["pageToken"], "p2");

    // Second page reuses the cached token
    assert_eq!(*recorded.token_requests.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_download_writes_bytes() {
    let base_url = spawn_drive(Recorded::default()).await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("Estatuto.pdf");
    let file = DriveFile {
        id: "f1".to_string(),
        name: "Estatuto.pdf".to_string(),
    };

    let written = client(&base_url).download(&file, &dest).await.unwrap();

    let content = fs::read_to_string(&dest).unwrap();
    assert_eq!(content, "%PDF-1.4 conteudo f1");
    assert_eq!(written, content.len() as u64);
}

#[tokio::test]
async fn test_error_status_is_drive_error() {
    let base_url = spawn_drive(Recorded::default()).await;
    let client = client(&base_url);

    let err = client.list_pdfs("denied").await.unwrap_err();
    match err {
        AppError::Drive(message) => assert!(message.contains("403"), "{}", message),
        other => panic!("expected a Drive error, got {:?}", other),
    }

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("missing.pdf");
    let missing = DriveFile {
        id: "missing".to_string(),
        name: "missing.pdf".to_string(),
    };
    let err = client.download(&missing, &dest).await.unwrap_err();
    assert!(matches!(err, AppError::Drive(_)));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_fetch_replaces_staging_contents() {
    let base_url = spawn_drive(Recorded::default()).await;
    let dir = TempDir::new().unwrap();
    let staging = dir.path().join("data");
    fs::create_dir_all(staging.join("old")).unwrap();
    fs::write(staging.join("old").join("revogado.txt"), "texto revogado").unwrap();
    fs::write(staging.join("top.pdf"), b"stale").unwrap();

    let source = DriveSource::new(client(&base_url), "folder-1");
    let fetched = source.fetch(&staging).await.unwrap();

    let mut names: Vec<_> = fs::read_dir(&staging)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Estatuto.pdf", "Regimento Interno.pdf"]);
    assert_eq!(fetched.len(), 2);
    assert_eq!(
        fs::read_to_string(staging.join("Regimento Interno.pdf")).unwrap(),
        "%PDF-1.4 conteudo f2"
    );
}

#[tokio::test]
async fn test_failed_listing_leaves_staging_alone() {
    let base_url = spawn_drive(Recorded::default()).await;
    let dir = TempDir::new().unwrap();
    let staging = dir.path().join("data");
    fs::create_dir_all(&staging).unwrap();
    fs::write(staging.join("estatuto.pdf"), b"current").unwrap();

    let source = DriveSource::new(client(&base_url), "denied");
    assert!(source.fetch(&staging).await.is_err());
    assert_eq!(fs::read(staging.join("estatuto.pdf")).unwrap(), b"current");
}
