//! Client tests against a local mock backend.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use drive_api::api::{FilesApi, StorageApi};
use drive_api::models::{ListItemsQuery, MetadataRequest, UploadFileSpec};
use drive_api::{ApiError, Client, ClientConfig};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Recorder {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
}

async fn create_metadata(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.auth.lock().unwrap().push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    rec.bodies.lock().unwrap().push(body.clone());
    Json(json!({ "item": { "_id": "folder-1", "name": body["name"], "type": body["type"] } }))
}

async fn batch_urls(State(rec): State<Recorder>, Json(body): Json<Value>) -> Json<Value> {
    rec.bodies.lock().unwrap().push(body.clone());
    let files = body["files"].as_array().cloned().unwrap_or_default();
    let destinations: Vec<Value> = files
        .iter()
        .map(|f| {
            let name = f["name"].as_str().unwrap_or_default();
            json!({ "uploadURL": format!("http://store/{name}"), "fileKey": format!("k/{name}") })
        })
        .collect();
    Json(Value::Array(destinations))
}

async fn short_batch_urls() -> Json<Value> {
    Json(json!([{ "uploadURL": "http://store/a", "fileKey": "k/a" }]))
}

async fn batch_metadata(State(rec): State<Recorder>, Json(body): Json<Value>) -> Json<Value> {
    rec.bodies.lock().unwrap().push(body.clone());
    Json(json!({ "items": body["items"] }))
}

async fn get_item(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "expired" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Not authorized, token failed" })),
        );
    }
    (StatusCode::OK, Json(json!({ "id": id, "name": "a.txt", "type": "file" })))
}

async fn list_items(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let parent = query.get("parentFolderId").cloned().unwrap_or_default();
    Json(json!([{ "_id": "x", "name": "child", "type": "file", "parentFolderId": parent }]))
}

async fn rename_item() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn spawn_server(short_destinations: bool) -> (String, Recorder) {
    let rec = Recorder::default();
    let urls = if short_destinations {
        post(short_batch_urls)
    } else {
        post(batch_urls)
    };
    let app = Router::new()
        .route("/api/files", get(list_items))
        .route("/api/files/metadata", post(create_metadata))
        .route("/api/files/batch/generate-upload-urls", urls)
        .route("/api/files/batch/metadata", post(batch_metadata))
        .route("/api/files/:id", get(get_item))
        .route("/api/files/:id/rename", axum::routing::put(rename_item))
        .with_state(rec.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api", addr), rec)
}

#[tokio::test]
async fn test_create_folder_sends_bearer_and_null_parent() {
    let (base, rec) = spawn_server(false).await;
    let client = Client::new(ClientConfig::new(base).with_access_token("tok")).unwrap();

    let item = client.create_folder("Photos", None).await.unwrap();
    assert_eq!(item.item_id(), Some("folder-1"));
    assert!(item.is_folder());

    let bodies = rec.bodies.lock().unwrap();
    assert_eq!(
        bodies[0],
        json!({ "name": "Photos", "type": "folder", "parentFolderId": null })
    );
    assert_eq!(rec.auth.lock().unwrap()[0].as_deref(), Some("Bearer tok"));
}

#[tokio::test]
async fn test_batch_destinations_preserve_order() {
    let (base, rec) = spawn_server(false).await;
    let client = Client::new(ClientConfig::new(base)).unwrap();

    let files = vec![
        UploadFileSpec {
            name: "a.txt".into(),
            content_type: "text/plain".into(),
        },
        UploadFileSpec {
            name: "b.png".into(),
            content_type: "image/png".into(),
        },
    ];
    let destinations = client.batch_generate_upload_urls(&files).await.unwrap();
    assert_eq!(destinations.len(), 2);
    assert_eq!(destinations[0].file_key, "k/a.txt");
    assert_eq!(destinations[1].upload_url, "http://store/b.png");

    let bodies = rec.bodies.lock().unwrap();
    assert_eq!(bodies[0]["files"][1]["type"], "image/png");
}

#[tokio::test]
async fn test_batch_destinations_length_mismatch_is_error() {
    let (base, _rec) = spawn_server(true).await;
    let client = Client::new(ClientConfig::new(base)).unwrap();

    let files = vec![
        UploadFileSpec {
            name: "a".into(),
            content_type: "text/plain".into(),
        },
        UploadFileSpec {
            name: "b".into(),
            content_type: "text/plain".into(),
        },
    ];
    let err = client.batch_generate_upload_urls(&files).await.unwrap_err();
    assert!(matches!(err, ApiError::Other(_)));
}

#[tokio::test]
async fn test_batch_metadata_body_shape() {
    let (base, rec) = spawn_server(false).await;
    let client = Client::new(ClientConfig::new(base)).unwrap();

    let items = vec![MetadataRequest::file(
        "a.txt",
        "k/a.txt",
        "text/plain",
        3,
        Some("p1".into()),
    )];
    client.batch_save_metadata(&items).await.unwrap();

    let bodies = rec.bodies.lock().unwrap();
    assert_eq!(
        bodies[0],
        json!({ "items": [{
            "name": "a.txt",
            "type": "file",
            "fileKey": "k/a.txt",
            "fileType": "text/plain",
            "size": 3,
            "parentFolderId": "p1"
        }] })
    );
}

#[tokio::test]
async fn test_unauthorized_maps_to_session_expired() {
    let (base, _rec) = spawn_server(false).await;
    let client = Client::new(ClientConfig::new(base)).unwrap();

    let err = client.get_item("expired").await.unwrap_err();
    assert!(err.requires_login());
    assert_eq!(err.to_string(), "Session expired: Not authorized, token failed");
}

#[tokio::test]
async fn test_list_items_and_empty_body() {
    let (base, _rec) = spawn_server(false).await;
    let client = Client::new(ClientConfig::new(base)).unwrap();

    let items = client
        .list_items(&ListItemsQuery::in_folder("folder-9"))
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].parent_folder_id.as_deref(), Some("folder-9"));

    let renamed = client.rename_item("x", "new name").await.unwrap();
    assert!(renamed.is_null());
}
