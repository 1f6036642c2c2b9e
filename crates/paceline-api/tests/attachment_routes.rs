use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use paceline_core::rooms::RoomBroker;
use paceline_core::{AppConfig, AppState};
use paceline_media::{StorageConfig, StorageManager};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

const BOUNDARY: &str = "paceline-test-boundary";

struct TestContext {
    app: Router,
    _storage_dir: TempDir,
}

impl TestContext {
    async fn new() -> anyhow::Result<Self> {
        let db = paceline_db::create_pool("sqlite::memory:", 1).await?;
        paceline_db::run_migrations(&db).await?;

        let storage_dir = tempfile::tempdir()?;
        let state = AppState {
            db,
            rooms: Arc::new(RoomBroker::new()),
            storage: Arc::new(StorageManager::new(StorageConfig {
                base_path: storage_dir.path().to_path_buf(),
                max_file_size: 64 * 1024,
            })),
            config: AppConfig {
                jwt_secret: "integration-test-secret".to_string(),
                jwt_expiry_seconds: 3600,
                registration_enabled: true,
                storage_path: storage_dir.path().to_string_lossy().into_owned(),
                max_upload_size: 64 * 1024,
                database_url: "sqlite::memory:".to_string(),
                public_url: None,
                worker_id: 1,
            },
            shutdown: Arc::new(Notify::new()),
        };

        let app = paceline_api::build_router().with_state(state);
        Ok(Self {
            app,
            _storage_dir: storage_dir,
        })
    }

    async fn register(&self, username: &str) -> anyhow::Result<String> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "IntegrationPass123",
                })
                .to_string(),
            ))?;
        let response = self.app.clone().oneshot(request).await?;
        anyhow::ensure!(response.status() == StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let payload: Value = serde_json::from_slice(&body)?;
        Ok(payload["token"].as_str().context("token")?.to_string())
    }

    async fn upload(
        &self,
        token: &str,
        filename: &str,
        data: &[u8],
        duration: Option<&str>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
        if let Some(duration) = duration {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                     name=\"duration_seconds\"\r\n\r\n{duration}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/attachments")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))?;

        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, payload))
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        token: &str,
    ) -> anyhow::Result<axum::http::Response<Body>> {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())?;
        Ok(self.app.clone().oneshot(request).await?)
    }
}

#[tokio::test]
async fn upload_download_round_trip() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let token = ctx.register("anna").await?;

    let (status, uploaded) = ctx
        .upload(&token, "workout.gpx", b"<gpx>track</gpx>", None)
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(uploaded["filename"], "workout.gpx");
    assert_eq!(uploaded["size"], 16);
    let url = uploaded["url"].as_str().context("url")?;

    let response = ctx.request(Method::GET, url, &token).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("workout.gpx"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&bytes[..], b"<gpx>track</gpx>");
    Ok(())
}

#[tokio::test]
async fn voice_note_records_duration() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let token = ctx.register("anna").await?;

    let (status, uploaded) = ctx
        .upload(&token, "note.ogg", b"oggdata", Some("12.5"))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(uploaded["duration_seconds"], 12.5);
    Ok(())
}

#[tokio::test]
async fn empty_upload_rejected() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let token = ctx.register("anna").await?;

    let (status, payload) = ctx.upload(&token, "empty.bin", b"", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["error"]["code"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn delete_is_owner_or_admin_only() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let anna = ctx.register("anna").await?;
    let ben = ctx.register("ben").await?;

    let (_, uploaded) = ctx.upload(&anna, "plan.txt", b"week one", None).await?;
    let id = uploaded["id"].as_str().context("id")?;

    let response = ctx
        .request(Method::DELETE, &format!("/api/v1/attachments/{id}"), &ben)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .request(Method::DELETE, &format!("/api/v1/attachments/{id}"), &anna)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Gone for everyone afterwards.
    let response = ctx
        .request(Method::GET, &format!("/api/v1/attachments/{id}"), &anna)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
