//! A small web app for uploading, listing, downloading and deleting files in
//! one flat directory on local disk.

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod errors;
pub mod flash;
mod handlers;
pub mod policy;
pub mod render;
pub mod storage;

use config::AppConfig;
use storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn Storage>,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.config.secret_key.clone()
    }
}

pub fn app(config: AppConfig, storage: Arc<dyn Storage>) -> Router {
    let body_limit = config.max_upload_bytes;
    let state = AppState {
        config: Arc::new(config),
        storage,
    };

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/upload", post(handlers::upload))
        .route("/download/{filename}", get(handlers::download))
        .route("/delete/{filename}", post(handlers::delete))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{self, Body},
        http::Request,
    };
    use errors::StorageError;
    use http::{StatusCode, header};
    use std::io::{Error, ErrorKind};
    use storage::{LocalFileStorage, PendingUpload, StoredFile};
    use tokio::fs::File;
    use tower::ServiceExt;

    /// Storage whose reads and removals fail with a permission error.
    struct ReadOnlyDisk;

    fn denied() -> StorageError {
        StorageError::Io(Error::new(ErrorKind::PermissionDenied, "permission denied"))
    }

    #[async_trait]
    impl Storage for ReadOnlyDisk {
        async fn list(&self) -> Result<Vec<StoredFile>, StorageError> {
            Ok(Vec::new())
        }

        async fn open(&self, _name: &str) -> Result<(File, u64), StorageError> {
            Err(denied())
        }

        async fn create(&self, _name: &str) -> Result<Box<dyn PendingUpload>, StorageError> {
            Err(denied())
        }

        async fn delete(&self, _name: &str) -> Result<(), StorageError> {
            Err(denied())
        }
    }

    /// Sends `request`, expects a flash redirect and returns the page it leads to.
    async fn flash_after(app: &Router, request: Request<Body>) -> String {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/");

        let cookie = response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let page = app
            .clone()
            .oneshot(
                Request::get("/")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = body::to_bytes(page.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn io_failures_are_reported_as_flash() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(AppConfig::new(dir.path()), Arc::new(ReadOnlyDisk));

        let page = flash_after(
            &app,
            Request::post("/delete/notes.txt").body(Body::empty()).unwrap(),
        )
        .await;
        assert!(page.contains("flash error"));
        assert!(page.contains("Delete failed: I/O error: permission denied"));

        let page = flash_after(
            &app,
            Request::get("/download/notes.txt").body(Body::empty()).unwrap(),
        )
        .await;
        assert!(page.contains("Download failed: I/O error: permission denied"));
    }

    fn test_app(dir: &tempfile::TempDir) -> Router {
        let storage = LocalFileStorage::new(dir.path().to_path_buf()).unwrap();
        app(AppConfig::new(dir.path()), Arc::new(storage))
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn delete_is_not_reachable_with_get() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"keep").unwrap();

        let response = test_app(&dir)
            .oneshot(Request::get("/delete/keep.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(dir.path().join("keep.txt").exists());
    }
}
