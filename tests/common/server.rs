//! Server and database test utilities.

use staged_uploads::{
    db,
    finalize::Finalizer,
    models::FieldConfig,
    routes,
    services::record_service::RecordService,
    state::AppState,
    storage::{CLOUD_DISK, DiskStorage, Storage, StorageRegistry},
};
use std::sync::Arc;
use tempfile::TempDir;

/// In-memory SQLite pool with the schema applied.
#[allow(dead_code)]
pub async fn test_records() -> RecordService {
    let pool = db::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    RecordService::new(Arc::new(pool))
}

/// Prunable `avatar` field storing name and size, under `uploads/`.
#[allow(dead_code)]
pub fn avatar_field() -> FieldConfig {
    FieldConfig::new("avatar")
        .path("uploads/")
        .store_original_name("avatar_name")
        .store_size("avatar_size")
        .prunable()
}

#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub storage: Arc<dyn Storage>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn new() -> Self {
        Self::with_fields(vec![avatar_field()]).await
    }

    pub async fn with_fields(fields: Vec<FieldConfig>) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let storage: Arc<dyn Storage> = Arc::new(DiskStorage::new(temp_dir.path()));
        let disks = StorageRegistry::new().with_disk(CLOUD_DISK, storage.clone());

        let state = AppState::new(
            test_records().await,
            Finalizer::new(disks),
            fields,
        );
        let router = routes::routes::routes().with_state(state.clone());

        Self {
            router,
            state,
            storage,
            _temp_dir: temp_dir,
        }
    }
}
