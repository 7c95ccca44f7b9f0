use anyhow::Result;
use axum::Router;
use staged_uploads::{
    config, db,
    finalize::Finalizer,
    routes,
    services::record_service::RecordService,
    state::AppState,
    storage::{CLOUD_DISK, DiskStorage, S3Storage, Storage, StorageRegistry},
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting staged-uploads with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection ---
    let pool = Arc::new(db::connect(&cfg.database_url, 5).await?);

    // --- Schema (idempotent); `--migrate` exits afterwards ---
    db::run_migrations(&pool).await?;
    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Storage disks ---
    let local: Arc<dyn Storage> = Arc::new(DiskStorage::new(&cfg.storage_dir));
    let mut disks = StorageRegistry::new().with_disk("local", local.clone());
    match &cfg.s3_bucket {
        Some(bucket) => {
            let s3 = S3Storage::new(
                bucket.clone(),
                cfg.s3_region.clone(),
                cfg.s3_endpoint.clone(),
            )?;
            tracing::info!(bucket = %bucket, region = %cfg.s3_region, "Using S3 for the cloud disk");
            disks.register(CLOUD_DISK, Arc::new(s3));
        }
        None => {
            tracing::warn!(
                "No S3 bucket configured; serving the cloud disk from {}",
                cfg.storage_dir
            );
            disks.register(CLOUD_DISK, local);
        }
    }

    // --- Initialize core services ---
    let state = AppState::new(
        RecordService::new(pool.clone()),
        Finalizer::new(disks),
        cfg.field_configs(),
    );

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
