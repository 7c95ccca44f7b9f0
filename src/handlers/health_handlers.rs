//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks DB connectivity and the cloud disk

use crate::{state::AppState, storage::CLOUD_DISK};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// `GET /healthz`
///
/// Very small liveness probe; never performs I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// 1. Runs `SELECT 1` against SQLite.
/// 2. Writes, sizes and deletes a probe object in the staging area of the
///    cloud disk.
///
/// HTTP 200 when all checks pass, HTTP 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let sqlite_check = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*state.records.db)
        .await
    {
        Ok(1) => (true, None::<String>),
        Ok(v) => (false, Some(format!("unexpected result: {}", v))),
        Err(e) => (false, Some(format!("error: {}", e))),
    };

    let storage_check = match state.finalizer.disks().disk(CLOUD_DISK) {
        Err(e) => (false, Some(e.to_string())),
        Ok(storage) => {
            let key = format!("tmp/.readyz-{}", Uuid::new_v4());
            match storage.put(&key, Bytes::from_static(b"readyz")).await {
                Err(e) => (false, Some(format!("could not write probe object: {}", e))),
                Ok(()) => {
                    let sized = storage.size(&key).await;
                    let removed = storage.delete(&key).await;
                    match (sized, removed) {
                        (Ok(6), Ok(_)) => (true, None),
                        (Ok(6), Err(e)) => (true, Some(format!("could not remove probe: {}", e))),
                        (Ok(n), _) => (false, Some(format!("probe size mismatch: {}", n))),
                        (Err(e), _) => (false, Some(format!("could not size probe: {}", e))),
                    }
                }
            }
        }
    };

    let overall_ok = sqlite_check.0 && storage_check.0;

    let mut checks = HashMap::new();
    checks.insert(
        "sqlite",
        CheckStatus {
            ok: sqlite_check.0,
            error: sqlite_check.1,
        },
    );
    checks.insert(
        "storage",
        CheckStatus {
            ok: storage_check.0,
            error: storage_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
