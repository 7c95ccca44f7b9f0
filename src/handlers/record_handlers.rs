//! HTTP handlers for records and their uploaded files.
//!
//! Saving a record finalizes every configured upload field present in the
//! body, persists the record, and only then deletes superseded files.

use crate::{
    errors::AppError,
    finalize::{Finalization, STAGING_PREFIX},
    models::{Record, UploadRequest},
    state::AppState,
    storage::CLOUD_DISK,
};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::io;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct StagedObject {
    pub key: String,
    pub size: u64,
}

/// `POST /records/{resource}` — create an empty record.
pub async fn create_record(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.records.create(&resource).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /records/{resource}/{id}`
pub async fn get_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, Uuid)>,
) -> Result<Json<Record>, AppError> {
    Ok(Json(state.records.fetch(&resource, id).await?))
}

/// `PUT /records/{resource}/{id}` — finalize uploads in the body and save.
pub async fn update_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, Uuid)>,
    Json(body): Json<Value>,
) -> Result<Json<Record>, AppError> {
    let mut record = state.records.fetch(&resource, id).await?;
    let request = UploadRequest::from_json(&body);

    let mut cleanups = Vec::new();
    for field in state.fields.iter() {
        let finalization = state
            .finalizer
            .finalize(&request, &mut record, field)
            .await?;
        if matches!(finalization, Finalization::Merged(_))
            && record.get(&field.attribute) == Some(&Value::Bool(false))
        {
            // Nothing is saved; the cleanups collected so far are dropped unrun.
            return Err(AppError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("staged upload for `{}` could not be stored", field.attribute),
            ));
        }
        cleanups.extend(finalization.into_cleanup());
    }

    let cleaned = state.records.save(&mut record, cleanups).await?;
    tracing::debug!(%resource, record_id = %id, cleaned, "record saved");
    Ok(Json(record))
}

/// `DELETE /records/{resource}/{id}` — delete the record, then the files of
/// its prunable fields.
pub async fn delete_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    let record = state.records.fetch(&resource, id).await?;
    let request = UploadRequest::new();

    let mut cleanups = Vec::new();
    for field in state.fields.iter().filter(|field| field.prunable) {
        cleanups.push(state.finalizer.schedule_removal(&request, &record, field)?);
    }

    state.records.delete(&record, cleanups).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /records/{resource}/{id}/files/{field}` — clear one file field.
pub async fn detach_file(
    State(state): State<AppState>,
    Path((resource, id, attribute)): Path<(String, Uuid, String)>,
) -> Result<Json<Record>, AppError> {
    let field = state
        .field(&attribute)
        .ok_or_else(|| AppError::not_found(format!("no upload field `{}`", attribute)))?;
    let mut record = state.records.fetch(&resource, id).await?;

    let cleanup = state
        .finalizer
        .detach(&UploadRequest::new(), &mut record, field)?;
    state.records.save(&mut record, vec![cleanup]).await?;
    Ok(Json(record))
}

/// `PUT /objects/{*key}` — write a staging object on the cloud disk.
///
/// Stands in for the provider's pre-signed upload URL; only keys under the
/// staging prefix are accepted.
pub async fn put_staged_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    if !key.starts_with(STAGING_PREFIX) {
        return Err(AppError::bad_request(format!(
            "staging keys must start with `{}`",
            STAGING_PREFIX
        )));
    }

    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(io::Error::other));

    let storage = state.finalizer.disks().disk(CLOUD_DISK)?;
    let size = storage.put_stream(&key, Box::pin(stream)).await?;

    Ok((StatusCode::CREATED, Json(StagedObject { key, size })))
}
