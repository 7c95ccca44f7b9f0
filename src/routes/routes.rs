//! Defines routes for records and staged uploads.
//!
//! ## Structure
//! - **Record endpoints**
//!   - `POST   /records/{resource}` — create an empty record
//!   - `GET    /records/{resource}/{id}` — fetch a record
//!   - `PUT    /records/{resource}/{id}` — finalize uploads in the body and save
//!   - `DELETE /records/{resource}/{id}` — delete the record and its prunable files
//!   - `DELETE /records/{resource}/{id}/files/{field}` — clear one file field
//!
//! - **Staging endpoint**
//!   - `PUT    /objects/{*key}` — upload a staging object (`tmp/...`)
//!
//! The wildcard `*key` allows nested keys like `tmp/2025/img.jpg`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        record_handlers::{
            create_record, delete_record, detach_file, get_record, put_staged_object,
            update_record,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Build and return the router for all routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/objects/{*key}", put(put_staged_object))
        .route("/records/{resource}", post(create_record))
        .route(
            "/records/{resource}/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route("/records/{resource}/{id}/files/{field}", delete(detach_file))
}
