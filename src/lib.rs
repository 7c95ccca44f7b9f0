//! Finalization of direct-to-storage uploads.
//!
//! Clients upload to a staging key (`tmp/...`) on cloud object storage, then
//! save a record referencing that upload. [`finalize::Finalizer`] copies the
//! staged object to its permanent path, merges path, original filename and
//! size onto the record, and hands back a [`finalize::DeferredDeletion`] for
//! the superseded file that the caller runs once the save has committed.

pub mod config;
pub mod db;
pub mod errors;
pub mod finalize;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
