//! Data models for upload finalization.
//!
//! A request carries an [`upload::UploadToken`] per file attribute; the
//! [`field::FieldConfig`] says where and how that file is stored; the
//! [`record::Record`] receives the resulting path and metadata.

pub mod field;
pub mod record;
pub mod upload;

pub use field::FieldConfig;
pub use record::{Attributes, Record};
pub use upload::{UploadRequest, UploadToken};
