//! Upload finalization: staging → permanent relocation, attribute merge and
//! post-commit cleanup of superseded files.

pub mod cleanup;
pub mod context;
pub mod engine;
pub mod error;
pub mod path;
pub mod strategy;

pub use cleanup::DeferredDeletion;
pub use context::FinalizeContext;
pub use engine::{Finalization, Finalizer, MergeResult};
pub use error::{FinalizeError, FinalizeResult};
pub use path::{PathResolver, STAGING_PREFIX, rewrite_staging_prefix};
pub use strategy::{
    Completion, CompletionStrategy, DeletePrevious, DeletionStrategy, DeletionTarget,
    MoveToPermanent, NamingStrategy,
};
