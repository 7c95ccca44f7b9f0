use crate::finalize::Finalizer;
use crate::models::FieldConfig;
use crate::services::record_service::RecordService;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub records: RecordService,
    pub finalizer: Finalizer,
    pub fields: Arc<Vec<FieldConfig>>,
}

impl AppState {
    pub fn new(records: RecordService, finalizer: Finalizer, fields: Vec<FieldConfig>) -> Self {
        Self {
            records,
            finalizer,
            fields: Arc::new(fields),
        }
    }

    pub fn field(&self, attribute: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|field| field.attribute == attribute)
    }
}
