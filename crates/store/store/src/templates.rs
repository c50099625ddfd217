use async_trait::async_trait;

use leadflow_core::{MessageTemplate, TemplateId};

use crate::error::StoreError;

/// Read access to message templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Fetch a template by id.
    async fn get(&self, id: &TemplateId) -> Result<Option<MessageTemplate>, StoreError>;
}
