//! Seams to the external collaborators.
//!
//! The engine only ever talks to the outside world through these traits:
//! - [`WorkItemGateway`]: the work-item tracking REST surface
//! - [`ExtensionDataService`]: per-project document storage
//! - [`HostContext`]: the hosting page (project, current work-item form)

use crate::error::GatewayError;
use async_trait::async_trait;
use cc_model::{LinkQuery, WorkItem, WorkItemDraft, WorkItemId, WorkItemLink, WorkItemType};
use serde::{Deserialize, Serialize};

/// Thin typed facade over the work-item tracking REST surface.
#[async_trait]
pub trait WorkItemGateway: Send + Sync {
    /// Create a work item from an add-only patch document, returning the
    /// full record (fields and relations).
    async fn create_work_item(
        &self,
        draft: &WorkItemDraft,
        project: &str,
        work_item_type: &str,
    ) -> Result<WorkItem, GatewayError>;

    /// Batch fetch with full expansion. Any missing id fails the whole call.
    async fn get_work_items(&self, ids: &[WorkItemId]) -> Result<Vec<WorkItem>, GatewayError>;

    /// Fetch one work item with full expansion.
    async fn get_work_item(&self, id: WorkItemId) -> Result<WorkItem, GatewayError>;

    /// Run a link query. Element 0 of the result is the source row.
    async fn query_links(&self, query: &LinkQuery) -> Result<Vec<WorkItemLink>, GatewayError>;

    /// Work-item type descriptors of a project.
    async fn get_work_item_types(&self, project: &str) -> Result<Vec<WorkItemType>, GatewayError>;
}

/// Document storage scoped to this extension.
///
/// Collections are per project; documents are JSON objects keyed by `id`
/// with an `__etag` for optimistic concurrency.
#[async_trait]
pub trait ExtensionDataService: Send + Sync {
    /// Read a document, `None` when it does not exist.
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<serde_json::Value>, GatewayError>;

    /// Create or replace a document, returning what was stored.
    async fn set_document(
        &self,
        collection: &str,
        document: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError>;

    /// Delete a document. Missing documents yield [`GatewayError::NotFound`].
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), GatewayError>;
}

/// Hosting page: project context and the open work-item form.
#[async_trait]
pub trait HostContext: Send + Sync {
    /// Project the page runs in, if any
    async fn project(&self) -> Result<Option<ProjectInfo>, GatewayError>;

    /// Id of the work item open in the form, if any
    async fn current_work_item_id(&self) -> Result<Option<WorkItemId>, GatewayError>;

    /// Current (unsaved) title of the open work item
    async fn current_title(&self) -> Result<Option<String>, GatewayError>;

    /// REST resource URL of a work item, used as a relation target
    async fn work_item_resource_url(&self, id: WorkItemId) -> Result<String, GatewayError>;
}

/// Project identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Project GUID; names the settings collection
    pub id: String,
    /// Project name; used in REST paths
    pub name: String,
}

impl ProjectInfo {
    /// Create project info
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
