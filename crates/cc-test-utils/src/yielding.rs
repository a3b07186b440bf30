//! Gateway wrapper that gives up the task before every call
//!
//! Lets a test interleave two operations on one task with `tokio::join!`:
//! each backend call becomes a point where the other side runs.

use async_trait::async_trait;
use cc_gateway::{GatewayError, WorkItemGateway};
use cc_model::{LinkQuery, WorkItem, WorkItemDraft, WorkItemId, WorkItemLink, WorkItemType};
use std::sync::Arc;

#[derive(Debug)]
pub struct YieldingGateway<G: ?Sized> {
    inner: Arc<G>,
}

impl<G: WorkItemGateway + ?Sized> YieldingGateway<G> {
    pub fn new(inner: Arc<G>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<G: WorkItemGateway + ?Sized> WorkItemGateway for YieldingGateway<G> {
    async fn create_work_item(
        &self,
        draft: &WorkItemDraft,
        project: &str,
        work_item_type: &str,
    ) -> Result<WorkItem, GatewayError> {
        tokio::task::yield_now().await;
        self.inner.create_work_item(draft, project, work_item_type).await
    }

    async fn get_work_items(&self, ids: &[WorkItemId]) -> Result<Vec<WorkItem>, GatewayError> {
        tokio::task::yield_now().await;
        self.inner.get_work_items(ids).await
    }

    async fn get_work_item(&self, id: WorkItemId) -> Result<WorkItem, GatewayError> {
        tokio::task::yield_now().await;
        self.inner.get_work_item(id).await
    }

    async fn query_links(&self, query: &LinkQuery) -> Result<Vec<WorkItemLink>, GatewayError> {
        tokio::task::yield_now().await;
        self.inner.query_links(query).await
    }

    async fn get_work_item_types(&self, project: &str) -> Result<Vec<WorkItemType>, GatewayError> {
        tokio::task::yield_now().await;
        self.inner.get_work_item_types(project).await
    }
}
