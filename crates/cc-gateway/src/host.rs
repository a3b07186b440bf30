//! Host context outside a browser page
//!
//! The command-line front end has no work-item form; [`StaticHost`] stands
//! in for it with a fixed project and whichever work item was selected.

use crate::error::GatewayError;
use crate::traits::{HostContext, ProjectInfo};
use async_trait::async_trait;
use cc_model::WorkItemId;
use parking_lot::RwLock;

/// Host with a fixed project and a settable current work item.
#[derive(Debug)]
pub struct StaticHost {
    project: Option<ProjectInfo>,
    resource_base: String,
    current: RwLock<Option<(WorkItemId, Option<String>)>>,
}

impl StaticHost {
    /// Create a host for a project. `resource_base` is the organisation URL
    /// that work-item resource URLs hang off.
    #[must_use]
    pub fn new(project: Option<ProjectInfo>, resource_base: impl Into<String>) -> Self {
        Self {
            project,
            resource_base: resource_base.into(),
            current: RwLock::new(None),
        }
    }

    /// Open a work item, with its current title
    pub fn set_current(&self, id: WorkItemId, title: Option<String>) {
        *self.current.write() = Some((id, title));
    }

    /// Close the open work item
    pub fn clear_current(&self) {
        *self.current.write() = None;
    }
}

#[async_trait]
impl HostContext for StaticHost {
    async fn project(&self) -> Result<Option<ProjectInfo>, GatewayError> {
        Ok(self.project.clone())
    }

    async fn current_work_item_id(&self) -> Result<Option<WorkItemId>, GatewayError> {
        Ok(self.current.read().as_ref().map(|(id, _)| *id))
    }

    async fn current_title(&self) -> Result<Option<String>, GatewayError> {
        Ok(self.current.read().as_ref().and_then(|(_, title)| title.clone()))
    }

    async fn work_item_resource_url(&self, id: WorkItemId) -> Result<String, GatewayError> {
        Ok(format!(
            "{}/_apis/wit/workItems/{id}",
            self.resource_base.trim_end_matches('/')
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn current_item_round_trip() {
        let host = StaticHost::new(
            Some(ProjectInfo::new("guid", "Fabrikam")),
            "https://dev.azure.com/contoso/",
        );
        assert_eq!(host.current_work_item_id().await.unwrap(), None);

        host.set_current(42, Some("Login".into()));
        assert_eq!(host.current_work_item_id().await.unwrap(), Some(42));
        assert_eq!(host.current_title().await.unwrap().as_deref(), Some("Login"));
        assert_eq!(
            host.work_item_resource_url(42).await.unwrap(),
            "https://dev.azure.com/contoso/_apis/wit/workItems/42"
        );

        host.clear_current();
        assert_eq!(host.current_title().await.unwrap(), None);
    }
}
