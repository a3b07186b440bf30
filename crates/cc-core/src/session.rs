//! Session-scoped context
//!
//! One per page session. Project info is resolved once and shared by the
//! settings store and the graph engine.

use crate::error::{ConformanceError, Result};
use cc_gateway::{HostContext, ProjectInfo};
use cc_model::WorkItemId;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Lazily initialised session state
pub struct SessionContext {
    host: Arc<dyn HostContext>,
    project: OnceCell<ProjectInfo>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("project", &self.project.get())
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Create a session over a host
    #[must_use]
    pub fn new(host: Arc<dyn HostContext>) -> Self {
        Self {
            host,
            project: OnceCell::new(),
        }
    }

    /// The hosting page
    #[must_use]
    pub fn host(&self) -> &Arc<dyn HostContext> {
        &self.host
    }

    /// Project of this session, resolved on first use.
    ///
    /// # Errors
    /// [`ConformanceError::Precondition`] outside a project,
    /// [`ConformanceError::Backend`] when the host cannot be asked.
    pub async fn project(&self) -> Result<&ProjectInfo> {
        self.project
            .get_or_try_init(|| async {
                self.host
                    .project()
                    .await?
                    .ok_or_else(|| ConformanceError::precondition("no project context"))
            })
            .await
    }

    /// Work item open in the form.
    ///
    /// # Errors
    /// [`ConformanceError::Precondition`] when no work item is open.
    pub async fn current_work_item(&self) -> Result<WorkItemId> {
        self.host
            .current_work_item_id()
            .await?
            .ok_or_else(|| ConformanceError::precondition("no current work item"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_gateway::StaticHost;

    #[tokio::test]
    async fn project_resolved_once() {
        let host = Arc::new(StaticHost::new(
            Some(ProjectInfo::new("guid", "Fabrikam")),
            "https://dev.azure.com/o",
        ));
        let session = SessionContext::new(host);
        assert_eq!(session.project().await.unwrap().name, "Fabrikam");
        assert_eq!(session.project().await.unwrap().id, "guid");
    }

    #[tokio::test]
    async fn missing_context_is_precondition() {
        let session = SessionContext::new(Arc::new(StaticHost::new(None, "https://x")));
        assert!(matches!(
            session.project().await,
            Err(ConformanceError::Precondition(_))
        ));
        assert!(matches!(
            session.current_work_item().await,
            Err(ConformanceError::Precondition(_))
        ));
    }
}
