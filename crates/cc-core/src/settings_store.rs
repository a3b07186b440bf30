//! Settings store
//!
//! Reads, writes and resets the per-project settings document. Reads never
//! fail: a missing or unreadable document yields the built-in defaults, and
//! nothing is written back.

use crate::error::{ConformanceError, Result};
use crate::session::SessionContext;
use cc_gateway::{ExtensionDataService, GatewayError, WorkItemGateway};
use cc_model::{Settings, WorkItemType, SETTINGS_DOCUMENT_ID};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

/// Per-session access to the settings document and work-item types
pub struct SettingsStore {
    data: Arc<dyn ExtensionDataService>,
    gateway: Arc<dyn WorkItemGateway>,
    session: Arc<SessionContext>,
    cached: RwLock<Option<Settings>>,
    work_item_types: OnceCell<Vec<WorkItemType>>,
    pending_delete: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("session", &self.session)
            .field("cached", &self.cached.read().is_some())
            .finish_non_exhaustive()
    }
}

impl SettingsStore {
    /// Create a store
    #[must_use]
    pub fn new(
        data: Arc<dyn ExtensionDataService>,
        gateway: Arc<dyn WorkItemGateway>,
        session: Arc<SessionContext>,
    ) -> Self {
        Self {
            data,
            gateway,
            session,
            cached: RwLock::new(None),
            work_item_types: OnceCell::new(),
            pending_delete: Mutex::new(None),
        }
    }

    /// Active settings for the project.
    ///
    /// Absent fields are filled from the defaults. A missing document, a read
    /// failure or a malformed document all yield the defaults.
    pub async fn get_settings(&self) -> Settings {
        let cached = self.cached.read().clone();
        if let Some(settings) = cached {
            return settings;
        }

        let collection = match self.session.project().await {
            Ok(project) => project.id.clone(),
            Err(err) => {
                tracing::warn!(error = %err, "no project for settings; using defaults");
                return Settings::defaults();
            }
        };

        let settings = match self.data.get_document(&collection, SETTINGS_DOCUMENT_ID).await {
            Ok(Some(document)) => match Settings::from_document(document) {
                Ok(settings) => settings,
                Err(err) => {
                    tracing::warn!(error = %err, "stored settings are malformed; using defaults");
                    return Settings::defaults();
                }
            },
            Ok(None) => {
                tracing::debug!("no stored settings; using defaults");
                Settings::defaults()
            }
            Err(err) => {
                tracing::warn!(error = %err, "settings read failed; using defaults");
                return Settings::defaults();
            }
        };

        tracing::debug!(
            measures = settings.available_measures.len(),
            conformance_tag = %settings.conformance_tag,
            "active settings"
        );
        *self.cached.write() = Some(settings.clone());
        settings
    }

    /// Drop the cached settings so the next read goes to the data service
    pub fn invalidate(&self) {
        *self.cached.write() = None;
    }

    /// Overwrite the stored document (last writer wins).
    ///
    /// # Errors
    /// [`ConformanceError::Backend`] when the write fails; the cache is left
    /// untouched in that case.
    pub async fn store_settings(&self, settings: &Settings) -> Result<Settings> {
        // A reset still in flight must not delete what is written now.
        self.settle().await;

        let collection = self.session.project().await?.id.clone();
        let document = serde_json::to_value(settings.clone().for_overwrite())
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        let stored = self.data.set_document(&collection, document).await?;
        let stored = Settings::from_document(stored)
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        tracing::info!(
            measures = stored.available_measures.len(),
            etag = ?stored.etag,
            "settings stored"
        );
        *self.cached.write() = Some(stored.clone());
        Ok(stored)
    }

    /// Forget the stored document and return the defaults.
    ///
    /// The delete runs detached; its failure (usually "nothing stored") is
    /// only logged.
    pub async fn restore_default(&self) -> Settings {
        let defaults = Settings::defaults();
        *self.cached.write() = Some(defaults.clone());

        match self.session.project().await {
            Ok(project) => {
                let data = Arc::clone(&self.data);
                let collection = project.id.clone();
                let handle = tokio::spawn(async move {
                    match data.delete_document(&collection, SETTINGS_DOCUMENT_ID).await {
                        Ok(()) => tracing::info!("stored settings removed"),
                        Err(err) if err.is_not_found() => {
                            tracing::debug!("no stored settings to remove");
                        }
                        Err(err) => tracing::debug!(error = %err, "settings delete failed"),
                    }
                });
                *self.pending_delete.lock() = Some(handle);
            }
            Err(err) => tracing::debug!(error = %err, "no project; nothing to remove"),
        }
        defaults
    }

    /// Wait for a detached delete started by [`Self::restore_default`]
    pub async fn settle(&self) {
        let pending = self.pending_delete.lock().take();
        if let Some(handle) = pending {
            if let Err(err) = handle.await {
                tracing::debug!(error = %err, "settings delete task aborted");
            }
        }
    }

    /// Work-item types of the project, fetched once per session.
    ///
    /// # Errors
    /// Backend failure or missing project context.
    pub async fn get_work_item_types(&self) -> Result<&[WorkItemType]> {
        let types = self
            .work_item_types
            .get_or_try_init(|| async {
                let project = self.session.project().await?;
                let types = self.gateway.get_work_item_types(&project.name).await?;
                tracing::debug!(count = types.len(), "work item types loaded");
                Ok::<_, ConformanceError>(types)
            })
            .await?;
        Ok(types.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_test_utils::{test_host, InMemoryDataService, InMemoryWorkItems, PROJECT_ID};
    use cc_model::Measure;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store() -> (SettingsStore, Arc<InMemoryDataService>) {
        let data = Arc::new(InMemoryDataService::new());
        let session = Arc::new(SessionContext::new(test_host()));
        let store = SettingsStore::new(data.clone(), Arc::new(InMemoryWorkItems::new()), session);
        (store, data)
    }

    #[tokio::test]
    async fn defaults_without_writing() {
        let (store, data) = store();
        let settings = store.get_settings().await;
        assert_eq!(settings, Settings::defaults());
        assert!(data.document(PROJECT_ID, SETTINGS_DOCUMENT_ID).is_none());
    }

    #[tokio::test]
    async fn read_failure_falls_back_and_is_not_cached() {
        let (store, data) = store();
        data.seed(PROJECT_ID, json!({"id": "settings", "conformanceTag": "CC"}));
        data.fail_reads(true);
        assert_eq!(store.get_settings().await.conformance_tag, "Conformance");

        data.fail_reads(false);
        assert_eq!(store.get_settings().await.conformance_tag, "CC");
    }

    #[tokio::test]
    async fn absent_fields_are_filled() {
        let (store, data) = store();
        data.seed(PROJECT_ID, json!({"id": "settings", "__etag": 4, "workItemType": "Bug"}));
        let settings = store.get_settings().await;
        assert_eq!(settings.work_item_type, "Bug");
        assert_eq!(settings.aggregation_work_item_type, "User Story");
        assert_eq!(settings.available_measures.len(), 11);
        assert_eq!(settings.etag.as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn store_forces_overwrite() {
        let (store, data) = store();
        data.seed(PROJECT_ID, json!({"id": "settings", "__etag": 9}));
        let mut settings = Settings::defaults();
        settings.available_measures.push(Measure::new("Custom"));
        settings.etag = Some("3".into());

        let stored = store.store_settings(&settings).await.unwrap();
        assert!(stored.same_content(&settings));
        assert!(store.get_settings().await.measure("Custom").is_some());
    }

    #[tokio::test]
    async fn failed_store_keeps_cache() {
        let (store, data) = store();
        let before = store.get_settings().await;
        data.fail_writes(true);
        let mut changed = before.clone();
        changed.conformance_tag = "Other".into();
        assert!(store.store_settings(&changed).await.unwrap_err().is_backend());
        assert_eq!(store.get_settings().await, before);
    }

    #[tokio::test]
    async fn restore_deletes_in_background() {
        let (store, data) = store();
        data.seed(PROJECT_ID, json!({"id": "settings", "conformanceTag": "CC"}));
        assert_eq!(store.get_settings().await.conformance_tag, "CC");

        let defaults = store.restore_default().await;
        assert_eq!(defaults, Settings::defaults());
        assert_eq!(store.get_settings().await, Settings::defaults());

        store.settle().await;
        assert_eq!(data.delete_calls(), 1);
        assert!(data.document(PROJECT_ID, SETTINGS_DOCUMENT_ID).is_none());
    }

    #[tokio::test]
    async fn restore_without_document_swallows_not_found() {
        let (store, data) = store();
        store.restore_default().await;
        store.settle().await;
        assert_eq!(data.delete_calls(), 1);
    }

    #[tokio::test]
    async fn work_item_types_fetched_once() {
        let (store, _) = store();
        let names: Vec<_> = store
            .get_work_item_types()
            .await
            .unwrap()
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert!(names.contains(&"User Story".to_string()));
    }
}
