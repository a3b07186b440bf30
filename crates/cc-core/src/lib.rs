//! Continuous Conformance engine
//!
//! Keeps a catalogue of conformance measures and, for any parent work item,
//! the two-level graph that tracks them:
//! - [`SettingsStore`] loads, saves and resets the per-project catalogue
//! - [`GraphEngine`] discovers and creates the aggregator and measure work items
//! - [`table`] joins catalogue entries with discovered work items into rows
//! - [`WorkItemPage`] drives the table on a work-item form
//! - [`SettingsEditor`] drives the project-settings view
//!
//! # Example
//!
//! ```rust,ignore
//! use cc_core::{ConformanceServices, TracingNotifier};
//! use std::sync::Arc;
//!
//! # async fn example(client: Arc<cc_gateway::AzureDevOpsClient>, host: Arc<cc_gateway::StaticHost>) {
//! let services = ConformanceServices::new(client.clone(), client, host, Arc::new(TracingNotifier));
//! let page = services.work_item_page();
//! page.load().await.ok();
//! page.select("Data Privacy").ok();
//! page.create_selected().await.ok();
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod editor;
pub mod error;
pub mod graph;
pub mod notify;
pub mod page;
pub mod session;
pub mod settings_store;
pub mod table;

pub use editor::{EditorState, MeasureDraft, SettingsEditor, TypeOptions};
pub use error::{ConformanceError, Result};
pub use graph::{DiscoveredGraph, GraphEngine, Materialised};
pub use notify::{Banner, BannerLevel, CollectingNotifier, Notifier, TracingNotifier};
pub use page::{CreateOutcome, FormEvent, WorkItemPage};
pub use session::SessionContext;
pub use settings_store::SettingsStore;
pub use table::{join, MeasureRow, RowState, SortColumn, SortOrder, TableEntry};

use cc_gateway::{ExtensionDataService, HostContext, WorkItemGateway};
use std::sync::Arc;

/// Session-wide wiring of the engine's parts
#[derive(Clone)]
pub struct ConformanceServices {
    /// Project and host context
    pub session: Arc<SessionContext>,
    /// Settings document access
    pub store: Arc<SettingsStore>,
    /// Graph discovery and materialisation
    pub engine: Arc<GraphEngine>,
    /// Banner sink
    pub notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for ConformanceServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConformanceServices")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl ConformanceServices {
    /// Wire the engine over its collaborators
    #[must_use]
    pub fn new(
        gateway: Arc<dyn WorkItemGateway>,
        data: Arc<dyn ExtensionDataService>,
        host: Arc<dyn HostContext>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let session = Arc::new(SessionContext::new(host));
        let store = Arc::new(SettingsStore::new(data, Arc::clone(&gateway), Arc::clone(&session)));
        let engine = Arc::new(GraphEngine::new(gateway, Arc::clone(&session)));
        Self {
            session,
            store,
            engine,
            notifier,
        }
    }

    /// Controller for a work-item form
    #[must_use]
    pub fn work_item_page(&self) -> WorkItemPage {
        WorkItemPage::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.store),
            Arc::clone(&self.session),
            Arc::clone(&self.notifier),
        )
    }

    /// Controller for the project-settings view
    pub async fn settings_editor(&self) -> SettingsEditor {
        SettingsEditor::load(Arc::clone(&self.store), Arc::clone(&self.notifier)).await
    }
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the engine
    pub use crate::{
        Banner, ConformanceError, ConformanceServices, FormEvent, GraphEngine, MeasureRow,
        RowState, SettingsEditor, SettingsStore, SortColumn, SortOrder, WorkItemPage,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
