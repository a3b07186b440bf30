//! Testing utilities for the continuous conformance workspace
//!
//! Backend doubles, fixtures and small builders shared by the integration
//! tests of the engine and the CLI.

#![allow(missing_docs)]

pub mod backend;
pub mod data;
pub mod yielding;

pub use backend::{InMemoryWorkItems, BASE_URL};
pub use data::InMemoryDataService;
pub use yielding::YieldingGateway;

use cc_gateway::{ProjectInfo, StaticHost};
use cc_model::{Measure, Settings, WorkItemId};
use std::sync::Arc;

pub const PROJECT_ID: &str = "00000000-0000-0000-0000-00000000f00d";
pub const PROJECT_NAME: &str = "Fabrikam";

pub fn test_project() -> ProjectInfo {
    ProjectInfo::new(PROJECT_ID, PROJECT_NAME)
}

/// Host with the test project and no open work item
pub fn test_host() -> Arc<StaticHost> {
    Arc::new(StaticHost::new(Some(test_project()), BASE_URL))
}

/// Host with the test project and `id` open under `title`
pub fn host_for(id: WorkItemId, title: &str) -> Arc<StaticHost> {
    let host = test_host();
    host.set_current(id, Some(title.to_string()));
    host
}

/// Host outside any project
pub fn projectless_host() -> Arc<StaticHost> {
    Arc::new(StaticHost::new(None, BASE_URL))
}

/// Backend with one parent work item; returns the parent id
pub fn backend_with_parent(title: &str) -> (Arc<InMemoryWorkItems>, WorkItemId) {
    let backend = Arc::new(InMemoryWorkItems::new());
    let parent = backend.add_item("Feature", title, "");
    (backend, parent)
}

/// Small catalogue used where the full defaults would be noise
pub fn small_settings() -> Settings {
    Settings {
        available_measures: vec![
            Measure::new("Threat and Risk Analysis").with_tool_tip("Analyse threats"),
            Measure::new("Data Privacy")
                .with_description("<p>Check privacy</p>")
                .with_additional_tags("Develop"),
            Measure::new("Usability Check"),
        ],
        ..Settings::default()
    }
}
