//! Backend seams for Continuous Conformance
//!
//! Traits for the three collaborators the engine depends on, plus the
//! Azure DevOps REST implementation and a static host for non-browser use.

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
mod extension_data;
pub mod host;
pub mod rest;
pub mod traits;

pub use config::{ConnectionConfig, PAT_ENV_VAR};
pub use error::GatewayError;
pub use host::StaticHost;
pub use rest::AzureDevOpsClient;
pub use traits::{ExtensionDataService, HostContext, ProjectInfo, WorkItemGateway};
