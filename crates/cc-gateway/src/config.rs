//! Connection configuration for the Azure DevOps services.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding a personal access token
pub const PAT_ENV_VAR: &str = "AZURE_DEVOPS_EXT_PAT";

/// How to reach the organisation, project and the extension's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Organisation name (`https://dev.azure.com/<organization>`)
    pub organization: String,
    /// Project name or id
    pub project: String,
    /// Personal access token; the environment variable takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_access_token: Option<String>,
    /// Extension publisher id
    pub publisher: String,
    /// Extension id
    #[serde(default = "default_extension_id")]
    pub extension_id: String,
    /// REST API version
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Override for the work-item host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_item_base_url: Option<String>,
    /// Override for the extension-management host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_data_base_url: Option<String>,
}

fn default_extension_id() -> String {
    "continuous-conformance".to_string()
}

fn default_api_version() -> String {
    "7.1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl ConnectionConfig {
    /// Create config with defaults for everything optional
    #[must_use]
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        publisher: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
            personal_access_token: None,
            publisher: publisher.into(),
            extension_id: default_extension_id(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            work_item_base_url: None,
            extension_data_base_url: None,
        }
    }

    /// With personal access token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.personal_access_token = Some(token.into());
        self
    }

    /// Point both hosts at one base URL (used against local doubles)
    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.work_item_base_url = Some(base.clone());
        self.extension_data_base_url = Some(base);
        self
    }

    /// Load config from YAML text.
    ///
    /// # Errors
    /// Fails on malformed YAML or missing required keys.
    pub fn from_yaml(yaml: &str) -> Result<Self, GatewayError> {
        serde_yaml::from_str(yaml).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Serialize to YAML.
    ///
    /// # Errors
    /// Fails only if serialization itself fails.
    pub fn to_yaml(&self) -> Result<String, GatewayError> {
        serde_yaml::to_string(self).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Load config from a YAML file.
    ///
    /// # Errors
    /// Fails when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&text)
    }

    /// Apply a token from the environment, if set
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var(PAT_ENV_VAR) {
            if !token.is_empty() {
                self.personal_access_token = Some(token);
            }
        }
        self
    }

    /// The personal access token.
    ///
    /// # Errors
    /// [`GatewayError::Config`] when no token is configured.
    pub fn token(&self) -> Result<&str, GatewayError> {
        self.personal_access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                GatewayError::Config(format!(
                    "no personal access token; set {PAT_ENV_VAR} or personal_access_token"
                ))
            })
    }

    /// Base URL of the work-item host
    #[must_use]
    pub fn work_item_base(&self) -> String {
        self.work_item_base_url
            .clone()
            .unwrap_or_else(|| format!("https://dev.azure.com/{}", self.organization))
    }

    /// Base URL of the extension-management host
    #[must_use]
    pub fn extension_data_base(&self) -> String {
        self.extension_data_base_url
            .clone()
            .unwrap_or_else(|| format!("https://extmgmt.dev.azure.com/{}", self.organization))
    }

    /// Request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
