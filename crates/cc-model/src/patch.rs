//! Add-only JSON-Patch documents for creating work items

use crate::work_item::{fields, link_types};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One JSON-Patch operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// Operation name; always `add` here
    pub op: String,
    /// Target path, e.g. `/fields/System.Title`
    pub path: String,
    /// Value to add
    pub value: serde_json::Value,
}

impl PatchOperation {
    /// `add` operation
    #[must_use]
    pub fn add(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            op: "add".to_string(),
            path: path.into(),
            value,
        }
    }

    /// `add` of a field value
    #[must_use]
    pub fn add_field(field: &str, value: impl Into<serde_json::Value>) -> Self {
        Self::add(format!("/fields/{field}"), value.into())
    }
}

/// Content of a work item to be created under a parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItemDraft {
    /// `System.Title`
    pub title: String,
    /// `System.Tags`
    pub tags: String,
    /// Resource URL of the parent; becomes a reverse-hierarchy relation
    pub parent_url: String,
    /// `System.Description`, when present
    pub description: Option<String>,
}

impl WorkItemDraft {
    /// Create a draft
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        tags: impl Into<String>,
        parent_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            tags: tags.into(),
            parent_url: parent_url.into(),
            description: None,
        }
    }

    /// With description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Patch document: title, parent relation, tags, then the optional description
    #[must_use]
    pub fn to_patch_document(&self) -> Vec<PatchOperation> {
        let mut document = vec![
            PatchOperation::add_field(fields::TITLE, self.title.as_str()),
            PatchOperation::add(
                "/relations/-",
                json!({
                    "rel": link_types::HIERARCHY_REVERSE,
                    "url": self.parent_url,
                }),
            ),
            PatchOperation::add_field(fields::TAGS, self.tags.as_str()),
        ];
        if let Some(description) = &self.description {
            document.push(PatchOperation::add_field(
                fields::DESCRIPTION,
                description.as_str(),
            ));
        }
        document
    }
}
