//! Work-item records as returned by the work-item tracking REST surface
//!
//! Only the parts the conformance graph reads are typed; everything else in
//! `fields` stays as raw JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Work-item id (32-bit on the backend)
pub type WorkItemId = i32;

/// Field reference names used by the conformance graph
pub mod fields {
    /// Title
    pub const TITLE: &str = "System.Title";
    /// `;`-delimited tag string
    pub const TAGS: &str = "System.Tags";
    /// Rich-text description
    pub const DESCRIPTION: &str = "System.Description";
    /// Workflow state
    pub const STATE: &str = "System.State";
    /// Reason for the current state
    pub const REASON: &str = "System.Reason";
    /// Last modification timestamp
    pub const CHANGED_DATE: &str = "System.ChangedDate";
    /// Assignee identity
    pub const ASSIGNED_TO: &str = "System.AssignedTo";
    /// Work-item type name
    pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
}

/// Link type names used when building and querying the graph
pub mod link_types {
    /// Relation added on a child pointing at its parent
    pub const HIERARCHY_REVERSE: &str = "System.LinkTypes.Hierarchy-Reverse";
    /// Parent → child, as seen from the parent
    pub const HIERARCHY_FORWARD: &str = "System.LinkTypes.Hierarchy-Forward";
    /// Related link, forward direction
    pub const RELATED_FORWARD: &str = "System.LinkTypes.Related-Forward";
    /// Short name for parent → child in link queries
    pub const CHILD: &str = "Child";
    /// Short name for related links in link queries
    pub const RELATED: &str = "Related";
}

/// A work item with its fields and relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Work-item id
    pub id: WorkItemId,
    /// Revision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<i32>,
    /// Field values keyed by reference name
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: serde_json::Map<String, serde_json::Value>,
    /// Links to other work items and artifacts
    #[serde(default, deserialize_with = "null_as_default")]
    pub relations: Vec<WorkItemRelation>,
    /// Hypermedia links (`html` is the browser URL)
    #[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
    pub links: Option<serde_json::Value>,
    /// REST resource URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl WorkItem {
    /// Create a bare work item (used by tests and backend doubles)
    #[must_use]
    pub fn new(id: WorkItemId) -> Self {
        Self {
            id,
            rev: Some(1),
            fields: serde_json::Map::new(),
            relations: Vec::new(),
            links: None,
            url: None,
        }
    }

    /// With a field value
    #[must_use]
    pub fn with_field(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// String value of a field
    #[must_use]
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(serde_json::Value::as_str)
    }

    /// `System.Title`
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.field_str(fields::TITLE)
    }

    /// Raw `System.Tags`
    #[must_use]
    pub fn tags(&self) -> Option<&str> {
        self.field_str(fields::TAGS)
    }

    /// `System.State`
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.field_str(fields::STATE)
    }

    /// `System.Reason`
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.field_str(fields::REASON)
    }

    /// `System.ChangedDate`, when present and well-formed
    #[must_use]
    pub fn changed_date(&self) -> Option<DateTime<Utc>> {
        self.field_str(fields::CHANGED_DATE)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// `System.AssignedTo`
    #[must_use]
    pub fn assigned_to(&self) -> Option<IdentityRef> {
        self.fields
            .get(fields::ASSIGNED_TO)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Browser URL from `_links.html.href`
    #[must_use]
    pub fn html_url(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|links| links.pointer("/html/href"))
            .and_then(serde_json::Value::as_str)
    }

    /// `#<id> · <title>`
    #[must_use]
    pub fn caption(&self) -> String {
        format!("#{} \u{00b7} {}", self.id, self.title().unwrap_or_default())
    }

    /// State text, with the reason appended when it differs from the state
    #[must_use]
    pub fn state_text(&self) -> Option<String> {
        let state = self.state()?;
        Some(match self.reason() {
            Some(reason) if reason != state => format!("{state} ({reason})"),
            _ => state.to_string(),
        })
    }

    /// Coarse state category for display
    #[must_use]
    pub fn state_category(&self) -> StateCategory {
        StateCategory::from_state(self.state().unwrap_or_default())
    }
}

/// Coarse grouping of workflow states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateCategory {
    /// Not started
    New,
    /// In progress
    Active,
    /// Done, awaiting verification
    Resolved,
    /// Finished
    Closed,
    /// Abandoned
    Removed,
    /// Custom or missing state
    Other,
}

impl StateCategory {
    /// Classify a state name, ignoring case
    #[must_use]
    pub fn from_state(state: &str) -> Self {
        match state.to_lowercase().as_str() {
            "new" => Self::New,
            "active" => Self::Active,
            "resolved" => Self::Resolved,
            "closed" => Self::Closed,
            "removed" => Self::Removed,
            _ => Self::Other,
        }
    }
}

/// Identity reference as stored in identity fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRef {
    /// Display name
    pub display_name: String,
    /// Account name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Relation on a work item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemRelation {
    /// Link type reference name
    pub rel: String,
    /// Target resource URL
    pub url: String,
    /// Link attributes
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Minimal reference to a work item inside link-query results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemReference {
    /// Work-item id
    pub id: WorkItemId,
    /// REST resource URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One row of a link-query result.
///
/// Element 0 of a result carries the query source as its `target` and no
/// `source`; later elements are the links found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemLink {
    /// Link type, absent on the source row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    /// Link source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<WorkItemReference>,
    /// Link target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<WorkItemReference>,
}

impl WorkItemLink {
    /// Id of the link target
    #[must_use]
    pub fn target_id(&self) -> Option<WorkItemId> {
        self.target.as_ref().map(|t| t.id)
    }
}

/// Work-item type descriptor offered by the settings editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemType {
    /// Type name, e.g. `Task`
    pub name: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Icon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<WorkItemIcon>,
    /// Reference name, e.g. `Microsoft.VSTS.WorkItemTypes.Task`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_name: Option<String>,
}

impl WorkItemType {
    /// Create a type descriptor with only a name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            icon: None,
            reference_name: None,
        }
    }
}

/// Work-item type icon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemIcon {
    /// Icon id
    pub id: String,
    /// Icon URL
    pub url: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
