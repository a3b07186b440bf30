//! The per-project settings document
//!
//! Stored in the extension's data namespace under the fixed key
//! [`SETTINGS_DOCUMENT_ID`]. Field names on the wire are the camelCase names
//! the extension data service has always stored.

use crate::defaults::{
    default_measures, DEFAULT_AGGREGATION_WORK_ITEM_TYPE, DEFAULT_CONFORMANCE_TAG,
    DEFAULT_WORK_ITEM_TYPE,
};
use crate::error::ValidationError;
use crate::measure::{validate_new_name, Measure};
use crate::tags::{is_valid_tag, split_tags};
use serde::{Deserialize, Deserializer, Serialize};

/// Key of the settings document
pub const SETTINGS_DOCUMENT_ID: &str = "settings";

/// Etag value that makes the data service overwrite unconditionally
pub const OVERWRITE_ETAG: &str = "-1";

/// Settings document: measure catalogue, tag convention and work-item types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Always [`SETTINGS_DOCUMENT_ID`]
    pub id: String,
    /// Optimistic-concurrency tag maintained by the data service
    #[serde(
        rename = "__etag",
        default,
        deserialize_with = "deserialize_etag",
        skip_serializing_if = "Option::is_none"
    )]
    pub etag: Option<String>,
    /// Ordered catalogue of measures
    pub available_measures: Vec<Measure>,
    /// Tag shared by every work item of a conformance graph
    pub conformance_tag: String,
    /// Work-item type of measure children
    pub work_item_type: String,
    /// Work-item type of the aggregator
    pub aggregation_work_item_type: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id: SETTINGS_DOCUMENT_ID.to_string(),
            etag: None,
            available_measures: default_measures(),
            conformance_tag: DEFAULT_CONFORMANCE_TAG.to_string(),
            work_item_type: DEFAULT_WORK_ITEM_TYPE.to_string(),
            aggregation_work_item_type: DEFAULT_AGGREGATION_WORK_ITEM_TYPE.to_string(),
        }
    }
}

impl Settings {
    /// Built-in defaults
    #[inline]
    #[must_use]
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Decode a stored document, filling any absent field from the defaults.
    ///
    /// # Errors
    /// Fails when the document is present but not shaped like settings.
    pub fn from_document(document: serde_json::Value) -> Result<Self, serde_json::Error> {
        let stored: StoredSettings = serde_json::from_value(document)?;
        Ok(stored.fill_defaults())
    }

    /// Prepare for an unconditional write: fixed id and overwrite etag.
    #[must_use]
    pub fn for_overwrite(mut self) -> Self {
        self.id = SETTINGS_DOCUMENT_ID.to_string();
        self.etag = Some(OVERWRITE_ETAG.to_string());
        self
    }

    /// Look up a measure by exact name
    #[must_use]
    pub fn measure(&self, name: &str) -> Option<&Measure> {
        self.available_measures.iter().find(|m| m.name == name)
    }

    /// Check the catalogue before it is stored.
    ///
    /// Every measure name must be a legal tag and unique (case-sensitive),
    /// and the conformance tag must be a single legal tag.
    ///
    /// # Errors
    /// The first offending name or tag.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (i, measure) in self.available_measures.iter().enumerate() {
            validate_new_name(&measure.name, &self.available_measures[..i])?;
        }
        let tag = self.conformance_tag.as_str();
        if !is_valid_tag(tag) || split_tags(tag).count() != 1 {
            return Err(ValidationError::InvalidTag(tag.to_string()));
        }
        Ok(())
    }

    /// Whether two documents agree on everything except the etag
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.id == other.id
            && self.available_measures == other.available_measures
            && self.conformance_tag == other.conformance_tag
            && self.work_item_type == other.work_item_type
            && self.aggregation_work_item_type == other.aggregation_work_item_type
    }
}

/// Document as stored: any field may be missing in older documents.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    id: Option<String>,
    #[serde(rename = "__etag", default, deserialize_with = "deserialize_etag")]
    etag: Option<String>,
    available_measures: Option<Vec<Measure>>,
    conformance_tag: Option<String>,
    work_item_type: Option<String>,
    aggregation_work_item_type: Option<String>,
}

impl StoredSettings {
    fn fill_defaults(self) -> Settings {
        let defaults = Settings::default();
        Settings {
            id: self.id.unwrap_or(defaults.id),
            etag: self.etag,
            available_measures: self.available_measures.unwrap_or(defaults.available_measures),
            conformance_tag: self.conformance_tag.unwrap_or(defaults.conformance_tag),
            work_item_type: self.work_item_type.unwrap_or(defaults.work_item_type),
            aggregation_work_item_type: self
                .aggregation_work_item_type
                .unwrap_or(defaults.aggregation_work_item_type),
        }
    }
}

// The data service hands back numeric etags; writers send "-1".
fn deserialize_etag<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
