//! Conformance measures: the entries of the settings catalogue

use crate::error::ValidationError;
use crate::tags::{self, is_valid_measure_name};
use serde::{Deserialize, Serialize};

/// One catalogue entry.
///
/// The `name` is the only identity a measure has; it is also the tag that
/// links the measure to its work item, so renaming a measure orphans any work
/// item created under the old name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    /// Unique name, also used as work-item title and tag
    pub name: String,
    /// Text shown while hovering the name in the table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_tip: Option<String>,
    /// Rich-text template for `System.Description`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `;`-delimited tags added to the created work item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_tags: Option<String>,
}

impl Measure {
    /// Create a measure with only a name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tool_tip: None,
            description: None,
            additional_tags: None,
        }
    }

    /// With tooltip
    #[inline]
    #[must_use]
    pub fn with_tool_tip(mut self, tool_tip: impl Into<String>) -> Self {
        self.tool_tip = Some(tool_tip.into());
        self
    }

    /// With description template
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With additional tags (`;`-delimited)
    #[inline]
    #[must_use]
    pub fn with_additional_tags(mut self, tags: impl Into<String>) -> Self {
        self.additional_tags = Some(tags.into());
        self
    }

    /// Tooltip for the name column, falling back to the name itself
    #[must_use]
    pub fn display_tool_tip(&self) -> &str {
        self.tool_tip.as_deref().unwrap_or(&self.name)
    }

    /// Additional tags as individual names
    pub fn additional_tag_list(&self) -> impl Iterator<Item = &str> {
        self.additional_tags
            .as_deref()
            .into_iter()
            .flat_map(tags::split_tags)
    }

    /// Full tag string for the measure's work item:
    /// conformance tag, measure name, then any additional tags.
    #[must_use]
    pub fn work_item_tags(&self, conformance_tag: &str) -> String {
        match self.additional_tags.as_deref() {
            Some(extra) if !extra.is_empty() => {
                format!("{conformance_tag};{};{extra}", self.name)
            }
            _ => format!("{conformance_tag};{}", self.name),
        }
    }

    /// Description seeded into a new work item, when non-empty
    #[must_use]
    pub fn seed_description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }
}

/// Validate a name for a new catalogue entry.
///
/// # Errors
/// [`ValidationError::InvalidName`] when the name is not a legal tag,
/// [`ValidationError::DuplicateName`] when an existing measure already uses it
/// (compared case-sensitively).
pub fn validate_new_name<'a, I>(name: &str, existing: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = &'a Measure>,
{
    if !is_valid_measure_name(name) {
        return Err(ValidationError::InvalidName(name.to_string()));
    }
    if existing.into_iter().any(|m| m.name == name) {
        return Err(ValidationError::DuplicateName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn work_item_tags_with_and_without_extras() {
        let plain = Measure::new("Usability Check");
        assert_eq!(plain.work_item_tags("Conformance"), "Conformance;Usability Check");

        let tagged = Measure::new("Data Privacy").with_additional_tags("Develop");
        assert_eq!(tagged.work_item_tags("Conformance"), "Conformance;Data Privacy;Develop");
    }

    #[test]
    fn tool_tip_falls_back_to_name() {
        let m = Measure::new("Cloud Costs");
        assert_eq!(m.display_tool_tip(), "Cloud Costs");
        let m = m.with_tool_tip("Check cloud spend");
        assert_eq!(m.display_tool_tip(), "Check cloud spend");
    }

    #[test]
    fn empty_description_is_not_seeded() {
        assert_eq!(Measure::new("a").with_description("").seed_description(), None);
        assert_eq!(Measure::new("a").with_description("x").seed_description(), Some("x"));
    }

    #[test]
    fn validate_rejects_duplicates_case_sensitively() {
        let catalogue = vec![Measure::new("Data Privacy")];
        assert_eq!(
            validate_new_name("Data Privacy", &catalogue),
            Err(ValidationError::DuplicateName("Data Privacy".to_string()))
        );
        assert!(validate_new_name("data privacy", &catalogue).is_ok());
    }

    #[test]
    fn validate_rejects_illegal_names_first() {
        let catalogue = vec![Measure::new("Bad;Name")];
        assert!(matches!(
            validate_new_name("Bad;Name", &catalogue),
            Err(ValidationError::InvalidName(_))
        ));
    }

    #[test]
    fn serde_uses_camel_case_and_skips_absent() {
        let m = Measure::new("Data Privacy")
            .with_tool_tip("tip")
            .with_additional_tags("Develop");
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "Data Privacy", "toolTip": "tip", "additionalTags": "Develop"})
        );
    }
}
