//! Typed WIQL link queries
//!
//! Discovery only ever asks one shape of question: "which items linked from
//! `source` by one of these link types carry this tag?". [`LinkQuery`] keeps
//! that question structured and renders the WIQL text sent to the backend.

use crate::work_item::{link_types, WorkItemId};
use std::fmt;

/// Link query over `WorkItemLinks` with a target-tag predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkQuery {
    /// Source work item
    pub source: WorkItemId,
    /// Accepted link types (any of)
    pub link_types: Vec<String>,
    /// Tag the target must contain
    pub target_tag: String,
}

impl LinkQuery {
    /// Aggregator lookup from a parent: hierarchy-forward or related-forward links.
    #[must_use]
    pub fn aggregator(parent: WorkItemId, conformance_tag: &str) -> Self {
        Self {
            source: parent,
            link_types: vec![
                link_types::HIERARCHY_FORWARD.to_string(),
                link_types::RELATED_FORWARD.to_string(),
            ],
            target_tag: conformance_tag.to_string(),
        }
    }

    /// Measure lookup from an aggregator: child or related links.
    ///
    /// The link-type names differ from [`LinkQuery::aggregator`]; both sets
    /// are what the backend has always been asked for.
    #[must_use]
    pub fn measures(aggregator: WorkItemId, tag: &str) -> Self {
        Self {
            source: aggregator,
            link_types: vec![
                link_types::CHILD.to_string(),
                link_types::RELATED.to_string(),
            ],
            target_tag: tag.to_string(),
        }
    }

    /// WIQL text of this query
    #[must_use]
    pub fn to_wiql(&self) -> String {
        let links = self
            .link_types
            .iter()
            .map(|t| format!("([System.Links.LinkType] = '{}')", escape(t)))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!(
            "SELECT [System.Id] FROM WorkItemLinks WHERE ([Source].[System.Id] = '{}') AND ( {} ) AND ([Target].[System.Tags] CONTAINS '{}')",
            self.source,
            links,
            escape(&self.target_tag)
        )
    }
}

impl fmt::Display for LinkQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wiql())
    }
}

fn escape(literal: &str) -> String {
    literal.replace('\'', "''")
}
