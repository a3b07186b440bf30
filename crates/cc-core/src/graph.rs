//! Graph engine: discovery and materialisation of the conformance graph
//!
//! A conformance graph hangs off a parent work item:
//!
//! ```text
//! parent ──▶ aggregator (tagged with the conformance tag)
//!              ├──▶ measure work item (tagged conformance tag + measure name)
//!              └──▶ ...
//! ```
//!
//! Discovery walks it with two link queries. Link-query results put the
//! query source at index 0 and the first target at index 1; fewer than two
//! rows means nothing is linked.
//!
//! Materialisation creates the missing pieces one at a time, so a parent
//! never ends up with a second aggregator and an aggregator never gets a
//! second work item for the same measure.

use crate::error::{ConformanceError, Result};
use crate::session::SessionContext;
use cc_gateway::WorkItemGateway;
use cc_model::{LinkQuery, Measure, Settings, WorkItem, WorkItemDraft, WorkItemId, WorkItemLink};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of a discovery pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiscoveredGraph {
    /// Aggregator of the parent, if one is linked
    pub aggregator: Option<WorkItemId>,
    /// Measure work items under the aggregator, in link order
    pub measures: Vec<WorkItem>,
}

/// How a measure got its work item
#[derive(Debug, Clone, PartialEq)]
pub enum Materialised {
    /// An existing child was found and reused
    Adopted(WorkItem),
    /// A new work item was created
    Created(WorkItem),
}

impl Materialised {
    /// The linked work item
    #[must_use]
    pub fn work_item(&self) -> &WorkItem {
        match self {
            Self::Adopted(wi) | Self::Created(wi) => wi,
        }
    }

    /// Take the linked work item
    #[must_use]
    pub fn into_work_item(self) -> WorkItem {
        match self {
            Self::Adopted(wi) | Self::Created(wi) => wi,
        }
    }

    /// Whether a create call was issued
    #[must_use]
    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Target ids of a link-query result, skipping the source row
fn linked_targets(rows: &[WorkItemLink]) -> Vec<WorkItemId> {
    rows.iter().skip(1).filter_map(WorkItemLink::target_id).collect()
}

/// Discovers and builds conformance graphs
pub struct GraphEngine {
    gateway: Arc<dyn WorkItemGateway>,
    session: Arc<SessionContext>,
    /// parent → aggregator, filled by discovery and creation
    aggregators: Mutex<HashMap<WorkItemId, WorkItemId>>,
    /// Held from the existence check to the create call
    creating: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for GraphEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphEngine")
            .field("aggregators", &*self.aggregators.lock())
            .finish_non_exhaustive()
    }
}

impl GraphEngine {
    /// Create an engine
    #[must_use]
    pub fn new(gateway: Arc<dyn WorkItemGateway>, session: Arc<SessionContext>) -> Self {
        Self {
            gateway,
            session,
            aggregators: Mutex::new(HashMap::new()),
            creating: tokio::sync::Mutex::new(()),
        }
    }

    /// Aggregator id known for `parent` in this session
    #[must_use]
    pub fn cached_aggregator(&self, parent: WorkItemId) -> Option<WorkItemId> {
        self.aggregators.lock().get(&parent).copied()
    }

    /// Forget the aggregator of `parent`
    pub fn forget(&self, parent: WorkItemId) {
        self.aggregators.lock().remove(&parent);
    }

    /// Forget every cached aggregator
    pub fn reset(&self) {
        self.aggregators.lock().clear();
    }

    /// Aggregator linked from `parent` and tagged with `conformance_tag`.
    ///
    /// # Errors
    /// Backend failure of the link query.
    pub async fn find_aggregator(
        &self,
        parent: WorkItemId,
        conformance_tag: &str,
    ) -> Result<Option<WorkItemId>> {
        let query = LinkQuery::aggregator(parent, conformance_tag);
        tracing::debug!(wiql = %query, "aggregator query");
        let rows = self.gateway.query_links(&query).await?;
        let aggregator = rows.get(1).and_then(WorkItemLink::target_id);
        if let Some(aggregator) = aggregator {
            self.aggregators.lock().insert(parent, aggregator);
        }
        Ok(aggregator)
    }

    /// Ids of children of `aggregator` tagged with `tag`, in link order.
    ///
    /// # Errors
    /// Backend failure of the link query.
    pub async fn find_measure_ids(
        &self,
        aggregator: WorkItemId,
        tag: &str,
    ) -> Result<Vec<WorkItemId>> {
        let query = LinkQuery::measures(aggregator, tag);
        tracing::debug!(wiql = %query, "measure query");
        let rows = self.gateway.query_links(&query).await?;
        Ok(linked_targets(&rows))
    }

    /// Aggregator and measure work items of `parent`.
    ///
    /// # Errors
    /// Backend failure of a query or of the batch fetch.
    pub async fn discover(&self, parent: WorkItemId, settings: &Settings) -> Result<DiscoveredGraph> {
        let tag = settings.conformance_tag.as_str();
        let Some(aggregator) = self.find_aggregator(parent, tag).await? else {
            tracing::debug!(parent, "no aggregator linked");
            return Ok(DiscoveredGraph::default());
        };

        let ids = self.find_measure_ids(aggregator, tag).await?;
        let measures = self.gateway.get_work_items(&ids).await?;
        tracing::debug!(parent, aggregator, measures = measures.len(), "graph discovered");
        Ok(DiscoveredGraph {
            aggregator: Some(aggregator),
            measures,
        })
    }

    /// Existing child of `aggregator` tagged with the measure name.
    ///
    /// # Errors
    /// Backend failure of the query or the fetch.
    pub async fn find_linked_measure(
        &self,
        aggregator: WorkItemId,
        measure_name: &str,
    ) -> Result<Option<WorkItem>> {
        let ids = self.find_measure_ids(aggregator, measure_name).await?;
        match ids.first() {
            Some(&id) => Ok(Some(self.gateway.get_work_item(id).await?)),
            None => Ok(None),
        }
    }

    /// Aggregator of `parent`, discovered once or created.
    ///
    /// # Errors
    /// Backend failure, or a missing project / parent title context.
    pub async fn ensure_aggregator(&self, parent: WorkItemId, settings: &Settings) -> Result<WorkItemId> {
        let _creating = self.creating.lock().await;
        self.ensure_aggregator_locked(parent, settings).await
    }

    async fn ensure_aggregator_locked(&self, parent: WorkItemId, settings: &Settings) -> Result<WorkItemId> {
        if let Some(aggregator) = self.cached_aggregator(parent) {
            return Ok(aggregator);
        }
        if let Some(aggregator) = self.find_aggregator(parent, &settings.conformance_tag).await? {
            return Ok(aggregator);
        }

        let title = self.parent_title(parent).await?;
        let host = self.session.host();
        let parent_url = host.work_item_resource_url(parent).await?;
        let draft = WorkItemDraft::new(
            format!("Conformance ({title})"),
            settings.conformance_tag.as_str(),
            parent_url,
        );
        let project = self.session.project().await?;
        let created = self
            .gateway
            .create_work_item(&draft, &project.name, &settings.aggregation_work_item_type)
            .await?;
        tracing::info!(parent, aggregator = created.id, "aggregator created");
        self.aggregators.lock().insert(parent, created.id);
        Ok(created.id)
    }

    /// Link a work item for `measure` under the aggregator of `parent`,
    /// reusing an existing one when the aggregator already has it.
    ///
    /// # Errors
    /// Backend failure; nothing is rolled back.
    pub async fn materialise_measure(
        &self,
        parent: WorkItemId,
        measure: &Measure,
        settings: &Settings,
    ) -> Result<Materialised> {
        let _creating = self.creating.lock().await;
        let aggregator = self.ensure_aggregator_locked(parent, settings).await?;

        if let Some(existing) = self.find_linked_measure(aggregator, &measure.name).await? {
            tracing::info!(measure = %measure.name, id = existing.id, "measure work item adopted");
            return Ok(Materialised::Adopted(existing));
        }

        let aggregator_url = self.session.host().work_item_resource_url(aggregator).await?;
        let mut draft = WorkItemDraft::new(
            measure.name.as_str(),
            measure.work_item_tags(&settings.conformance_tag),
            aggregator_url,
        );
        if let Some(description) = measure.seed_description() {
            draft = draft.with_description(description);
        }
        let project = self.session.project().await?;
        let created = self
            .gateway
            .create_work_item(&draft, &project.name, &settings.work_item_type)
            .await?;
        tracing::info!(measure = %measure.name, id = created.id, aggregator, "measure work item created");
        Ok(Materialised::Created(created))
    }

    async fn parent_title(&self, parent: WorkItemId) -> Result<String> {
        let host = self.session.host();
        if host.current_work_item_id().await? == Some(parent) {
            if let Some(title) = host.current_title().await? {
                return Ok(title);
            }
        }
        let item = self.gateway.get_work_item(parent).await?;
        item.title()
            .map(str::to_string)
            .ok_or_else(|| ConformanceError::precondition(format!("work item {parent} has no title")))
    }
}
