//! In-memory work-item backend
//!
//! Keeps a tiny work-item graph and answers typed link queries the way the
//! REST backend does: row 0 is the query source, later rows are the links
//! found, in insertion order.

use async_trait::async_trait;
use cc_gateway::{GatewayError, WorkItemGateway};
use cc_model::tags::split_tags;
use cc_model::work_item::{fields, link_types};
use cc_model::{
    LinkQuery, WorkItem, WorkItemDraft, WorkItemId, WorkItemLink, WorkItemReference,
    WorkItemRelation, WorkItemType,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Base URL used for resource URLs of in-memory work items
pub const BASE_URL: &str = "https://dev.azure.com/test-org";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    Hierarchy,
    Related,
}

impl LinkKind {
    fn from_query_name(name: &str) -> Option<Self> {
        match name {
            link_types::HIERARCHY_FORWARD | link_types::CHILD => Some(Self::Hierarchy),
            link_types::RELATED_FORWARD | link_types::RELATED => Some(Self::Related),
            _ => None,
        }
    }

    fn forward_name(self) -> &'static str {
        match self {
            Self::Hierarchy => link_types::HIERARCHY_FORWARD,
            Self::Related => "System.LinkTypes.Related",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    source: WorkItemId,
    target: WorkItemId,
    kind: LinkKind,
}

#[derive(Debug, Default)]
struct Graph {
    items: BTreeMap<WorkItemId, WorkItem>,
    edges: Vec<Edge>,
    next_id: WorkItemId,
}

/// Work-item backend double with call counters and failure injection.
#[derive(Debug)]
pub struct InMemoryWorkItems {
    graph: Mutex<Graph>,
    types: Mutex<Vec<WorkItemType>>,
    create_calls: AtomicUsize,
    query_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    fail_create_on: Mutex<Option<usize>>,
    fail_queries: Mutex<bool>,
}

impl Default for InMemoryWorkItems {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWorkItems {
    pub fn new() -> Self {
        Self {
            graph: Mutex::new(Graph {
                next_id: 1,
                ..Graph::default()
            }),
            types: Mutex::new(
                ["Bug", "Epic", "Feature", "Task", "User Story"]
                    .into_iter()
                    .map(WorkItemType::named)
                    .collect(),
            ),
            create_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            fail_create_on: Mutex::new(None),
            fail_queries: Mutex::new(false),
        }
    }

    pub fn resource_url(id: WorkItemId) -> String {
        format!("{BASE_URL}/_apis/wit/workItems/{id}")
    }

    /// Seed a work item with a fixed id
    pub fn insert(&self, item: WorkItem) -> WorkItemId {
        let mut graph = self.graph.lock();
        let id = item.id;
        graph.next_id = graph.next_id.max(id + 1);
        graph.items.insert(id, item);
        id
    }

    /// Seed a work item, returning its id
    pub fn add_item(&self, work_item_type: &str, title: &str, tags: &str) -> WorkItemId {
        let mut graph = self.graph.lock();
        let id = graph.next_id;
        graph.next_id += 1;
        graph.items.insert(id, new_item(id, work_item_type, title, tags, None));
        id
    }

    /// Parent/child link, recorded on both ends
    pub fn link_child(&self, parent: WorkItemId, child: WorkItemId) {
        let mut graph = self.graph.lock();
        link(&mut graph, parent, child, LinkKind::Hierarchy);
    }

    /// Related link from `source` to `target`
    pub fn link_related(&self, source: WorkItemId, target: WorkItemId) {
        let mut graph = self.graph.lock();
        link(&mut graph, source, target, LinkKind::Related);
    }

    pub fn set_types(&self, types: Vec<WorkItemType>) {
        *self.types.lock() = types;
    }

    pub fn item(&self, id: WorkItemId) -> Option<WorkItem> {
        self.graph.lock().items.get(&id).cloned()
    }

    pub fn update_field(&self, id: WorkItemId, field: &str, value: serde_json::Value) {
        if let Some(item) = self.graph.lock().items.get_mut(&id) {
            item.fields.insert(field.to_string(), value);
        }
    }

    /// Hierarchy children of a work item, in link order
    pub fn children(&self, parent: WorkItemId) -> Vec<WorkItemId> {
        self.graph
            .lock()
            .edges
            .iter()
            .filter(|e| e.source == parent && e.kind == LinkKind::Hierarchy)
            .map(|e| e.target)
            .collect()
    }

    /// Hierarchy children of `parent` whose tags include `tag`
    pub fn children_tagged(&self, parent: WorkItemId, tag: &str) -> Vec<WorkItemId> {
        let children = self.children(parent);
        let graph = self.graph.lock();
        children
            .into_iter()
            .filter(|id| graph.items.get(id).is_some_and(|item| has_tag(item, tag)))
            .collect()
    }

    pub fn item_count(&self) -> usize {
        self.graph.lock().items.len()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Fail the `n`-th create call (1-based, counted over all calls)
    pub fn fail_create_on(&self, n: usize) {
        *self.fail_create_on.lock() = Some(n);
    }

    pub fn fail_queries(&self, fail: bool) {
        *self.fail_queries.lock() = fail;
    }
}

fn new_item(
    id: WorkItemId,
    work_item_type: &str,
    title: &str,
    tags: &str,
    description: Option<&str>,
) -> WorkItem {
    // The backend normalises tag separators to "; "
    let tags = split_tags(tags).collect::<Vec<_>>().join("; ");
    let mut item = WorkItem::new(id)
        .with_field(fields::TITLE, title)
        .with_field(fields::WORK_ITEM_TYPE, work_item_type)
        .with_field(fields::STATE, "New")
        .with_field(fields::REASON, "New")
        .with_field(fields::CHANGED_DATE, chrono::Utc::now().to_rfc3339());
    if !tags.is_empty() {
        item = item.with_field(fields::TAGS, tags);
    }
    if let Some(description) = description {
        item = item.with_field(fields::DESCRIPTION, description);
    }
    item.url = Some(InMemoryWorkItems::resource_url(id));
    item.links = Some(serde_json::json!({
        "html": {"href": format!("{BASE_URL}/_workitems/edit/{id}")}
    }));
    item
}

fn link(graph: &mut Graph, source: WorkItemId, target: WorkItemId, kind: LinkKind) {
    graph.edges.push(Edge {
        source,
        target,
        kind,
    });
    let (forward, reverse) = match kind {
        LinkKind::Hierarchy => (link_types::HIERARCHY_FORWARD, link_types::HIERARCHY_REVERSE),
        LinkKind::Related => ("System.LinkTypes.Related", "System.LinkTypes.Related"),
    };
    if let Some(item) = graph.items.get_mut(&source) {
        item.relations.push(relation(forward, target));
    }
    if let Some(item) = graph.items.get_mut(&target) {
        item.relations.push(relation(reverse, source));
    }
}

fn relation(rel: &str, target: WorkItemId) -> WorkItemRelation {
    WorkItemRelation {
        rel: rel.to_string(),
        url: InMemoryWorkItems::resource_url(target),
        attributes: serde_json::Map::new(),
    }
}

// Tag predicates on the backend match whole tags, ignoring case.
fn has_tag(item: &WorkItem, tag: &str) -> bool {
    item.tags()
        .is_some_and(|tags| split_tags(tags).any(|t| t.eq_ignore_ascii_case(tag)))
}

fn id_from_url(url: &str) -> Option<WorkItemId> {
    url.rsplit('/').next().and_then(|last| last.parse().ok())
}

fn reference(id: WorkItemId) -> WorkItemReference {
    WorkItemReference {
        id,
        url: Some(InMemoryWorkItems::resource_url(id)),
    }
}

#[async_trait]
impl WorkItemGateway for InMemoryWorkItems {
    async fn create_work_item(
        &self,
        draft: &WorkItemDraft,
        _project: &str,
        work_item_type: &str,
    ) -> Result<WorkItem, GatewayError> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.fail_create_on.lock() == Some(call) {
            return Err(GatewayError::Status {
                status: 500,
                body: format!("injected failure on create #{call}"),
            });
        }

        let mut graph = self.graph.lock();
        let parent = id_from_url(&draft.parent_url)
            .filter(|id| graph.items.contains_key(id))
            .ok_or_else(|| GatewayError::Status {
                status: 400,
                body: format!("unknown relation target {}", draft.parent_url),
            })?;
        let id = graph.next_id;
        graph.next_id += 1;
        graph.items.insert(
            id,
            new_item(
                id,
                work_item_type,
                &draft.title,
                &draft.tags,
                draft.description.as_deref(),
            ),
        );
        link(&mut graph, parent, id, LinkKind::Hierarchy);
        graph
            .items
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("work item {id}")))
    }

    async fn get_work_items(&self, ids: &[WorkItemId]) -> Result<Vec<WorkItem>, GatewayError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let graph = self.graph.lock();
        ids.iter()
            .map(|id| {
                graph
                    .items
                    .get(id)
                    .cloned()
                    .ok_or_else(|| GatewayError::NotFound(format!("work item {id}")))
            })
            .collect()
    }

    async fn get_work_item(&self, id: WorkItemId) -> Result<WorkItem, GatewayError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.item(id)
            .ok_or_else(|| GatewayError::NotFound(format!("work item {id}")))
    }

    async fn query_links(&self, query: &LinkQuery) -> Result<Vec<WorkItemLink>, GatewayError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_queries.lock() {
            return Err(GatewayError::Transport("injected query failure".into()));
        }
        let kinds: Vec<LinkKind> = query
            .link_types
            .iter()
            .filter_map(|name| LinkKind::from_query_name(name))
            .collect();

        let graph = self.graph.lock();
        if !graph.items.contains_key(&query.source) {
            return Ok(Vec::new());
        }
        let mut rows = vec![WorkItemLink {
            rel: None,
            source: None,
            target: Some(reference(query.source)),
        }];
        rows.extend(
            graph
                .edges
                .iter()
                .filter(|e| e.source == query.source && kinds.contains(&e.kind))
                .filter(|e| {
                    graph
                        .items
                        .get(&e.target)
                        .is_some_and(|item| has_tag(item, &query.target_tag))
                })
                .map(|e| WorkItemLink {
                    rel: Some(e.kind.forward_name().to_string()),
                    source: Some(reference(e.source)),
                    target: Some(reference(e.target)),
                }),
        );
        Ok(rows)
    }

    async fn get_work_item_types(&self, _project: &str) -> Result<Vec<WorkItemType>, GatewayError> {
        Ok(self.types.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn query_rows_start_with_source() {
        let backend = InMemoryWorkItems::new();
        let parent = backend.add_item("Feature", "Login", "");
        let agg = backend.add_item("User Story", "Conformance (Login)", "Conformance");
        let other = backend.add_item("Task", "Unrelated", "Other");
        backend.link_child(parent, agg);
        backend.link_child(parent, other);

        let rows = backend
            .query_links(&LinkQuery::aggregator(parent, "conformance"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].target_id(), Some(parent));
        assert_eq!(rows[1].target_id(), Some(agg));
    }

    #[tokio::test]
    async fn create_links_to_parent() {
        let backend = InMemoryWorkItems::new();
        let parent = backend.add_item("Feature", "Login", "");
        let draft = WorkItemDraft::new("Data Privacy", "Conformance;Data Privacy", InMemoryWorkItems::resource_url(parent));
        let created = backend.create_work_item(&draft, "p", "Task").await.unwrap();

        assert_eq!(created.tags(), Some("Conformance; Data Privacy"));
        assert_eq!(created.relations[0].rel, link_types::HIERARCHY_REVERSE);
        assert_eq!(backend.children(parent), vec![created.id]);
    }

    #[tokio::test]
    async fn injected_create_failure() {
        let backend = InMemoryWorkItems::new();
        let parent = backend.add_item("Feature", "Login", "");
        backend.fail_create_on(1);
        let draft = WorkItemDraft::new("x", "y", InMemoryWorkItems::resource_url(parent));
        assert!(backend.create_work_item(&draft, "p", "Task").await.is_err());
        assert!(backend.create_work_item(&draft, "p", "Task").await.is_ok());
        assert_eq!(backend.create_calls(), 2);
    }

    #[tokio::test]
    async fn batch_fetch_fails_on_missing_id() {
        let backend = InMemoryWorkItems::new();
        let id = backend.add_item("Task", "a", "");
        assert!(backend.get_work_items(&[id, 999]).await.unwrap_err().is_not_found());
        assert!(backend.get_work_items(&[]).await.unwrap().is_empty());
        assert_eq!(backend.fetch_calls(), 1);
    }
}
