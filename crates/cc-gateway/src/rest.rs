//! Azure DevOps REST backend.
//!
//! One [`AzureDevOpsClient`] serves both the work-item tracking surface and
//! the extension-management document store. Requests authenticate with a
//! personal access token over basic auth.

use crate::config::ConnectionConfig;
use crate::error::GatewayError;
use crate::traits::{ProjectInfo, WorkItemGateway};
use async_trait::async_trait;
use cc_model::{LinkQuery, WorkItem, WorkItemDraft, WorkItemId, WorkItemLink, WorkItemType};
use reqwest::{header, Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Most ids the batch endpoint accepts per call
pub const MAX_BATCH_IDS: usize = 200;

/// API version of the extension-management document endpoints
pub const EXTENSION_DATA_API_VERSION: &str = "7.1-preview.1";

const JSON_PATCH: &str = "application/json-patch+json";

/// REST client for one organisation and project.
#[derive(Debug, Clone)]
pub struct AzureDevOpsClient {
    http: Client,
    config: ConnectionConfig,
    token: String,
}

/// `{ "count": n, "value": [...] }` list envelope
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WiqlResponse {
    #[serde(default)]
    work_item_relations: Vec<WorkItemLink>,
}

impl AzureDevOpsClient {
    /// Create a client.
    ///
    /// # Errors
    /// [`GatewayError::Config`] without a token or with a malformed base URL.
    pub fn new(config: ConnectionConfig) -> Result<Self, GatewayError> {
        let token = config.token()?.to_string();
        Url::parse(&config.work_item_base())
            .map_err(|e| GatewayError::Config(format!("work item base URL: {e}")))?;
        Url::parse(&config.extension_data_base())
            .map_err(|e| GatewayError::Config(format!("extension data base URL: {e}")))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            token,
        })
    }

    /// Connection settings in use
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// REST resource URL of a work item
    #[must_use]
    pub fn resource_url(&self, id: WorkItemId) -> String {
        format!(
            "{}/_apis/wit/workItems/{id}",
            self.config.work_item_base().trim_end_matches('/')
        )
    }

    /// Look up the configured project.
    ///
    /// # Errors
    /// Any transport or status failure.
    #[instrument(skip(self), fields(project = %self.config.project))]
    pub async fn get_project(&self) -> Result<ProjectInfo, GatewayError> {
        let url = self.work_item_url(&["_apis", "projects", &self.config.project], &[])?;
        self.send(self.http.get(url), "project").await
    }

    pub(crate) fn work_item_url(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Url, GatewayError> {
        build_url(
            &self.config.work_item_base(),
            segments,
            query,
            &self.config.api_version,
        )
    }

    pub(crate) fn document_url(
        &self,
        collection: &str,
        id: Option<&str>,
    ) -> Result<Url, GatewayError> {
        let mut segments = vec![
            "_apis",
            "ExtensionManagement",
            "InstalledExtensions",
            self.config.publisher.as_str(),
            self.config.extension_id.as_str(),
            "Data",
            "Scopes",
            "Default",
            "Current",
            "Collections",
            collection,
            "Documents",
        ];
        if let Some(id) = id {
            segments.push(id);
        }
        build_url(
            &self.config.extension_data_base(),
            &segments,
            &[],
            EXTENSION_DATA_API_VERSION,
        )
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Send with auth and decode a JSON body
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, GatewayError> {
        let response = self.send_raw(request, resource).await?;
        response.json::<T>().await.map_err(GatewayError::from)
    }

    /// Send with auth, mapping non-success statuses
    pub(crate) async fn send_raw(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        let response = request
            .basic_auth("", Some(&self.token))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), resource, "request failed");
        Err(GatewayError::from_status(status.as_u16(), body, resource))
    }
}

fn build_url(
    base: &str,
    segments: &[&str],
    query: &[(&str, &str)],
    api_version: &str,
) -> Result<Url, GatewayError> {
    let mut url = Url::parse(base).map_err(|e| GatewayError::Config(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| GatewayError::Config(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
        pairs.append_pair("api-version", api_version);
    }
    Ok(url)
}

#[async_trait]
impl WorkItemGateway for AzureDevOpsClient {
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    async fn create_work_item(
        &self,
        draft: &WorkItemDraft,
        project: &str,
        work_item_type: &str,
    ) -> Result<WorkItem, GatewayError> {
        let type_segment = format!("${work_item_type}");
        let url = self.work_item_url(
            &[project, "_apis", "wit", "workitems", &type_segment],
            &[("$expand", "All")],
        )?;
        let body = serde_json::to_vec(&draft.to_patch_document())
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        let created: WorkItem = self
            .send(
                self.http
                    .post(url)
                    .header(header::CONTENT_TYPE, JSON_PATCH)
                    .body(body),
                "work item",
            )
            .await?;
        debug!(id = created.id, "work item created");
        Ok(created)
    }

    #[instrument(skip(self), fields(count = ids.len()))]
    async fn get_work_items(&self, ids: &[WorkItemId]) -> Result<Vec<WorkItem>, GatewayError> {
        let mut items = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BATCH_IDS) {
            let joined = chunk
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let url = self.work_item_url(
                &["_apis", "wit", "workitems"],
                &[("ids", &joined), ("$expand", "all"), ("errorPolicy", "fail")],
            )?;
            let page: ListResponse<WorkItem> = self.send(self.http.get(url), "work items").await?;
            items.extend(page.value);
        }
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn get_work_item(&self, id: WorkItemId) -> Result<WorkItem, GatewayError> {
        let id_segment = id.to_string();
        let url = self.work_item_url(
            &["_apis", "wit", "workitems", &id_segment],
            &[("$expand", "all")],
        )?;
        self.send(self.http.get(url), &format!("work item {id}")).await
    }

    #[instrument(skip(self), fields(source = query.source, tag = %query.target_tag))]
    async fn query_links(&self, query: &LinkQuery) -> Result<Vec<WorkItemLink>, GatewayError> {
        let url = self.work_item_url(&[&self.config.project, "_apis", "wit", "wiql"], &[])?;
        let body = serde_json::json!({ "query": query.to_wiql() });
        let response: WiqlResponse = self
            .send(self.http.post(url).json(&body), "link query")
            .await?;
        debug!(rows = response.work_item_relations.len(), "link query returned");
        Ok(response.work_item_relations)
    }

    #[instrument(skip(self))]
    async fn get_work_item_types(&self, project: &str) -> Result<Vec<WorkItemType>, GatewayError> {
        let url = self.work_item_url(&[project, "_apis", "wit", "workitemtypes"], &[])?;
        let list: ListResponse<WorkItemType> =
            self.send(self.http.get(url), "work item types").await?;
        Ok(list.value)
    }
}
