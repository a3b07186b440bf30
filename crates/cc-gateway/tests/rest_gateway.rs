//! REST gateway against a local HTTP double

use cc_gateway::{
    AzureDevOpsClient, ConnectionConfig, ExtensionDataService, GatewayError, WorkItemGateway,
};
use cc_model::{LinkQuery, WorkItemDraft};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EXT_DOCS: &str = "/_apis/ExtensionManagement/InstalledExtensions/contoso-tools/continuous-conformance/Data/Scopes/Default/Current/Collections/project-guid/Documents";

async fn setup() -> (MockServer, AzureDevOpsClient) {
    let server = MockServer::start().await;
    let config = ConnectionConfig::new("contoso", "Fabrikam", "contoso-tools")
        .with_token("pat")
        .with_base_url(server.uri());
    let client = AzureDevOpsClient::new(config).unwrap();
    (server, client)
}

#[tokio::test]
async fn create_posts_json_patch_with_basic_auth() {
    let (server, client) = setup().await;
    let parent_url = client.resource_url(42);

    Mock::given(method("POST"))
        .and(path("/Fabrikam/_apis/wit/workitems/$Task"))
        .and(header("content-type", "application/json-patch+json"))
        .and(header("authorization", "Basic OnBhdA=="))
        .and(body_json(json!([
            {"op": "add", "path": "/fields/System.Title", "value": "Data Privacy"},
            {"op": "add", "path": "/relations/-", "value": {
                "rel": "System.LinkTypes.Hierarchy-Reverse",
                "url": parent_url
            }},
            {"op": "add", "path": "/fields/System.Tags", "value": "Conformance;Data Privacy"}
        ])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 101,
            "rev": 1,
            "fields": {"System.Title": "Data Privacy", "System.Tags": "Conformance; Data Privacy"},
            "relations": [{"rel": "System.LinkTypes.Hierarchy-Reverse", "url": parent_url}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let draft = WorkItemDraft::new("Data Privacy", "Conformance;Data Privacy", parent_url.clone());
    let created = client.create_work_item(&draft, "Fabrikam", "Task").await.unwrap();
    assert_eq!(created.id, 101);
    assert_eq!(created.relations.len(), 1);
}

#[tokio::test]
async fn batch_fetch_uses_full_expansion_and_fail_policy() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/_apis/wit/workitems"))
        .and(query_param("ids", "7,8"))
        .and(query_param("$expand", "all"))
        .and(query_param("errorPolicy", "fail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "value": [
                {"id": 7, "fields": {"System.Title": "a"}},
                {"id": 8, "fields": {"System.Title": "b"}}
            ]
        })))
        .mount(&server)
        .await;

    let items = client.get_work_items(&[7, 8]).await.unwrap();
    assert_eq!(items.iter().map(|w| w.id).collect::<Vec<_>>(), vec![7, 8]);
}

#[tokio::test]
async fn batch_fetch_with_missing_id_fails() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/_apis/wit/workitems"))
        .respond_with(ResponseTemplate::new(404).set_body_string("TF401232"))
        .mount(&server)
        .await;

    let err = client.get_work_items(&[7, 999]).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn empty_batch_makes_no_request() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    assert!(client.get_work_items(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn link_query_sends_wiql_and_keeps_row_order() {
    let (server, client) = setup().await;
    let query = LinkQuery::aggregator(42, "Conformance");

    Mock::given(method("POST"))
        .and(path("/Fabrikam/_apis/wit/wiql"))
        .and(body_json(json!({"query": query.to_wiql()})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "queryType": "oneHop",
            "workItemRelations": [
                {"rel": null, "source": null, "target": {"id": 42}},
                {"rel": "System.LinkTypes.Hierarchy-Forward", "source": {"id": 42}, "target": {"id": 100}},
                {"rel": "System.LinkTypes.Related", "source": {"id": 42}, "target": {"id": 200}}
            ]
        })))
        .mount(&server)
        .await;

    let rows = client.query_links(&query).await.unwrap();
    let targets: Vec<_> = rows.iter().map(|r| r.target_id()).collect();
    assert_eq!(targets, vec![Some(42), Some(100), Some(200)]);
}

#[tokio::test]
async fn work_item_types_listed() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/Fabrikam/_apis/wit/workitemtypes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "value": [
                {"name": "Task", "referenceName": "Microsoft.VSTS.WorkItemTypes.Task"},
                {"name": "User Story"}
            ]
        })))
        .mount(&server)
        .await;

    let types = client.get_work_item_types("Fabrikam").await.unwrap();
    assert_eq!(types[1].name, "User Story");
}

#[tokio::test]
async fn unauthorized_is_reported() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.get_work_item(1).await.unwrap_err();
    assert_eq!(err, GatewayError::Unauthorized(401));
}

#[tokio::test]
async fn missing_document_reads_as_none() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path(format!("{EXT_DOCS}/settings")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert_eq!(client.get_document("project-guid", "settings").await.unwrap(), None);
}

#[tokio::test]
async fn set_and_delete_document() {
    let (server, client) = setup().await;
    let doc = json!({"id": "settings", "__etag": "-1", "conformanceTag": "Conformance"});

    Mock::given(method("PUT"))
        .and(path(EXT_DOCS))
        .and(query_param("api-version", "7.1-preview.1"))
        .and(body_json(doc.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "settings", "__etag": 3, "conformanceTag": "Conformance"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{EXT_DOCS}/settings")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let stored = client.set_document("project-guid", doc).await.unwrap();
    assert_eq!(stored["__etag"], json!(3));
    client.delete_document("project-guid", "settings").await.unwrap();
}

#[tokio::test]
async fn deleting_missing_document_is_not_found() {
    let (server, client) = setup().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.delete_document("project-guid", "settings").await.unwrap_err();
    assert!(err.is_not_found());
}
