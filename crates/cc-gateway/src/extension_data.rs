//! Extension data documents over REST

use crate::error::GatewayError;
use crate::rest::AzureDevOpsClient;
use crate::traits::ExtensionDataService;
use async_trait::async_trait;
use tracing::instrument;

#[async_trait]
impl ExtensionDataService for AzureDevOpsClient {
    #[instrument(skip(self))]
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<serde_json::Value>, GatewayError> {
        let url = self.document_url(collection, Some(id))?;
        match self.send(self.http().get(url), id).await {
            Ok(document) => Ok(Some(document)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, document))]
    async fn set_document(
        &self,
        collection: &str,
        document: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let url = self.document_url(collection, None)?;
        self.send(self.http().put(url).json(&document), "document")
            .await
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), GatewayError> {
        let url = self.document_url(collection, Some(id))?;
        self.send_raw(self.http().delete(url), id).await?;
        Ok(())
    }
}
