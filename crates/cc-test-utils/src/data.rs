//! In-memory extension data service

use async_trait::async_trait;
use cc_gateway::{ExtensionDataService, GatewayError};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Document store keyed by `(collection, id)` with numeric etags.
///
/// Writes with `__etag = "-1"` overwrite unconditionally; any other etag
/// must match the stored one.
#[derive(Debug, Default)]
pub struct InMemoryDataService {
    documents: Mutex<HashMap<(String, String), Value>>,
    next_etag: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

impl InMemoryDataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Value> {
        self.documents
            .lock()
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    /// Store a document as-is, bypassing etag checks
    pub fn seed(&self, collection: &str, document: Value) {
        let id = document["id"].as_str().unwrap_or_default().to_string();
        self.documents
            .lock()
            .insert((collection.to_string(), id), document);
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock() = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }
}

fn etag_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl ExtensionDataService for InMemoryDataService {
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, GatewayError> {
        if *self.fail_reads.lock() {
            return Err(GatewayError::Transport("injected read failure".into()));
        }
        Ok(self.document(collection, id))
    }

    async fn set_document(&self, collection: &str, document: Value) -> Result<Value, GatewayError> {
        if *self.fail_writes.lock() {
            return Err(GatewayError::Status {
                status: 500,
                body: "injected write failure".into(),
            });
        }
        let Value::Object(mut fields) = document else {
            return Err(GatewayError::Status {
                status: 400,
                body: "document must be an object".into(),
            });
        };
        let id = fields
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Status {
                status: 400,
                body: "document id missing".into(),
            })?;

        let key = (collection.to_string(), id);
        let mut documents = self.documents.lock();
        let sent = fields.get("__etag").and_then(etag_text);
        let stored = documents
            .get(&key)
            .and_then(|doc| doc.get("__etag"))
            .and_then(etag_text);
        if sent.as_deref() != Some("-1") && documents.contains_key(&key) && sent != stored {
            return Err(GatewayError::Status {
                status: 409,
                body: "etag mismatch".into(),
            });
        }

        let etag = self.next_etag.fetch_add(1, Ordering::SeqCst) + 1;
        fields.insert("__etag".into(), Value::from(etag));
        let stored = Value::Object(fields);
        documents.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), GatewayError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .remove(&(collection.to_string(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(format!("document {id}")))
    }
}
