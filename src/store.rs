use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::{error::StoreError, object_id::ObjectId};

/// A stored record: a JSON object whose `_id` field holds its [`ObjectId`].
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

/// A conjunction of field-equality conditions. An empty query matches every
/// document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: Vec<(String, Value)>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: &ObjectId) -> Self {
        Self::all().eq(ID_FIELD, id.to_hex())
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| document.get(field) == Some(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Return every document matching `query`, in insertion order.
    async fn find(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Return the first document matching `query`, if any.
    async fn find_one(&self, query: &Query) -> Result<Option<Document>, StoreError>;

    /// Store `document` under a freshly assigned id and return that id. Any
    /// `_id` already present in `document` is replaced.
    async fn insert_one(&self, document: Document) -> Result<ObjectId, StoreError>;

    /// Overwrite the fields in `set` on the first document matching `query`.
    /// The document id is never changed.
    async fn update_one(&self, query: &Query, set: Document) -> Result<UpdateResult, StoreError>;

    /// Remove the first document matching `query`.
    async fn delete_one(&self, query: &Query) -> Result<DeleteResult, StoreError>;
}

/// Process-local [`DocumentStore`]. Documents are keyed by a per-store
/// insertion sequence, so listing order never depends on id ordering.
pub struct MemoryStore {
    documents: RwLock<Documents>,
    next_id: fn() -> ObjectId,
}

#[derive(Default)]
struct Documents {
    next_seq: u64,
    by_seq: BTreeMap<u64, Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_id_source(ObjectId::new)
    }

    /// Use `next_id` to mint the ids of inserted documents.
    pub fn with_id_source(next_id: fn() -> ObjectId) -> Self {
        Self {
            documents: RwLock::new(Documents::default()),
            next_id,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let documents = self.documents.read().await;

        Ok(documents
            .by_seq
            .values()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect())
    }

    async fn find_one(&self, query: &Query) -> Result<Option<Document>, StoreError> {
        let documents = self.documents.read().await;

        Ok(documents.by_seq.values().find(|doc| query.matches(doc)).cloned())
    }

    async fn insert_one(&self, mut document: Document) -> Result<ObjectId, StoreError> {
        let id = (self.next_id)();
        document.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));

        let mut documents = self.documents.write().await;
        let seq = documents.next_seq;
        documents.next_seq += 1;
        documents.by_seq.insert(seq, document);

        Ok(id)
    }

    async fn update_one(&self, query: &Query, set: Document) -> Result<UpdateResult, StoreError> {
        let mut documents = self.documents.write().await;

        let Some(document) = documents.by_seq.values_mut().find(|doc| query.matches(doc)) else {
            return Ok(UpdateResult { matched_count: 0 });
        };

        for (field, value) in set {
            if field != ID_FIELD {
                document.insert(field, value);
            }
        }

        Ok(UpdateResult { matched_count: 1 })
    }

    async fn delete_one(&self, query: &Query) -> Result<DeleteResult, StoreError> {
        let mut documents = self.documents.write().await;

        let seq = documents
            .by_seq
            .iter()
            .find(|(_, doc)| query.matches(doc))
            .map(|(seq, _)| *seq);

        let deleted_count = match seq {
            Some(seq) => documents.by_seq.remove(&seq).map_or(0, |_| 1),
            None => 0,
        };

        Ok(DeleteResult { deleted_count })
    }
}
