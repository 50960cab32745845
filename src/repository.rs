use std::{future::Future, sync::Arc, time::Duration};

use serde_json::Value;

use crate::{
    error::{ApiError, StoreError},
    object_id::ObjectId,
    store::{Document, DocumentStore, Query, ID_FIELD},
    types::{Employee, EmployeeDetails},
};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Employee persistence on top of a shared [`DocumentStore`]. Every store
/// call is bounded by `timeout`.
#[derive(Clone)]
pub struct EmployeeRepository {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl EmployeeRepository {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ApiError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => {
                tracing::error!(operation, error = %source, "store operation failed");
                Err(ApiError::Store { source })
            }
            Err(_) => {
                tracing::error!(operation, timeout = ?self.timeout, "store operation timed out");
                Err(ApiError::Timeout)
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<Employee>, ApiError> {
        let documents = self
            .bounded("find", self.store.find(&Query::all()))
            .await?;

        documents
            .into_iter()
            .map(|doc| from_document(doc).map_err(ApiError::from))
            .collect()
    }

    pub async fn get(&self, id: &ObjectId) -> Result<Employee, ApiError> {
        let document = self
            .bounded("find_one", self.store.find_one(&Query::by_id(id)))
            .await?
            .ok_or(ApiError::NotFound)?;

        Ok(from_document(document)?)
    }

    pub async fn create(&self, details: EmployeeDetails) -> Result<Employee, ApiError> {
        let document = to_document(&details)?;
        let id = self
            .bounded("insert_one", self.store.insert_one(document))
            .await?;

        Ok(Employee { id, details })
    }

    pub async fn update(
        &self,
        id: &ObjectId,
        details: EmployeeDetails,
    ) -> Result<Employee, ApiError> {
        let set = to_document(&details)?;
        let result = self
            .bounded("update_one", self.store.update_one(&Query::by_id(id), set))
            .await?;

        if result.matched_count == 0 {
            return Err(ApiError::NotFound);
        }

        Ok(Employee { id: *id, details })
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<(), ApiError> {
        let result = self
            .bounded("delete_one", self.store.delete_one(&Query::by_id(id)))
            .await?;

        if result.deleted_count == 0 {
            return Err(ApiError::NotFound);
        }

        Ok(())
    }
}

fn to_document(details: &EmployeeDetails) -> Result<Document, StoreError> {
    match serde_json::to_value(details)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::MalformedDocument("employee is not an object")),
    }
}

fn from_document(mut document: Document) -> Result<Employee, StoreError> {
    let id = document
        .remove(ID_FIELD)
        .and_then(|v| v.as_str().and_then(|s| ObjectId::parse_str(s).ok()))
        .ok_or(StoreError::MalformedDocument("missing or invalid _id"))?;

    let details = serde_json::from_value(Value::Object(document))?;

    Ok(Employee { id, details })
}
