//! Collection / environment lookups used while a flow runs.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::model::{Collection, Environment, HttpRequest};

/// Read-only access to persisted collections and environments.
///
/// Returned objects are already validated; `None` means not found.
#[async_trait]
pub trait FlowRepository: Send + Sync {
    async fn get_collection(&self, id: &str) -> Option<Collection>;

    async fn get_request_in_collection(
        &self,
        collection_id: &str,
        request_id: &str,
    ) -> Option<HttpRequest> {
        self.get_collection(collection_id)
            .await
            .and_then(|c| c.request(request_id).cloned())
    }

    async fn get_environment(&self, id: &str) -> Option<Environment>;
}

/// Map-backed repository for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    collections: RwLock<HashMap<String, Collection>>,
    environments: RwLock<HashMap<String, Environment>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(self, collection: Collection) -> Self {
        self.insert_collection(collection);
        self
    }

    pub fn with_environment(self, environment: Environment) -> Self {
        self.insert_environment(environment);
        self
    }

    pub fn insert_collection(&self, collection: Collection) {
        self.collections
            .write()
            .insert(collection.id.clone(), collection);
    }

    pub fn insert_environment(&self, environment: Environment) {
        self.environments
            .write()
            .insert(environment.id.clone(), environment);
    }
}

#[async_trait]
impl FlowRepository for InMemoryRepository {
    async fn get_collection(&self, id: &str) -> Option<Collection> {
        self.collections.read().get(id).cloned()
    }

    async fn get_environment(&self, id: &str) -> Option<Environment> {
        self.environments.read().get(id).cloned()
    }
}
