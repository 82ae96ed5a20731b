//! Vector-store and object-store health reporting (§11).
//!
//! Reports whether each backing store is reachable, for `GET /health`.
//! Used at startup smoke-checks and by load balancer liveness probes alike.

use serde::Serialize;

use crate::objectstore::ObjectStoreAdapter;
use crate::store::VectorStore;

#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub name: String,
    pub healthy: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub components: Vec<ComponentStatus>,
}

pub async fn check_health(store: &VectorStore, objects: &ObjectStoreAdapter) -> HealthReport {
    let vector_store = match store.list_documents(1, 0).await {
        Ok(_) => ComponentStatus {
            name: "vector_store".to_string(),
            healthy: true,
            notes: None,
        },
        Err(e) => ComponentStatus {
            name: "vector_store".to_string(),
            healthy: false,
            notes: Some(e.to_string()),
        },
    };

    let object_store = match objects.list_document_prefixes().await {
        Ok(_) => ComponentStatus {
            name: "object_store".to_string(),
            healthy: true,
            notes: None,
        },
        Err(e) => ComponentStatus {
            name: "object_store".to_string(),
            healthy: false,
            notes: Some(e.to_string()),
        },
    };

    let healthy = vector_store.healthy && object_store.healthy;

    HealthReport {
        healthy,
        components: vec![vector_store, object_store],
    }
}
