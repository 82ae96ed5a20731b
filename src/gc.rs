//! Read-only garbage-collection reconciliation sweep (§11).
//!
//! The ingestion orchestrator writes object-store blobs before committing
//! the vector-store row, and a crash between the two steps leaves an
//! orphaned object-store prefix with no corresponding document. This sweep
//! only reports orphans — it never deletes anything, so an operator can
//! review the report before running the deletion themselves.

use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::objectstore::ObjectStoreAdapter;
use crate::store::VectorStore;

#[derive(Debug, Clone, Serialize)]
pub struct GcReport {
    pub orphaned_object_prefixes: Vec<Uuid>,
    pub total_object_prefixes: usize,
}

pub async fn reconcile(store: &VectorStore, objects: &ObjectStoreAdapter) -> Result<GcReport, CoreError> {
    let object_uuids = objects.list_document_prefixes().await?;

    let mut orphaned = Vec::new();
    for uuid in &object_uuids {
        if store.find_by_uuid(*uuid).await?.is_none() {
            orphaned.push(*uuid);
        }
    }

    Ok(GcReport {
        orphaned_object_prefixes: orphaned,
        total_object_prefixes: object_uuids.len(),
    })
}
