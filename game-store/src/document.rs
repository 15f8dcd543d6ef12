use async_trait::async_trait;
use game_types::Timestamp;
use serde_json::Value;

use crate::error::StoreError;
use crate::subscription::Subscription;

/// Path of a document collection, e.g. `sessions` or
/// `sessions/<id>/solved_words`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        CollectionPath(path.into())
    }

    pub fn doc(&self, id: impl Into<String>) -> DocPath {
        DocPath {
            collection: self.clone(),
            id: id.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Path of a single document within a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    collection: CollectionPath,
    id: String,
}

impl DocPath {
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Handle passed to a transaction body.
///
/// Reads observe a consistent snapshot taken when the attempt began and are
/// recorded for conflict validation; writes are staged and applied atomically
/// at commit. Stage writes only after all reads are done.
pub trait Transaction {
    /// Reads a document from the snapshot.
    fn get(&mut self, path: &DocPath) -> Option<Value>;

    /// Stages a full-document write.
    fn set(&mut self, path: DocPath, value: Value);

    /// Server timestamp for this attempt, strictly increasing across
    /// attempts within one store.
    fn timestamp(&self) -> Timestamp;
}

/// A transactional document store with change notifications.
///
/// `run_transaction` is optimistic read-modify-write: the body runs against a
/// snapshot, and if a conflicting commit lands before this one, the body is
/// re-run from scratch against fresh state. Bodies must therefore be free of
/// side effects outside the transaction handle. A body that stages no writes
/// commits nothing and never conflicts.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    async fn run_transaction<R, F>(&self, body: F) -> Result<R, StoreError>
    where
        R: Send,
        F: FnMut(&mut dyn Transaction) -> R + Send;

    /// Watches a single document. Snapshots are `None` while the document
    /// does not exist.
    async fn watch_document(&self, path: &DocPath) -> Subscription<Option<Value>>;

    /// Watches a whole collection, delivering full `(doc id, value)`
    /// snapshots. Rapid successive commits may coalesce.
    async fn watch_collection(&self, path: &CollectionPath) -> Subscription<Vec<(String, Value)>>;
}
