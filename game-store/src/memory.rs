use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use game_types::Timestamp;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::debug;

use crate::document::{CollectionPath, DocPath, DocumentStore, Transaction};
use crate::error::StoreError;
use crate::subscription::Subscription;

const MAX_TX_ATTEMPTS: u32 = 10;

/// In-memory [`DocumentStore`].
///
/// Documents carry a per-document version; a transaction validates every
/// version it read before its writes are applied, and re-runs its body when
/// validation fails. Watch channels hold the latest committed snapshot per
/// watched document or collection, so slow consumers observe coalesced
/// state rather than a backlog.
pub struct MemoryStore {
    state: RwLock<StoreState>,
    watchers: Mutex<Watchers>,
    clock: AtomicI64,
}

#[derive(Default)]
struct StoreState {
    collections: HashMap<String, BTreeMap<String, StoredDoc>>,
}

#[derive(Clone)]
struct StoredDoc {
    value: Value,
    version: u64,
}

#[derive(Default)]
struct Watchers {
    documents: HashMap<DocPath, watch::Sender<Option<Value>>>,
    collections: HashMap<CollectionPath, watch::Sender<Vec<(String, Value)>>>,
}

impl StoreState {
    fn doc(&self, path: &DocPath) -> Option<&StoredDoc> {
        self.collections
            .get(path.collection().as_str())?
            .get(path.id())
    }

    fn collection_snapshot(&self, path: &CollectionPath) -> Vec<(String, Value)> {
        self.collections
            .get(path.as_str())
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (id.clone(), doc.value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn reads_current(&self, reads: &[(DocPath, Option<u64>)]) -> bool {
        reads
            .iter()
            .all(|(path, seen)| self.doc(path).map(|doc| doc.version) == *seen)
    }

    fn apply(&mut self, writes: Vec<(DocPath, Value)>) -> Vec<DocPath> {
        let mut touched = Vec::with_capacity(writes.len());
        for (path, value) in writes {
            let docs = self
                .collections
                .entry(path.collection().as_str().to_string())
                .or_default();
            let version = docs.get(path.id()).map(|doc| doc.version + 1).unwrap_or(1);
            docs.insert(path.id().to_string(), StoredDoc { value, version });
            touched.push(path);
        }
        touched
    }
}

struct MemTransaction<'a> {
    state: &'a StoreState,
    stamp: Timestamp,
    reads: Vec<(DocPath, Option<u64>)>,
    writes: Vec<(DocPath, Value)>,
}

impl Transaction for MemTransaction<'_> {
    fn get(&mut self, path: &DocPath) -> Option<Value> {
        let doc = self.state.doc(path);
        self.reads.push((path.clone(), doc.map(|d| d.version)));
        doc.map(|d| d.value.clone())
    }

    fn set(&mut self, path: DocPath, value: Value) {
        // last staged write for a path wins
        self.writes.retain(|(staged, _)| *staged != path);
        self.writes.push((path, value));
    }

    fn timestamp(&self) -> Timestamp {
        self.stamp
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            state: RwLock::new(StoreState::default()),
            watchers: Mutex::new(Watchers::default()),
            clock: AtomicI64::new(0),
        }
    }

    /// Wall-clock milliseconds, forced strictly increasing per store so that
    /// ledger and chat ordering is total.
    fn next_timestamp(&self) -> Timestamp {
        let now = Utc::now().timestamp_millis();
        let mut last = self.clock.load(Ordering::Acquire);
        loop {
            let next = now.max(last + 1);
            match self
                .clock
                .compare_exchange(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(observed) => last = observed,
            }
        }
    }

    async fn notify(&self, touched: &[DocPath]) {
        let state = self.state.read().await;
        let mut watchers = self.watchers.lock().await;

        for path in touched {
            let gone = match watchers.documents.get(path) {
                Some(sender) => {
                    let snapshot = state.doc(path).map(|doc| doc.value.clone());
                    sender.send(snapshot).is_err()
                }
                None => false,
            };
            if gone {
                watchers.documents.remove(path);
            }
        }

        let collections: HashSet<&CollectionPath> =
            touched.iter().map(|path| path.collection()).collect();
        for collection in collections {
            let gone = match watchers.collections.get(collection) {
                Some(sender) => sender.send(state.collection_snapshot(collection)).is_err(),
                None => false,
            };
            if gone {
                watchers.collections.remove(collection);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn run_transaction<R, F>(&self, mut body: F) -> Result<R, StoreError>
    where
        R: Send,
        F: FnMut(&mut dyn Transaction) -> R + Send,
    {
        for attempt in 1..=MAX_TX_ATTEMPTS {
            let stamp = self.next_timestamp();
            let (result, reads, writes) = {
                let state = self.state.read().await;
                let mut tx = MemTransaction {
                    state: &state,
                    stamp,
                    reads: Vec::new(),
                    writes: Vec::new(),
                };
                let result = body(&mut tx);
                (result, tx.reads, tx.writes)
            };

            // A body that staged nothing has nothing to validate or commit.
            if writes.is_empty() {
                return Ok(result);
            }

            let touched = {
                let mut state = self.state.write().await;
                if !state.reads_current(&reads) {
                    debug!("Optimistic conflict on attempt {}, re-running transaction", attempt);
                    continue;
                }
                state.apply(writes)
            };
            self.notify(&touched).await;
            return Ok(result);
        }

        Err(StoreError::Contention {
            attempts: MAX_TX_ATTEMPTS,
        })
    }

    async fn watch_document(&self, path: &DocPath) -> Subscription<Option<Value>> {
        let state = self.state.read().await;
        let mut watchers = self.watchers.lock().await;
        let sender = watchers
            .documents
            .entry(path.clone())
            .or_insert_with(|| watch::channel(state.doc(path).map(|doc| doc.value.clone())).0);
        Subscription::new(sender.subscribe())
    }

    async fn watch_collection(&self, path: &CollectionPath) -> Subscription<Vec<(String, Value)>> {
        let state = self.state.read().await;
        let mut watchers = self.watchers.lock().await;
        let sender = watchers
            .collections
            .entry(path.clone())
            .or_insert_with(|| watch::channel(state.collection_snapshot(path)).0);
        Subscription::new(sender.subscribe())
    }
}
