//! Fakes shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use letras_core::clock::{Clock, ManualClock};
use letras_core::connectivity::ConnectivityMonitor;
use letras_core::outbox::{HttpMethod, OutboxRequest};
use letras_core::types::{DbId, Timestamp};
use letras_db::{IndexQuery, KeyValueStore, MemoryStore, Partition, RecordKey, StoreError};
use letras_events::EventBus;
use serde_json::{json, Value};

use crate::context::SyncContext;
use crate::credentials::SessionCredentials;
use crate::remote::{ApiRoutes, RemoteApi, RemoteError};

pub(crate) const BASE_URL: &str = "http://api.test";

pub(crate) fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap()
}

pub(crate) fn progress_request(child_id: DbId, progress_id: Option<DbId>) -> OutboxRequest {
    OutboxRequest::new(
        HttpMethod::Post,
        format!("{BASE_URL}/children/{child_id}/progress"),
        json!({"game_name": "Palabras", "points": 10}),
    )
    .for_progress(progress_id)
}

/// Scriptable [`RemoteApi`] that records every call.
#[derive(Default)]
pub(crate) struct FakeRemote {
    fail_status: Option<u16>,
    failing_urls: HashSet<String>,
    documents: Mutex<HashMap<String, Value>>,
    sent: Mutex<Vec<OutboxRequest>>,
    get_calls: AtomicUsize,
}

impl FakeRemote {
    pub(crate) fn accepting() -> Self {
        Self::default()
    }

    pub(crate) fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::default()
        }
    }

    pub(crate) fn failing_urls<'a>(urls: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            failing_urls: urls.into_iter().map(String::from).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn with_document(self, url: impl Into<String>, body: Value) -> Self {
        self.documents.lock().unwrap().insert(url.into(), body);
        self
    }

    pub(crate) fn sent(&self) -> Vec<OutboxRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_urls(&self) -> Vec<String> {
        self.sent().into_iter().map(|r| r.url).collect()
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteApi for FakeRemote {
    async fn send(&self, request: &OutboxRequest) -> Result<(), RemoteError> {
        // Let concurrently running drains interleave.
        tokio::task::yield_now().await;
        self.sent.lock().unwrap().push(request.clone());
        if let Some(status) = self.fail_status {
            return Err(RemoteError::HttpStatus(status));
        }
        if self.failing_urls.contains(&request.url) {
            return Err(RemoteError::HttpStatus(500));
        }
        Ok(())
    }

    async fn get_json(&self, url: &str, _bearer: Option<&str>) -> Result<Value, RemoteError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.fail_status {
            return Err(RemoteError::HttpStatus(status));
        }
        self.documents
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(RemoteError::HttpStatus(404))
    }
}

/// Handles to the concrete fakes behind a [`SyncContext`].
pub(crate) struct Harness {
    pub(crate) ctx: SyncContext,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) remote: Arc<FakeRemote>,
    pub(crate) connectivity: Arc<ConnectivityMonitor>,
    pub(crate) credentials: Arc<SessionCredentials>,
    pub(crate) clock: Arc<ManualClock>,
}

impl Harness {
    pub(crate) fn new(remote: FakeRemote) -> Self {
        Self::with_store(remote, Arc::new(MemoryStore::new()))
    }

    pub(crate) fn with_store(remote: FakeRemote, store: Arc<MemoryStore>) -> Self {
        let remote = Arc::new(remote);
        let connectivity = Arc::new(ConnectivityMonitor::new(true));
        let credentials = Arc::new(SessionCredentials::new(Some("session-token".into())));
        let clock = Arc::new(ManualClock::new(t0()));

        let ctx = SyncContext {
            store: store.clone() as Arc<dyn KeyValueStore>,
            remote: remote.clone(),
            connectivity: connectivity.clone(),
            credentials: credentials.clone(),
            clock: clock.clone() as Arc<dyn Clock>,
            events: Arc::new(EventBus::default()),
            routes: ApiRoutes::new(BASE_URL),
        };

        Self {
            ctx,
            store,
            remote,
            connectivity,
            credentials,
            clock,
        }
    }
}

/// Store whose every operation fails as if the database could not be opened.
pub(crate) struct BrokenStore;

fn unavailable() -> StoreError {
    StoreError::Unavailable("disk I/O error".into())
}

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn open(&self) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn put(&self, _partition: Partition, _value: Value) -> Result<RecordKey, StoreError> {
        Err(unavailable())
    }

    async fn add(&self, _partition: Partition, _value: Value) -> Result<RecordKey, StoreError> {
        Err(unavailable())
    }

    async fn get(&self, _partition: Partition, _key: &RecordKey) -> Result<Option<Value>, StoreError> {
        Err(unavailable())
    }

    async fn get_all(
        &self,
        _partition: Partition,
        _query: Option<&IndexQuery>,
    ) -> Result<Vec<Value>, StoreError> {
        Err(unavailable())
    }

    async fn delete(&self, _partition: Partition, _key: &RecordKey) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn clear(&self, _partition: Partition) -> Result<(), StoreError> {
        Err(unavailable())
    }
}

/// [`MemoryStore`] whose writes to chosen partitions fail.
#[derive(Default)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    failing_put: HashSet<Partition>,
    failing_add: HashSet<Partition>,
}

impl FlakyStore {
    pub(crate) fn failing_put(mut self, partition: Partition) -> Self {
        self.failing_put.insert(partition);
        self
    }

    pub(crate) fn failing_add(mut self, partition: Partition) -> Self {
        self.failing_add.insert(partition);
        self
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn open(&self) -> Result<(), StoreError> {
        self.inner.open().await
    }

    async fn put(&self, partition: Partition, value: Value) -> Result<RecordKey, StoreError> {
        if self.failing_put.contains(&partition) {
            return Err(unavailable());
        }
        self.inner.put(partition, value).await
    }

    async fn add(&self, partition: Partition, value: Value) -> Result<RecordKey, StoreError> {
        if self.failing_add.contains(&partition) {
            return Err(unavailable());
        }
        self.inner.add(partition, value).await
    }

    async fn get(&self, partition: Partition, key: &RecordKey) -> Result<Option<Value>, StoreError> {
        self.inner.get(partition, key).await
    }

    async fn get_all(
        &self,
        partition: Partition,
        query: Option<&IndexQuery>,
    ) -> Result<Vec<Value>, StoreError> {
        self.inner.get_all(partition, query).await
    }

    async fn delete(&self, partition: Partition, key: &RecordKey) -> Result<(), StoreError> {
        self.inner.delete(partition, key).await
    }

    async fn clear(&self, partition: Partition) -> Result<(), StoreError> {
        self.inner.clear(partition).await
    }
}
