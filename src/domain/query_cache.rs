//! In-memory cache of list views, keyed the same way the screens key their queries.
//!
//! Fetches are tagged with an epoch. Starting a newer fetch or cancelling the key makes older
//! results stale, and stale results are dropped when they arrive instead of overwriting newer data.
//! In-flight HTTP requests themselves are never aborted.

use crate::domain::DrivenPortError;
use crate::domain::view::{ListView, ViewItem};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::future::Future;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Identifies one cached query, e.g. `tasks/board//20/2025/6/desc`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(resource: &str) -> Self {
        QueryKey(vec![resource.to_owned()])
    }

    pub fn with(mut self, part: impl ToString) -> Self {
        self.0.push(part.to_string());
        self
    }

    /// Adds an optional part, using an empty segment when absent so keys stay positional
    pub fn with_opt(self, part: Option<impl ToString>) -> Self {
        match part {
            Some(value) => self.with(value),
            None => self.with(""),
        }
    }

    pub fn resource(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Ticket handed out when a fetch starts. Only the newest ticket for a key may store its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchEpoch(u64);

struct Entry<T> {
    epoch: u64,
    view: Option<ListView<T>>,
}

pub struct QueryCache<T> {
    entries: RwLock<HashMap<QueryKey, Entry<T>>>,
}

impl<T: ViewItem> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ViewItem> QueryCache<T> {
    pub fn new() -> Self {
        QueryCache {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The cached view for a key, if one has been fetched and not invalidated
    pub fn get(&self, key: &QueryKey) -> Option<ListView<T>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).and_then(|entry| entry.view.clone())
    }

    pub fn begin_fetch(&self, key: &QueryKey) -> FetchEpoch {
        FetchEpoch(self.bump(key))
    }

    /// Stores a fetched view unless a newer fetch or a cancel happened since [epoch] was handed out.
    /// Returns whether the view was stored.
    pub fn finish_fetch(&self, key: &QueryKey, epoch: FetchEpoch, view: ListView<T>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key.clone()).or_insert(Entry {
            epoch: 0,
            view: None,
        });
        if entry.epoch != epoch.0 {
            debug!("Dropping superseded result for {key}");
            return false;
        }

        entry.view = Some(view);
        true
    }

    /// Makes results of fetches already in flight for this key stale
    pub fn cancel(&self, key: &QueryKey) {
        self.bump(key);
    }

    /// Applies an optimistic edit to the cached view. Returns [None] if nothing is cached for the key.
    pub fn optimistic<R>(&self, key: &QueryKey, edit: impl FnOnce(&mut ListView<T>) -> R) -> Option<R> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .get_mut(key)
            .and_then(|entry| entry.view.as_mut())
            .map(edit)
    }

    /// Throws away the cached view so the next read has to go to the server
    pub fn invalidate(&self, key: &QueryKey) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(key) {
            entry.epoch += 1;
            entry.view = None;
        }
    }

    /// Invalidates every key for a resource (e.g. all expense pages)
    pub fn invalidate_resource(&self, resource: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for (_, entry) in entries.iter_mut().filter(|(key, _)| key.resource() == resource) {
            entry.epoch += 1;
            entry.view = None;
        }
    }

    fn bump(&self, key: &QueryKey) -> u64 {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key.clone()).or_insert(Entry {
            epoch: 0,
            view: None,
        });
        entry.epoch += 1;
        entry.epoch
    }

    /// Fetches a view and stores it if nothing newer arrived in the meantime
    pub async fn fetch<Fut>(&self, key: &QueryKey, fetch: Fut) -> Result<ListView<T>, DrivenPortError>
    where
        Fut: Future<Output = Result<ListView<T>, DrivenPortError>>,
    {
        let epoch = self.begin_fetch(key);
        let view = fetch.await?;
        self.finish_fetch(key, epoch, view.clone());

        Ok(view)
    }

    /// Drops the cached view and fetches it again. A failed refetch leaves the key empty.
    pub async fn refetch<Fut>(&self, key: &QueryKey, fetch: Fut)
    where
        Fut: Future<Output = Result<ListView<T>, DrivenPortError>>,
    {
        self.invalidate(key);
        if let Err(err) = self.fetch(key, fetch).await {
            warn!("Refetching {key} failed, it will be loaded on next read: {err}");
        }
    }
}
