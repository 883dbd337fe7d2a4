// store.rs - In-memory cache of server records.
//
// The store never talks to the network. Callers apply a mutation only after
// the backend has confirmed it, so the store is always a copy of server state.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{GameId, GameRecord, ReviewId, ReviewRecord};

/// Anything with a stable server-assigned identifier.
pub trait Identified {
    type Id: PartialEq + Display;

    fn id(&self) -> &Self::Id;
}

impl Identified for GameRecord {
    type Id = GameId;

    fn id(&self) -> &GameId {
        &self.id
    }
}

impl Identified for ReviewRecord {
    type Id = ReviewId;

    fn id(&self) -> &ReviewId {
        &self.id
    }
}

/// Status of the fetch that fills a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum LoadState {
    Loading,
    Ready,
    /// The fetch failed; the UI offers a retry that re-issues it.
    Failed(String),
}

/// Ordered collection, most recent first.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordStore<T> {
    items: Vec<T>,
}

impl<T> Default for RecordStore<T> {
    fn default() -> Self {
        RecordStore { items: Vec::new() }
    }
}

impl<T: Identified> RecordStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Swap in a freshly fetched collection, keeping the server's order.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Prepend a newly created record.
    pub fn add(&mut self, record: T) {
        self.items.insert(0, record);
    }

    /// Replace the record with the same id in place.
    ///
    /// A missing id leaves the store untouched and is reported to the caller,
    /// since it means the cache has drifted from the server.
    pub fn replace(&mut self, record: T) -> Result<(), StoreError> {
        match self.items.iter_mut().find(|item| item.id() == record.id()) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(StoreError::NotFound(record.id().to_string())),
        }
    }

    /// Drop the record with this id. Returns whether anything was removed.
    pub fn remove(&mut self, id: &T::Id) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        self.items.len() != before
    }
}
