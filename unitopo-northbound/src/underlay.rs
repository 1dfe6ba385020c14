//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use unitopo_yang::{DataNode, DataPath, UnderlayIdentifier};

use crate::cache::ReadCache;
use crate::debug::Debug;
use crate::error::{Error, TransportError};

//
// Vendor transport.
//
// Synchronous access to the device's vendor-specific data tree. Every call is
// one round trip; the engine never retries.
//
pub trait Transport {
    fn read(
        &self,
        id: &UnderlayIdentifier,
    ) -> Result<Option<DataNode>, TransportError>;

    // Replaces the node at `id` wholesale.
    fn put(
        &self,
        id: &UnderlayIdentifier,
        data: &DataNode,
    ) -> Result<(), TransportError>;

    // Merges `data` into the node at `id`, preserving siblings.
    fn merge(
        &self,
        id: &UnderlayIdentifier,
        data: &DataNode,
    ) -> Result<(), TransportError>;

    fn delete(&self, id: &UnderlayIdentifier) -> Result<(), TransportError>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mutation {
    Put,
    Merge,
    Delete,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PassKind {
    Read,
    Write,
}

// Per-pass counters, logged when the pass ends.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PassStats {
    pub transport_reads: usize,
    pub cache_hits: usize,
    pub mutations: usize,
}

//
// Underlay access.
//
// Handle given to handlers for the duration of one pass. Reads always go
// through the pass read cache, and mutations are written through to it so
// later handlers observe the pass's own writes.
//
pub struct UnderlayAccess<'a> {
    transport: &'a dyn Transport,
    cache: RefCell<ReadCache>,
    journal: Option<RefCell<Journal>>,
    stats: Cell<PassStats>,
}

// Before-images of every identifier mutated during the pass, in first
// mutation order.
#[derive(Debug, Default)]
struct Journal {
    entries: Vec<(UnderlayIdentifier, Option<Arc<DataNode>>)>,
}

// ===== impl UnderlayAccess =====

impl<'a> UnderlayAccess<'a> {
    pub fn new(transport: &'a dyn Transport) -> UnderlayAccess<'a> {
        UnderlayAccess {
            transport,
            cache: Default::default(),
            journal: None,
            stats: Default::default(),
        }
    }

    // Returns an access handle that records before-images of mutated
    // identifiers so they can be restored with `rollback`.
    pub fn with_journal(transport: &'a dyn Transport) -> UnderlayAccess<'a> {
        UnderlayAccess {
            journal: Some(Default::default()),
            ..UnderlayAccess::new(transport)
        }
    }

    pub fn read(
        &self,
        id: &UnderlayIdentifier,
    ) -> Result<Option<Arc<DataNode>>, Error> {
        let mut fetched = false;
        let value = self.cache.borrow_mut().get_or_fetch(id, || {
            fetched = true;
            Debug::CacheFetch(id).log();
            self.transport
                .read(id)
                .map_err(|source| Error::UnderlayRead {
                    id: id.clone(),
                    source,
                })
        })?;

        self.update_stats(|stats| {
            if fetched {
                stats.transport_reads += 1;
            } else {
                stats.cache_hits += 1;
            }
        });
        if !fetched {
            Debug::CacheHit(id).log();
        }

        Ok(value)
    }

    // Shorthand for reading from the configuration datastore.
    pub fn read_config(
        &self,
        path: &DataPath,
    ) -> Result<Option<Arc<DataNode>>, Error> {
        self.read(&UnderlayIdentifier::config(path.clone()))
    }

    // Shorthand for reading from the operational datastore.
    pub fn read_operational(
        &self,
        path: &DataPath,
    ) -> Result<Option<Arc<DataNode>>, Error> {
        self.read(&UnderlayIdentifier::operational(path.clone()))
    }

    pub fn put(
        &self,
        id: &UnderlayIdentifier,
        data: &DataNode,
    ) -> Result<(), Error> {
        self.record(id)?;
        Debug::UnderlayMutation(Mutation::Put, id).log();
        self.transport
            .put(id, data)
            .map_err(|source| write_error(id, source))?;
        self.cache.borrow_mut().apply_put(id, data);
        self.update_stats(|stats| stats.mutations += 1);
        Ok(())
    }

    pub fn merge(
        &self,
        id: &UnderlayIdentifier,
        data: &DataNode,
    ) -> Result<(), Error> {
        self.record(id)?;
        Debug::UnderlayMutation(Mutation::Merge, id).log();
        self.transport
            .merge(id, data)
            .map_err(|source| write_error(id, source))?;
        self.cache.borrow_mut().apply_merge(id, data);
        self.update_stats(|stats| stats.mutations += 1);
        Ok(())
    }

    pub fn delete(&self, id: &UnderlayIdentifier) -> Result<(), Error> {
        self.record(id)?;
        Debug::UnderlayMutation(Mutation::Delete, id).log();
        self.transport
            .delete(id)
            .map_err(|source| write_error(id, source))?;
        self.cache.borrow_mut().apply_delete(id);
        self.update_stats(|stats| stats.mutations += 1);
        Ok(())
    }

    pub fn stats(&self) -> PassStats {
        self.stats.get()
    }

    pub(crate) fn log_summary(&self, pass: PassKind) {
        Debug::PassSummary(pass, &self.stats()).log();
    }

    // Restores every journaled identifier to its before-image, most recent
    // first. Returns the identifiers restored before the first failure, if
    // any.
    pub(crate) fn rollback(
        &self,
    ) -> Result<Vec<UnderlayIdentifier>, (Vec<UnderlayIdentifier>, Error)> {
        let Some(journal) = &self.journal else {
            return Ok(vec![]);
        };
        let entries = std::mem::take(&mut journal.borrow_mut().entries);

        let mut restored = vec![];
        for (id, before) in entries.into_iter().rev() {
            Debug::RollbackStep(&id).log();
            let result = match &before {
                Some(data) => self.transport.put(&id, data),
                None => self.transport.delete(&id),
            };
            if let Err(source) = result {
                return Err((restored, write_error(&id, source)));
            }
            let mut cache = self.cache.borrow_mut();
            match &before {
                Some(data) => cache.apply_put(&id, data),
                None => cache.apply_delete(&id),
            }
            restored.push(id);
        }

        Ok(restored)
    }

    // Journals the before-image of `id` the first time the pass mutates it.
    fn record(&self, id: &UnderlayIdentifier) -> Result<(), Error> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        if journal.borrow().entries.iter().any(|(entry, _)| entry == id) {
            return Ok(());
        }

        let before = self.read(id)?;
        journal.borrow_mut().entries.push((id.clone(), before));
        Ok(())
    }

    fn update_stats(&self, update: impl FnOnce(&mut PassStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}

impl std::fmt::Debug for UnderlayAccess<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnderlayAccess")
            .field("cache", &self.cache.borrow().len())
            .field("stats", &self.stats.get())
            .finish()
    }
}

// ===== helper functions =====

fn write_error(id: &UnderlayIdentifier, source: TransportError) -> Error {
    Error::UnderlayWrite {
        id: id.clone(),
        source,
    }
}
