//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use itertools::Itertools;
use unitopo_yang::{ListEntry, ListKey, UnderlayIdentifier};

use crate::error::Error;
use crate::underlay::UnderlayAccess;

//
// List key resolver.
//
// Derives the keys of a normalized list from the entries of a vendor list.
// The vendor container is read once per pass through the read cache; the
// resulting keys follow vendor iteration order unless sorting is requested,
// and duplicates produced by the projection are dropped (first occurrence
// wins).
//
pub struct KeyResolver {
    list: String,
    filter: Option<Box<dyn Fn(&ListEntry) -> bool + Send + Sync>>,
    projection: Option<Box<dyn Fn(&ListEntry) -> ListKey + Send + Sync>>,
    sorted: bool,
}

// ===== impl KeyResolver =====

impl KeyResolver {
    pub fn new(list: &str) -> KeyResolver {
        KeyResolver {
            list: list.to_owned(),
            filter: None,
            projection: None,
            sorted: false,
        }
    }

    // Keeps only the vendor entries accepted by `filter`.
    #[must_use]
    pub fn filter(
        mut self,
        filter: impl Fn(&ListEntry) -> bool + Send + Sync + 'static,
    ) -> KeyResolver {
        self.filter = Some(Box::new(filter));
        self
    }

    // Maps vendor entries to normalized keys. Defaults to the vendor key.
    #[must_use]
    pub fn projection(
        mut self,
        projection: impl Fn(&ListEntry) -> ListKey + Send + Sync + 'static,
    ) -> KeyResolver {
        self.projection = Some(Box::new(projection));
        self
    }

    #[must_use]
    pub fn sorted(mut self) -> KeyResolver {
        self.sorted = true;
        self
    }

    pub fn resolve(
        &self,
        underlay: &UnderlayAccess<'_>,
        parent: &UnderlayIdentifier,
    ) -> Result<Vec<ListKey>, Error> {
        let Some(container) = underlay.read(parent)? else {
            return Ok(vec![]);
        };

        let keys = container
            .list(&self.list)
            .unwrap_or_default()
            .iter()
            .filter(|&entry| {
                self.filter.as_ref().is_none_or(|filter| filter(entry))
            })
            .map(|entry| match &self.projection {
                Some(projection) => projection(entry),
                None => entry.key.clone(),
            })
            .unique();

        if self.sorted {
            Ok(keys.sorted().collect())
        } else {
            Ok(keys.collect())
        }
    }
}

impl std::fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyResolver")
            .field("list", &self.list)
            .field("filter", &self.filter.is_some())
            .field("projection", &self.projection.is_some())
            .field("sorted", &self.sorted)
            .finish()
    }
}
