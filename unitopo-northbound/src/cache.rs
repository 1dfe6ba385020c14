//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::HashMap;
use std::sync::Arc;

use unitopo_yang::{DataNode, DataPath, UnderlayIdentifier};

//
// Per-pass cache of underlay reads.
//
// Entries are keyed by the exact underlay identifier, datastore included.
// Absence is cached as well, so an identifier is fetched from the transport
// at most once per pass.
//
#[derive(Debug, Default)]
pub struct ReadCache {
    entries: HashMap<UnderlayIdentifier, Option<Arc<DataNode>>>,
}

// ===== impl ReadCache =====

impl ReadCache {
    pub fn new() -> ReadCache {
        ReadCache::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &UnderlayIdentifier) -> bool {
        self.entries.contains_key(id)
    }

    // Returns the cached value for `id`, invoking `fetch` to populate the
    // cache on the first request.
    pub fn get_or_fetch<F, E>(
        &mut self,
        id: &UnderlayIdentifier,
        fetch: F,
    ) -> Result<Option<Arc<DataNode>>, E>
    where
        F: FnOnce() -> Result<Option<DataNode>, E>,
    {
        if let Some(value) = self.entries.get(id) {
            return Ok(value.clone());
        }

        let value = fetch()?.map(Arc::new);
        self.entries.insert(id.clone(), value.clone());
        Ok(value)
    }

    // Updates cached entries after `data` was written wholesale at `id`.
    pub(crate) fn apply_put(
        &mut self,
        id: &UnderlayIdentifier,
        data: &DataNode,
    ) {
        self.update_related(id, |relation, current| match relation {
            Relation::Same => Some(data.clone()),
            Relation::Ancestor(rel) => Some(
                current
                    .cloned()
                    .unwrap_or_default()
                    .replace_at(rel, Some(data)),
            ),
            Relation::Descendant(rel) => data.get(rel).cloned(),
        });
    }

    // Updates cached entries after `data` was merged at `id`.
    pub(crate) fn apply_merge(
        &mut self,
        id: &UnderlayIdentifier,
        data: &DataNode,
    ) {
        self.update_related(id, |relation, current| match relation {
            Relation::Same => Some(match current {
                Some(current) => current.merge(data),
                None => data.clone(),
            }),
            Relation::Ancestor(rel) => {
                Some(current.cloned().unwrap_or_default().merge_at(rel, data))
            }
            Relation::Descendant(rel) => match (current, data.get(rel)) {
                (Some(current), Some(merged)) => Some(current.merge(merged)),
                (None, Some(merged)) => Some(merged.clone()),
                (current, None) => current.cloned(),
            },
        });
    }

    // Updates cached entries after `id` was deleted.
    pub(crate) fn apply_delete(&mut self, id: &UnderlayIdentifier) {
        self.update_related(id, |relation, current| match relation {
            Relation::Same | Relation::Descendant(_) => None,
            Relation::Ancestor(rel) => {
                current.map(|current| current.replace_at(rel, None))
            }
        });
    }

    fn update_related<F>(&mut self, id: &UnderlayIdentifier, update: F)
    where
        F: Fn(Relation<'_>, Option<&DataNode>) -> Option<DataNode>,
    {
        for (cached_id, value) in self.entries.iter_mut() {
            if cached_id.datastore != id.datastore {
                continue;
            }

            let relative;
            let relation = if cached_id.path == id.path {
                Relation::Same
            } else if let Some(rel) = id.path.strip_prefix(&cached_id.path) {
                relative = rel;
                Relation::Ancestor(&relative)
            } else if let Some(rel) = cached_id.path.strip_prefix(&id.path) {
                relative = rel;
                Relation::Descendant(&relative)
            } else {
                continue;
            };

            *value = update(relation, value.as_deref()).map(Arc::new);
        }
    }
}

// Position of a cached entry relative to a mutated identifier.
enum Relation<'a> {
    Same,
    // The cached entry contains the mutated node at the given path.
    Ancestor(&'a DataPath),
    // The cached entry lies below the mutated node at the given path.
    Descendant(&'a DataPath),
}
