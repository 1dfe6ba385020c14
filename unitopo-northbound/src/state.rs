//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use unitopo_yang::{DataNode, DataPath, Item, ListEntry, ListKey};

use crate::debug::Debug;
use crate::error::Error;
use crate::registry::{BindingKind, OrderedPlan};
use crate::underlay::{PassKind, Transport, UnderlayAccess};

//
// Reader capability.
//
// A reader produces the data of the node it is bound to: the node's leaves
// plus its owned subtree. Children with their own bindings are read by their
// own readers and attached with `merge`.
//
pub trait Reader: Send + Sync {
    // Returns the keys of the list instances below `parent`. Only used for
    // list bindings.
    fn list_keys(
        &self,
        _underlay: &UnderlayAccess<'_>,
        _parent: &DataPath,
    ) -> Result<Vec<ListKey>, Error> {
        Ok(vec![])
    }

    fn read(
        &self,
        underlay: &UnderlayAccess<'_>,
        path: &DataPath,
    ) -> Result<Option<DataNode>, Error>;

    // Attaches the data read by this reader to its parent node.
    fn merge(&self, parent: DataNode, name: &str, child: Item) -> DataNode {
        parent.with_item(name, child)
    }
}

// ===== impl OrderedPlan =====

impl OrderedPlan {
    // Reads the whole normalized tree. Any failure aborts the pass, no
    // partial tree is returned.
    pub fn read_pass(
        &self,
        transport: &dyn Transport,
    ) -> Result<DataNode, Error> {
        let underlay = UnderlayAccess::new(transport);
        let result = self.read_children(
            &underlay,
            None,
            &DataPath::root(),
            DataNode::new(),
        );
        underlay.log_summary(PassKind::Read);
        result.inspect_err(Error::log)
    }

    // Reads the subtree at `path`. List keys present in the path are trusted
    // and not checked against the list readers.
    pub fn read_path(
        &self,
        transport: &dyn Transport,
        path: &DataPath,
    ) -> Result<Option<DataNode>, Error> {
        let Some((idx, instance)) = self.nearest_binding(path) else {
            return Ok(None);
        };

        let underlay = UnderlayAccess::new(transport);
        let binding = self.get(idx);
        let result = match (binding.kind(), instance.last_key()) {
            // Keyless path to a list: return all of its entries.
            (BindingKind::List, None) => {
                let parent = instance.parent().unwrap_or_default();
                self.read_list(&underlay, idx, &parent).map(|entries| {
                    (!entries.is_empty()).then(|| {
                        DataNode::new()
                            .with_item(binding.name(), Item::List(entries))
                    })
                })
            }
            _ => self.read_instance(&underlay, idx, &instance),
        };
        underlay.log_summary(PassKind::Read);

        let node = result.inspect_err(Error::log)?;
        let relative = path.strip_prefix(&instance).unwrap_or_default();
        Ok(node.and_then(|node| node.get(&relative).cloned()))
    }

    // Reads one instance of a binding along with everything below it.
    fn read_instance(
        &self,
        underlay: &UnderlayAccess<'_>,
        idx: usize,
        path: &DataPath,
    ) -> Result<Option<DataNode>, Error> {
        let binding = self.get(idx);

        // Structural nodes and nodes without reader only exist when one of
        // their children does.
        let reader = binding.reader_ref().filter(|_| !binding.is_structural());
        let node = match reader {
            Some(reader) => {
                Debug::ReaderInvoked(path).log();
                match reader.read(underlay, path)? {
                    Some(node) => self.own_read_data(idx, node),
                    None => return Ok(None),
                }
            }
            None => DataNode::new(),
        };

        let node = self.read_children(underlay, Some(idx), path, node)?;
        if reader.is_none() && node.is_empty() {
            return Ok(None);
        }
        Ok(Some(node))
    }

    fn read_children(
        &self,
        underlay: &UnderlayAccess<'_>,
        parent: Option<usize>,
        path: &DataPath,
        mut node: DataNode,
    ) -> Result<DataNode, Error> {
        for child in self.children(parent).iter().copied() {
            let binding = self.get(child);
            let name = binding.name();
            let item = match binding.kind() {
                BindingKind::Container => self
                    .read_instance(underlay, child, &path.child(name))?
                    .map(Item::Container),
                BindingKind::List => {
                    let entries = self.read_list(underlay, child, path)?;
                    (!entries.is_empty()).then_some(Item::List(entries))
                }
            };

            if let Some(item) = item {
                node = match binding.reader_ref() {
                    Some(reader) => reader.merge(node, name, item),
                    None => node.with_item(name, item),
                };
            }
        }

        Ok(node)
    }

    fn read_list(
        &self,
        underlay: &UnderlayAccess<'_>,
        idx: usize,
        parent: &DataPath,
    ) -> Result<Vec<ListEntry>, Error> {
        let binding = self.get(idx);
        let Some(reader) = binding.reader_ref() else {
            return Ok(vec![]);
        };

        let name = binding.name();
        let keys = reader.list_keys(underlay, parent)?;
        Debug::ListKeys(&parent.child(name), keys.len()).log();

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let path = parent.entry(name, key.clone());
            if let Some(node) = self.read_instance(underlay, idx, &path)? {
                entries.push(ListEntry::new(key, node));
            }
        }
        Ok(entries)
    }

    // Drops reader output that belongs to child bindings and, unless
    // configured otherwise, output that no binding accounts for.
    fn own_read_data(&self, idx: usize, node: DataNode) -> DataNode {
        let binding = self.get(idx);
        node.items()
            .filter(|(name, item)| {
                if self.is_bound_child(Some(idx), name) {
                    return false;
                }
                !self.options.strip_unowned
                    || matches!(item, Item::Leaf(_))
                    || binding.owns_child(name)
            })
            .map(|(name, item)| (name.to_owned(), item.clone()))
            .collect()
    }
}
