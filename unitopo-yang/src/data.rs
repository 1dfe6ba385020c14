//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::fmt;

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::path::{DataPath, ListKey, Segment};

// Scalar value held by a leaf.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(untagged)]
pub enum LeafValue {
    Bool(bool),
    Uint(u64),
    Int(i64),
    String(String),
}

// Child item of a data node.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[derive(EnumAsInner)]
#[serde(untagged)]
pub enum Item {
    Leaf(LeafValue),
    Container(DataNode),
    List(Vec<ListEntry>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct ListEntry {
    pub key: ListKey,
    pub data: DataNode,
}

//
// Data node.
//
// Immutable value of a container or list entry. All operations that change
// the contents consume or borrow the node and return a new value, so a node
// handed to a handler can never be altered behind its back.
//
// List entries keep their insertion order, which for trees built from vendor
// data is the vendor iteration order.
//
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(transparent)]
pub struct DataNode {
    items: BTreeMap<String, Item>,
}

// ===== impl LeafValue =====

impl LeafValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LeafValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            LeafValue::Uint(value) => Some(*value),
            LeafValue::Int(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            LeafValue::Int(value) => Some(*value),
            LeafValue::Uint(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LeafValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for LeafValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafValue::Bool(value) => write!(f, "{value}"),
            LeafValue::Uint(value) => write!(f, "{value}"),
            LeafValue::Int(value) => write!(f, "{value}"),
            LeafValue::String(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for LeafValue {
    fn from(value: bool) -> LeafValue {
        LeafValue::Bool(value)
    }
}

impl From<u8> for LeafValue {
    fn from(value: u8) -> LeafValue {
        LeafValue::Uint(value.into())
    }
}

impl From<u16> for LeafValue {
    fn from(value: u16) -> LeafValue {
        LeafValue::Uint(value.into())
    }
}

impl From<u32> for LeafValue {
    fn from(value: u32) -> LeafValue {
        LeafValue::Uint(value.into())
    }
}

impl From<u64> for LeafValue {
    fn from(value: u64) -> LeafValue {
        LeafValue::Uint(value)
    }
}

impl From<i32> for LeafValue {
    fn from(value: i32) -> LeafValue {
        LeafValue::Int(value.into())
    }
}

impl From<i64> for LeafValue {
    fn from(value: i64) -> LeafValue {
        LeafValue::Int(value)
    }
}

impl From<&str> for LeafValue {
    fn from(value: &str) -> LeafValue {
        LeafValue::String(value.to_owned())
    }
}

impl From<String> for LeafValue {
    fn from(value: String) -> LeafValue {
        LeafValue::String(value)
    }
}

// ===== impl ListEntry =====

impl ListEntry {
    pub fn new(key: ListKey, data: DataNode) -> ListEntry {
        ListEntry { key, data }
    }
}

// ===== impl DataNode =====

impl DataNode {
    pub fn new() -> DataNode {
        DataNode::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, &Item)> {
        self.items.iter().map(|(name, item)| (name.as_str(), item))
    }

    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn leaf(&self, name: &str) -> Option<&LeafValue> {
        self.items.get(name).and_then(Item::as_leaf)
    }

    pub fn container(&self, name: &str) -> Option<&DataNode> {
        self.items.get(name).and_then(Item::as_container)
    }

    pub fn list(&self, name: &str) -> Option<&[ListEntry]> {
        self.items.get(name).and_then(Item::as_list).map(Vec::as_slice)
    }

    pub fn entry(&self, name: &str, key: &ListKey) -> Option<&DataNode> {
        self.list(name)?
            .iter()
            .find(|entry| entry.key == *key)
            .map(|entry| &entry.data)
    }

    // Returns a copy containing only the leaves of this node.
    pub fn leaves_only(&self) -> DataNode {
        DataNode {
            items: self
                .items
                .iter()
                .filter(|(_, item)| matches!(item, Item::Leaf(_)))
                .map(|(name, item)| (name.clone(), item.clone()))
                .collect(),
        }
    }

    #[must_use]
    pub fn with_item(mut self, name: &str, item: Item) -> DataNode {
        self.items.insert(name.to_owned(), item);
        self
    }

    #[must_use]
    pub fn with_leaf(
        self,
        name: &str,
        value: impl Into<LeafValue>,
    ) -> DataNode {
        self.with_item(name, Item::Leaf(value.into()))
    }

    #[must_use]
    pub fn with_container(self, name: &str, node: DataNode) -> DataNode {
        self.with_item(name, Item::Container(node))
    }

    // Inserts or replaces a list entry. New entries are appended.
    #[must_use]
    pub fn with_entry(
        mut self,
        name: &str,
        key: impl Into<ListKey>,
        node: DataNode,
    ) -> DataNode {
        let key = key.into();
        let item = self
            .items
            .entry(name.to_owned())
            .or_insert_with(|| Item::List(vec![]));
        if !matches!(item, Item::List(_)) {
            *item = Item::List(vec![]);
        }
        if let Item::List(entries) = item {
            match entries.iter_mut().find(|entry| entry.key == key) {
                Some(entry) => entry.data = node,
                None => entries.push(ListEntry::new(key, node)),
            }
        }
        self
    }

    #[must_use]
    pub fn without(mut self, name: &str) -> DataNode {
        self.items.remove(name);
        self
    }

    // Structural merge: items of `other` override items of `self`, while
    // items absent from `other` are preserved. Containers merge recursively
    // and list entries merge by key.
    #[must_use]
    pub fn merge(&self, other: &DataNode) -> DataNode {
        let mut merged = self.clone();
        for (name, item) in &other.items {
            let item = match (merged.items.remove(name), item) {
                (Some(Item::Container(old)), Item::Container(new)) => {
                    Item::Container(old.merge(new))
                }
                (Some(Item::List(mut old)), Item::List(new)) => {
                    for entry in new {
                        match old.iter_mut().find(|old| old.key == entry.key) {
                            Some(old) => old.data = old.data.merge(&entry.data),
                            None => old.push(entry.clone()),
                        }
                    }
                    Item::List(old)
                }
                (_, item) => item.clone(),
            };
            merged.items.insert(name.clone(), item);
        }
        merged
    }

    // Looks up the node addressed by a path relative to this node.
    pub fn get(&self, relative: &DataPath) -> Option<&DataNode> {
        relative
            .segments()
            .iter()
            .try_fold(self, |node, segment| match &segment.key {
                Some(key) => node.entry(&segment.name, key),
                None => node.container(&segment.name),
            })
    }

    // Returns a new tree where the node addressed by `relative` is replaced
    // by `value`, or removed when `value` is `None`. Missing intermediate
    // nodes are created on insertion.
    #[must_use]
    pub fn replace_at(
        &self,
        relative: &DataPath,
        value: Option<&DataNode>,
    ) -> DataNode {
        let mut node = self.clone();
        node.set_at(relative.segments(), value.cloned());
        node
    }

    // Returns a new tree where `value` is merged into the node addressed by
    // `relative`, creating it when missing.
    #[must_use]
    pub fn merge_at(&self, relative: &DataPath, value: &DataNode) -> DataNode {
        let merged = match self.get(relative) {
            Some(current) => current.merge(value),
            None => value.clone(),
        };
        self.replace_at(relative, Some(&merged))
    }

    fn set_at(&mut self, segments: &[Segment], value: Option<DataNode>) {
        let Some((segment, rest)) = segments.split_first() else {
            *self = value.unwrap_or_default();
            return;
        };

        match &segment.key {
            Some(key) => {
                if value.is_none()
                    && !matches!(
                        self.items.get(&segment.name),
                        Some(Item::List(_))
                    )
                {
                    return;
                }
                let item = self
                    .items
                    .entry(segment.name.clone())
                    .or_insert_with(|| Item::List(vec![]));
                if !matches!(item, Item::List(_)) {
                    *item = Item::List(vec![]);
                }
                let Item::List(entries) = item else {
                    return;
                };
                match entries.iter().position(|entry| entry.key == *key) {
                    Some(pos) if rest.is_empty() && value.is_none() => {
                        entries.remove(pos);
                    }
                    Some(pos) => entries[pos].data.set_at(rest, value),
                    None => {
                        if let Some(value) = value {
                            let mut child = DataNode::default();
                            child.set_at(rest, Some(value));
                            entries.push(ListEntry::new(key.clone(), child));
                        }
                    }
                }
                // Lists without entries don't exist in instance data.
                if entries.is_empty() {
                    self.items.remove(&segment.name);
                }
            }
            None => {
                if rest.is_empty() {
                    match value {
                        Some(value) => {
                            self.items.insert(
                                segment.name.clone(),
                                Item::Container(value),
                            );
                        }
                        None => {
                            self.items.remove(&segment.name);
                        }
                    }
                    return;
                }
                match self.items.get_mut(&segment.name) {
                    Some(Item::Container(child)) => child.set_at(rest, value),
                    _ => {
                        if let Some(value) = value {
                            let mut child = DataNode::default();
                            child.set_at(rest, Some(value));
                            self.items.insert(
                                segment.name.clone(),
                                Item::Container(child),
                            );
                        }
                    }
                }
            }
        }
    }
}

impl FromIterator<(String, Item)> for DataNode {
    fn from_iter<I: IntoIterator<Item = (String, Item)>>(iter: I) -> DataNode {
        DataNode {
            items: iter.into_iter().collect(),
        }
    }
}
