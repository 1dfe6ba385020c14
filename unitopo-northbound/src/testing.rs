//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use unitopo_yang::{DataNode, Datastore, UnderlayIdentifier};

use crate::error::TransportError;
use crate::underlay::{Mutation, Transport};

//
// In-memory vendor transport.
//
// Holds a configuration tree and, optionally, an operational tree. When no
// operational tree is loaded, operational reads are served from the
// configuration tree. Every call is logged, and failures can be injected
// for specific identifiers.
//
#[derive(Debug, Default)]
pub struct MemoryTransport {
    config: Mutex<DataNode>,
    operational: Mutex<Option<DataNode>>,
    calls: Mutex<Vec<TransportCall>>,
    reads: Mutex<HashMap<UnderlayIdentifier, usize>>,
    failures: Mutex<Vec<(TransportOp, UnderlayIdentifier)>>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TransportOp {
    Read,
    Put,
    Merge,
    Delete,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransportCall {
    pub op: TransportOp,
    pub id: UnderlayIdentifier,
}

// ===== impl MemoryTransport =====

impl MemoryTransport {
    pub fn new() -> MemoryTransport {
        MemoryTransport::default()
    }

    #[must_use]
    pub fn with_config(self, tree: DataNode) -> MemoryTransport {
        *self.config.lock().unwrap() = tree;
        self
    }

    #[must_use]
    pub fn with_operational(self, tree: DataNode) -> MemoryTransport {
        *self.operational.lock().unwrap() = Some(tree);
        self
    }

    // Builds a transport from JSON-encoded trees.
    pub fn from_json(
        config: &str,
        operational: Option<&str>,
    ) -> Result<MemoryTransport, serde_json::Error> {
        let mut transport =
            MemoryTransport::new().with_config(serde_json::from_str(config)?);
        if let Some(operational) = operational {
            transport =
                transport.with_operational(serde_json::from_str(operational)?);
        }
        Ok(transport)
    }

    // Builds a transport from JSON fixture files.
    pub fn load(
        config: impl AsRef<Path>,
        operational: Option<&Path>,
    ) -> std::io::Result<MemoryTransport> {
        let config = std::fs::read_to_string(config)?;
        let operational =
            operational.map(std::fs::read_to_string).transpose()?;
        MemoryTransport::from_json(&config, operational.as_deref())
            .map_err(std::io::Error::other)
    }

    // Makes every subsequent `op` on `id` fail.
    pub fn fail_on(&self, op: TransportOp, id: UnderlayIdentifier) {
        self.failures.lock().unwrap().push((op, id));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn config(&self) -> DataNode {
        self.config.lock().unwrap().clone()
    }

    pub fn operational(&self) -> Option<DataNode> {
        self.operational.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    // Mutating calls only, in order.
    pub fn mutations(&self) -> Vec<(Mutation, UnderlayIdentifier)> {
        self.calls()
            .into_iter()
            .filter_map(|call| {
                let mutation = match call.op {
                    TransportOp::Read => return None,
                    TransportOp::Put => Mutation::Put,
                    TransportOp::Merge => Mutation::Merge,
                    TransportOp::Delete => Mutation::Delete,
                };
                Some((mutation, call.id))
            })
            .collect()
    }

    pub fn read_count(&self, id: &UnderlayIdentifier) -> usize {
        self.reads.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.reads.lock().unwrap().values().sum()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
        self.reads.lock().unwrap().clear();
    }

    fn call(
        &self,
        op: TransportOp,
        id: &UnderlayIdentifier,
    ) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(TransportCall { op, id: id.clone() });
        if op == TransportOp::Read {
            *self.reads.lock().unwrap().entry(id.clone()).or_default() += 1;
        }

        let failures = self.failures.lock().unwrap();
        if failures
            .iter()
            .any(|(fail_op, fail_id)| *fail_op == op && fail_id == id)
        {
            return Err(format!("injected {op:?} failure at {id}").into());
        }
        Ok(())
    }

    fn update(
        &self,
        id: &UnderlayIdentifier,
        f: impl FnOnce(&DataNode) -> DataNode,
    ) {
        match id.datastore {
            Datastore::Config => {
                let mut tree = self.config.lock().unwrap();
                *tree = f(&tree);
            }
            Datastore::Operational => {
                let mut tree = self.operational.lock().unwrap();
                let updated = f(tree.as_ref().unwrap_or(&DataNode::new()));
                *tree = Some(updated);
            }
        }
    }
}

impl Transport for MemoryTransport {
    fn read(
        &self,
        id: &UnderlayIdentifier,
    ) -> Result<Option<DataNode>, TransportError> {
        self.call(TransportOp::Read, id)?;

        let config = self.config.lock().unwrap();
        let operational = self.operational.lock().unwrap();
        let tree = match (id.datastore, operational.as_ref()) {
            (Datastore::Operational, Some(operational)) => operational,
            _ => &*config,
        };
        Ok(tree.get(&id.path).cloned())
    }

    fn put(
        &self,
        id: &UnderlayIdentifier,
        data: &DataNode,
    ) -> Result<(), TransportError> {
        self.call(TransportOp::Put, id)?;
        self.update(id, |tree| tree.replace_at(&id.path, Some(data)));
        Ok(())
    }

    fn merge(
        &self,
        id: &UnderlayIdentifier,
        data: &DataNode,
    ) -> Result<(), TransportError> {
        self.call(TransportOp::Merge, id)?;
        self.update(id, |tree| tree.merge_at(&id.path, data));
        Ok(())
    }

    fn delete(&self, id: &UnderlayIdentifier) -> Result<(), TransportError> {
        self.call(TransportOp::Delete, id)?;
        self.update(id, |tree| tree.replace_at(&id.path, None));
        Ok(())
    }
}
