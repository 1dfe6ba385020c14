//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{HashMap, HashSet};

use derive_new::new;
use serde::{Deserialize, Serialize};
use unitopo_yang::{DataNode, DataPath, Item, SchemaPath, UnderlayIdentifier};

use crate::debug::Debug;
use crate::error::Error;
use crate::registry::{BindingKind, OrderedPlan, WriterSlot};
use crate::underlay::{PassKind, Transport, UnderlayAccess};

//
// Writer capability.
//
// A writer applies changes of the node it is bound to (leaves plus owned
// subtree) to the underlay. Returning `NotHandled` means the writer doesn't
// accept the change; for a single writer that's a validation failure, while
// composite writers move on to the next candidate.
//
pub trait Writer: Send + Sync {
    fn create(
        &self,
        underlay: &UnderlayAccess<'_>,
        path: &DataPath,
        after: &DataNode,
    ) -> Result<WriteOutcome, Error>;

    // By default an update deletes the old data and writes the new one.
    fn update(
        &self,
        underlay: &UnderlayAccess<'_>,
        path: &DataPath,
        before: &DataNode,
        after: &DataNode,
    ) -> Result<WriteOutcome, Error> {
        match self.delete(underlay, path, before)? {
            WriteOutcome::Handled => self.create(underlay, path, after),
            WriteOutcome::NotHandled => Ok(WriteOutcome::NotHandled),
        }
    }

    fn delete(
        &self,
        underlay: &UnderlayAccess<'_>,
        path: &DataPath,
        before: &DataNode,
    ) -> Result<WriteOutcome, Error>;
}

// Writer for nodes whose underlay data is written by another binding.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopWriter;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteOutcome {
    Handled,
    NotHandled,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

// Before and after values of a binding instance's own data.
#[derive(Clone, Debug, Eq, PartialEq, new)]
pub struct ConfigDelta {
    pub before: Option<DataNode>,
    pub after: Option<DataNode>,
}

// Operation the write pass executes for one binding instance.
#[derive(Clone, Debug)]
pub struct Change {
    pub operation: Operation,
    pub binding: SchemaPath,
    pub path: DataPath,
    pub delta: ConfigDelta,
    idx: usize,
}

// Operation successfully applied to the underlay.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppliedOperation {
    pub operation: Operation,
    pub path: DataPath,
    // Name of the composite candidate that handled the operation.
    pub candidate: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackPolicy {
    // Operations applied before a failure are left in place.
    #[default]
    None,
    // Underlay data touched by the pass is restored after a failure.
    Compensate,
}

#[derive(Debug)]
pub enum RollbackOutcome {
    NotAttempted,
    Restored(Vec<UnderlayIdentifier>),
    Failed {
        restored: Vec<UnderlayIdentifier>,
        error: Box<Error>,
    },
}

// Error returned by an aborted write pass.
#[derive(Debug)]
pub struct WriteFailure {
    pub error: Error,
    pub applied: Vec<AppliedOperation>,
    pub rollback: RollbackOutcome,
}

// Binding instances found in a data tree, indexed by binding position.
type Instances<'a> = Vec<Vec<(DataPath, &'a DataNode)>>;

// ===== impl NoopWriter =====

impl Writer for NoopWriter {
    fn create(
        &self,
        _underlay: &UnderlayAccess<'_>,
        _path: &DataPath,
        _after: &DataNode,
    ) -> Result<WriteOutcome, Error> {
        Ok(WriteOutcome::Handled)
    }

    fn update(
        &self,
        _underlay: &UnderlayAccess<'_>,
        _path: &DataPath,
        _before: &DataNode,
        _after: &DataNode,
    ) -> Result<WriteOutcome, Error> {
        Ok(WriteOutcome::Handled)
    }

    fn delete(
        &self,
        _underlay: &UnderlayAccess<'_>,
        _path: &DataPath,
        _before: &DataNode,
    ) -> Result<WriteOutcome, Error> {
        Ok(WriteOutcome::Handled)
    }
}

// ===== impl ConfigDelta =====

impl ConfigDelta {
    // Returns the operation needed to go from `before` to `after`, or `None`
    // when nothing changed.
    pub fn classify(&self) -> Option<Operation> {
        match (&self.before, &self.after) {
            (None, Some(_)) => Some(Operation::Create),
            (Some(_), None) => Some(Operation::Delete),
            (Some(before), Some(after)) if before != after => {
                Some(Operation::Update)
            }
            _ => None,
        }
    }
}

// ===== impl WriteFailure =====

impl std::fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "write pass aborted after {} operation(s): {}",
            self.applied.len(),
            self.error
        )
    }
}

impl std::error::Error for WriteFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

// ===== impl OrderedPlan =====

impl OrderedPlan {
    // Computes the ordered list of operations turning `before` into `after`,
    // without touching the underlay.
    //
    // Deletes come first, in reverse plan order, so children are torn down
    // before their parents. Creates and updates follow in plan order. Within
    // a binding, instances keep their tree order.
    pub fn changes(
        &self,
        before: &DataNode,
        after: &DataNode,
    ) -> Result<Vec<Change>, Error> {
        let before_instances = self.instances(before);
        let after_instances = self.instances(after);

        self.check_unowned(None, &DataPath::root(), Some(before), Some(after))?;

        let mut deletes = vec![vec![]; self.len()];
        let mut writes = vec![];
        for idx in 0..self.len() {
            let before_map = before_instances[idx]
                .iter()
                .map(|(path, node)| (path, *node))
                .collect::<HashMap<_, _>>();
            let after_paths = after_instances[idx]
                .iter()
                .map(|(path, _)| path)
                .collect::<HashSet<_>>();

            for (path, after) in &after_instances[idx] {
                let before = before_map.get(path).copied();
                if let Some(change) =
                    self.instance_change(idx, path, before, Some(*after))?
                {
                    writes.push(change);
                }
            }
            for (path, before) in &before_instances[idx] {
                if after_paths.contains(path) {
                    continue;
                }
                if let Some(change) =
                    self.instance_change(idx, path, Some(*before), None)?
                {
                    deletes[idx].push(change);
                }
            }
        }

        Ok(deletes.into_iter().rev().flatten().chain(writes).collect())
    }

    // Applies the changes turning `before` into `after` to the underlay.
    //
    // The first failure aborts the pass. Depending on the configured
    // rollback policy, the underlay data modified so far is then restored.
    pub fn write_pass(
        &self,
        transport: &dyn Transport,
        before: &DataNode,
        after: &DataNode,
    ) -> Result<Vec<AppliedOperation>, WriteFailure> {
        let changes = self.changes(before, after).map_err(|error| {
            error.log();
            WriteFailure {
                error,
                applied: vec![],
                rollback: RollbackOutcome::NotAttempted,
            }
        })?;

        let underlay = match self.options.rollback {
            RollbackPolicy::None => UnderlayAccess::new(transport),
            RollbackPolicy::Compensate => {
                UnderlayAccess::with_journal(transport)
            }
        };

        let mut applied = vec![];
        for change in &changes {
            match self.apply_change(&underlay, change) {
                Ok(Some(operation)) => applied.push(operation),
                Ok(None) => (),
                Err(error) => {
                    error.log();
                    let rollback = self.rollback(&underlay);
                    underlay.log_summary(PassKind::Write);
                    return Err(WriteFailure {
                        error,
                        applied,
                        rollback,
                    });
                }
            }
        }

        underlay.log_summary(PassKind::Write);
        Ok(applied)
    }

    fn apply_change(
        &self,
        underlay: &UnderlayAccess<'_>,
        change: &Change,
    ) -> Result<Option<AppliedOperation>, Error> {
        let binding = self.get(change.idx);
        let before = change.delta.before.as_ref();
        let after = change.delta.after.as_ref();

        match binding.writer_ref() {
            Some(WriterSlot::Single(writer)) => {
                Debug::WriterInvoked(change.operation, &change.path).log();
                let outcome = invoke_writer(
                    writer.as_ref(),
                    underlay,
                    change.operation,
                    &change.path,
                    before,
                    after,
                )?;
                match outcome {
                    WriteOutcome::Handled => Ok(Some(AppliedOperation {
                        operation: change.operation,
                        path: change.path.clone(),
                        candidate: None,
                    })),
                    WriteOutcome::NotHandled => Err(Error::validation(
                        &change.path,
                        "change not accepted by writer",
                    )),
                }
            }
            Some(WriterSlot::Composite(writer)) => {
                let applied = writer.apply(
                    underlay,
                    change.operation,
                    &change.path,
                    before,
                    after,
                )?;
                Ok(applied.map(|(operation, candidate)| AppliedOperation {
                    operation,
                    path: change.path.clone(),
                    candidate: Some(candidate),
                }))
            }
            None => Err(Error::NoWriter(change.path.clone())),
        }
    }

    fn rollback(&self, underlay: &UnderlayAccess<'_>) -> RollbackOutcome {
        match self.options.rollback {
            RollbackPolicy::None => RollbackOutcome::NotAttempted,
            RollbackPolicy::Compensate => match underlay.rollback() {
                Ok(restored) => RollbackOutcome::Restored(restored),
                Err((restored, error)) => {
                    error.log();
                    RollbackOutcome::Failed {
                        restored,
                        error: Box::new(error),
                    }
                }
            },
        }
    }

    // Computes the change of one binding instance, checking that a writer
    // exists for it.
    fn instance_change(
        &self,
        idx: usize,
        path: &DataPath,
        before: Option<&DataNode>,
        after: Option<&DataNode>,
    ) -> Result<Option<Change>, Error> {
        let binding = self.get(idx);
        self.check_unowned(Some(idx), path, before, after)?;

        // Structural nodes carry no data of their own.
        if binding.is_structural() {
            let before = before.map(DataNode::leaves_only).unwrap_or_default();
            let after = after.map(DataNode::leaves_only).unwrap_or_default();
            if before != after {
                return Err(Error::NoWriter(path.clone()));
            }
            return Ok(None);
        }

        let delta = ConfigDelta::new(
            before.map(|node| self.own_write_data(idx, node)),
            after.map(|node| self.own_write_data(idx, node)),
        );
        let Some(operation) = delta.classify() else {
            return Ok(None);
        };
        if !binding.has_writer() {
            return Err(Error::NoWriter(path.clone()));
        }

        Ok(Some(Change {
            operation,
            binding: binding.path().clone(),
            path: path.clone(),
            delta,
            idx,
        }))
    }

    // Own data of a binding instance: its leaves and owned subtree.
    fn own_write_data(&self, idx: usize, node: &DataNode) -> DataNode {
        let binding = self.get(idx);
        node.items()
            .filter(|(name, item)| {
                matches!(item, Item::Leaf(_)) || binding.owns_child(name)
            })
            .map(|(name, item)| (name.to_owned(), item.clone()))
            .collect()
    }

    // Fails when a changed item below the given binding (or the root) is
    // neither bound nor owned, nor a leaf of a non-root binding.
    fn check_unowned(
        &self,
        idx: Option<usize>,
        path: &DataPath,
        before: Option<&DataNode>,
        after: Option<&DataNode>,
    ) -> Result<(), Error> {
        let names = before
            .into_iter()
            .chain(after)
            .flat_map(|node| node.items().map(|(name, _)| name))
            .collect::<HashSet<_>>();

        for name in names {
            if self.is_bound_child(idx, name) {
                continue;
            }
            if let Some(idx) = idx {
                let binding = self.get(idx);
                let is_leaf = before
                    .into_iter()
                    .chain(after)
                    .filter_map(|node| node.item(name))
                    .any(|item| matches!(item, Item::Leaf(_)));
                if is_leaf || binding.owns_child(name) {
                    continue;
                }
            }

            let before = before.and_then(|node| node.item(name));
            let after = after.and_then(|node| node.item(name));
            if before != after {
                return Err(Error::NoWriter(path.child(name)));
            }
        }

        Ok(())
    }

    // Collects the binding instances present in `tree`, in tree order.
    fn instances<'a>(&self, tree: &'a DataNode) -> Instances<'a> {
        let mut instances = vec![vec![]; self.len()];
        self.collect_instances(None, &DataPath::root(), tree, &mut instances);
        instances
    }

    fn collect_instances<'a>(
        &self,
        parent: Option<usize>,
        path: &DataPath,
        node: &'a DataNode,
        instances: &mut Instances<'a>,
    ) {
        for idx in self.children(parent).iter().copied() {
            let binding = self.get(idx);
            let name = binding.name();
            match binding.kind() {
                BindingKind::Container => {
                    if let Some(child) = node.container(name) {
                        let path = path.child(name);
                        instances[idx].push((path.clone(), child));
                        self.collect_instances(
                            Some(idx),
                            &path,
                            child,
                            instances,
                        );
                    }
                }
                BindingKind::List => {
                    for entry in node.list(name).unwrap_or_default() {
                        let path = path.entry(name, entry.key.clone());
                        instances[idx].push((path.clone(), &entry.data));
                        self.collect_instances(
                            Some(idx),
                            &path,
                            &entry.data,
                            instances,
                        );
                    }
                }
            }
        }
    }
}

// ===== global functions =====

// Dispatches one operation to a writer.
pub(crate) fn invoke_writer(
    writer: &dyn Writer,
    underlay: &UnderlayAccess<'_>,
    operation: Operation,
    path: &DataPath,
    before: Option<&DataNode>,
    after: Option<&DataNode>,
) -> Result<WriteOutcome, Error> {
    let empty = DataNode::new();
    let before = before.unwrap_or(&empty);
    let after = after.unwrap_or(&empty);
    match operation {
        Operation::Create => writer.create(underlay, path, after),
        Operation::Update => writer.update(underlay, path, before, after),
        Operation::Delete => writer.delete(underlay, path, before),
    }
}
