//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use unitopo_yang::{DataPath, SchemaPath, SchemaRegistry};

use crate::composite::{CompositeReader, CompositeWriter};
use crate::config::Config;
use crate::configuration::{RollbackPolicy, Writer};
use crate::error::RegistryError;
use crate::state::Reader;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BindingKind {
    Container,
    List,
}

//
// Handler binding.
//
// Associates a schema path with the handlers responsible for the data at that
// path. A binding owns the leaves of its node plus every path listed in its
// owned subtree; child nodes with their own binding are handled separately.
//
pub struct HandlerBinding {
    path: SchemaPath,
    kind: BindingKind,
    structural: bool,
    reader: Option<Box<dyn Reader>>,
    writer: Option<WriterSlot>,
    owned_subtree: BTreeSet<SchemaPath>,
    order_after: BTreeSet<SchemaPath>,
    order_before: BTreeSet<SchemaPath>,
}

pub(crate) enum WriterSlot {
    Single(Box<dyn Writer>),
    Composite(CompositeWriter),
}

// Collects handler bindings and turns them into an execution plan.
pub struct PathRegistry<'a> {
    schema: &'a SchemaRegistry,
    bindings: Vec<HandlerBinding>,
}

// Engine options carried by a plan.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PlanOptions {
    pub(crate) rollback: RollbackPolicy,
    pub(crate) strip_unowned: bool,
}

//
// Ordered plan.
//
// Immutable result of `PathRegistry::build`. Bindings are stored in
// execution order: every binding comes after its parent and after the
// bindings it was ordered after. The plan can be shared between threads, and
// every pass creates its own underlay access and read cache.
//
pub struct OrderedPlan {
    bindings: Vec<HandlerBinding>,
    index: HashMap<SchemaPath, usize>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    pub(crate) options: PlanOptions,
}

// ===== impl HandlerBinding =====

impl HandlerBinding {
    fn new(path: SchemaPath, kind: BindingKind, structural: bool) -> Self {
        HandlerBinding {
            path,
            kind,
            structural,
            reader: None,
            writer: None,
            owned_subtree: Default::default(),
            order_after: Default::default(),
            order_before: Default::default(),
        }
    }

    pub fn container(path: impl Into<SchemaPath>) -> Self {
        HandlerBinding::new(path.into(), BindingKind::Container, false)
    }

    pub fn list(path: impl Into<SchemaPath>) -> Self {
        HandlerBinding::new(path.into(), BindingKind::List, false)
    }

    // Node that only exists to hold its children. It is never read from nor
    // written to the underlay.
    pub fn structural(path: impl Into<SchemaPath>) -> Self {
        HandlerBinding::new(path.into(), BindingKind::Container, true)
    }

    #[must_use]
    pub fn reader(mut self, reader: impl Reader + 'static) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    #[must_use]
    pub fn writer(mut self, writer: impl Writer + 'static) -> Self {
        self.writer = Some(WriterSlot::Single(Box::new(writer)));
        self
    }

    #[must_use]
    pub fn composite_reader(mut self, reader: CompositeReader) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    #[must_use]
    pub fn composite_writer(mut self, writer: CompositeWriter) -> Self {
        self.writer = Some(WriterSlot::Composite(writer));
        self
    }

    // Marks a descendant path (relative to the binding) as handled by this
    // binding's reader and writer.
    #[must_use]
    pub fn owned_subtree(mut self, path: impl Into<SchemaPath>) -> Self {
        self.owned_subtree.insert(path.into());
        self
    }

    // Creates and updates of this binding run after those of `path`.
    #[must_use]
    pub fn order_after(mut self, path: impl Into<SchemaPath>) -> Self {
        self.order_after.insert(path.into());
        self
    }

    // Creates and updates of this binding run before those of `path`.
    #[must_use]
    pub fn order_before(mut self, path: impl Into<SchemaPath>) -> Self {
        self.order_before.insert(path.into());
        self
    }

    pub fn path(&self) -> &SchemaPath {
        &self.path
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    pub fn is_structural(&self) -> bool {
        self.structural
    }

    pub fn has_reader(&self) -> bool {
        self.reader.is_some()
    }

    pub fn has_writer(&self) -> bool {
        self.writer.is_some()
    }

    pub fn owned_paths(&self) -> impl Iterator<Item = &SchemaPath> {
        self.owned_subtree.iter()
    }

    pub(crate) fn reader_ref(&self) -> Option<&dyn Reader> {
        self.reader.as_deref()
    }

    pub(crate) fn writer_ref(&self) -> Option<&WriterSlot> {
        self.writer.as_ref()
    }

    pub(crate) fn name(&self) -> &str {
        self.path.last().unwrap_or_default()
    }

    // Returns whether the child item `name` belongs to this binding's owned
    // subtree.
    pub(crate) fn owns_child(&self, name: &str) -> bool {
        self.owned_subtree
            .iter()
            .any(|owned| owned.first() == Some(name))
    }

    fn owned_absolute(&self) -> impl Iterator<Item = SchemaPath> + '_ {
        self.owned_subtree.iter().map(|owned| self.path.join(owned))
    }
}

impl std::fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("structural", &self.structural)
            .field("reader", &self.reader.is_some())
            .field("writer", &self.writer.is_some())
            .field("owned_subtree", &self.owned_subtree)
            .field("order_after", &self.order_after)
            .field("order_before", &self.order_before)
            .finish()
    }
}

// ===== impl PathRegistry =====

impl<'a> PathRegistry<'a> {
    pub fn new(schema: &'a SchemaRegistry) -> PathRegistry<'a> {
        PathRegistry {
            schema,
            bindings: vec![],
        }
    }

    pub fn register(&mut self, binding: HandlerBinding) -> &mut Self {
        self.bindings.push(binding);
        self
    }

    pub fn build(self) -> Result<OrderedPlan, RegistryError> {
        self.build_with(&Config::default())
    }

    // Validates the registered bindings and computes their execution order.
    pub fn build_with(
        self,
        config: &Config,
    ) -> Result<OrderedPlan, RegistryError> {
        let options = PlanOptions {
            rollback: config.write.rollback,
            strip_unowned: config.read.strip_unowned,
        };

        self.validate().inspect_err(|error| error.log())?;
        let order = self.sort().inspect_err(|error| error.log())?;

        // Rearrange bindings in execution order.
        let mut slots = self.bindings.into_iter().map(Some).collect::<Vec<_>>();
        let bindings = order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect::<Vec<_>>();

        let index = bindings
            .iter()
            .enumerate()
            .map(|(idx, binding)| (binding.path.clone(), idx))
            .collect::<HashMap<_, _>>();
        let mut children = vec![vec![]; bindings.len()];
        let mut roots = vec![];
        for (idx, binding) in bindings.iter().enumerate() {
            match binding.path.parent().filter(|parent| !parent.is_empty()) {
                Some(parent) => children[index[&parent]].push(idx),
                None => roots.push(idx),
            }
        }

        Ok(OrderedPlan {
            bindings,
            index,
            children,
            roots,
            options,
        })
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let mut paths = HashMap::new();
        for (idx, binding) in self.bindings.iter().enumerate() {
            if paths.insert(&binding.path, idx).is_some() {
                return Err(RegistryError::DuplicateBinding(
                    binding.path.clone(),
                ));
            }
        }

        for binding in &self.bindings {
            let path = &binding.path;

            // The root must be provided by a known schema module.
            if !path.first().is_some_and(|root| self.schema.provides_root(root))
            {
                return Err(RegistryError::UnknownRoot(path.clone()));
            }

            if let Some(parent) = path.parent().filter(|p| !p.is_empty()) {
                if !paths.contains_key(&parent) {
                    return Err(RegistryError::MissingParent(path.clone()));
                }
            }

            let targets =
                binding.order_after.iter().chain(&binding.order_before);
            for target in targets {
                if !paths.contains_key(target) {
                    return Err(RegistryError::UnknownOrderTarget {
                        path: path.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        for owner in &self.bindings {
            for owned in owner.owned_absolute() {
                if let Some(binding) = self
                    .bindings
                    .iter()
                    .find(|binding| binding.path.starts_with(&owned))
                {
                    return Err(RegistryError::OwnedSubtreeConflict {
                        path: binding.path.clone(),
                        owner: owner.path.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    // Topological sort of the bindings (Kahn's algorithm). Edges come from
    // parent/child relationships and explicit ordering constraints. Among
    // the bindings ready at any step, the one registered first wins.
    fn sort(&self) -> Result<Vec<usize>, RegistryError> {
        let count = self.bindings.len();
        let index = self
            .bindings
            .iter()
            .enumerate()
            .map(|(idx, binding)| (&binding.path, idx))
            .collect::<HashMap<_, _>>();

        let mut edges = BTreeSet::new();
        for (idx, binding) in self.bindings.iter().enumerate() {
            if let Some(parent) =
                binding.path.parent().and_then(|parent| index.get(&parent))
            {
                edges.insert((*parent, idx));
            }
            for target in &binding.order_after {
                edges.insert((index[target], idx));
            }
            for target in &binding.order_before {
                edges.insert((idx, index[target]));
            }
        }

        let mut successors = vec![vec![]; count];
        let mut predecessors = vec![vec![]; count];
        let mut in_degree = vec![0; count];
        for (from, to) in edges {
            successors[from].push(to);
            predecessors[to].push(from);
            in_degree[to] += 1;
        }

        let mut ready = (0..count)
            .filter(|idx| in_degree[*idx] == 0)
            .map(Reverse)
            .collect::<BinaryHeap<_>>();
        let mut order = Vec::with_capacity(count);
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(idx);
            for next in &successors[idx] {
                in_degree[*next] -= 1;
                if in_degree[*next] == 0 {
                    ready.push(Reverse(*next));
                }
            }
        }

        if order.len() < count {
            let cycle = find_cycle(&in_degree, &predecessors)
                .into_iter()
                .map(|idx| self.bindings[idx].path.clone())
                .collect();
            return Err(RegistryError::Cycle(cycle));
        }

        Ok(order)
    }
}

// ===== impl OrderedPlan =====

impl OrderedPlan {
    // Returns the bindings in execution order.
    pub fn bindings(&self) -> impl Iterator<Item = &HandlerBinding> {
        self.bindings.iter()
    }

    pub fn binding(&self, path: &SchemaPath) -> Option<&HandlerBinding> {
        self.index.get(path).map(|idx| &self.bindings[*idx])
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn get(&self, idx: usize) -> &HandlerBinding {
        &self.bindings[idx]
    }

    pub(crate) fn position(&self, path: &SchemaPath) -> Option<usize> {
        self.index.get(path).copied()
    }

    // Child bindings of the given binding, or the root bindings when `None`.
    pub(crate) fn children(&self, parent: Option<usize>) -> &[usize] {
        match parent {
            Some(idx) => &self.children[idx],
            None => &self.roots,
        }
    }

    // Returns whether `name` is bound below the given binding (or at the
    // root when `None`).
    pub(crate) fn is_bound_child(
        &self,
        parent: Option<usize>,
        name: &str,
    ) -> bool {
        self.children(parent)
            .iter()
            .any(|idx| self.bindings[*idx].name() == name)
    }

    // Returns the binding closest to `path`, along with the instance path of
    // that binding.
    pub(crate) fn nearest_binding(
        &self,
        path: &DataPath,
    ) -> Option<(usize, DataPath)> {
        let mut path = path.clone();
        loop {
            if let Some(idx) = self.position(&path.schema()) {
                return Some((idx, path));
            }
            path = path.parent().filter(|parent| !parent.is_empty())?;
        }
    }
}

impl std::fmt::Debug for OrderedPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.bindings.iter().map(|binding| &binding.path))
            .finish()
    }
}

// ===== helper functions =====

// Extracts one cycle from the nodes left over by Kahn's algorithm. Every
// leftover node has at least one leftover predecessor, so walking
// predecessors must eventually revisit a node.
fn find_cycle(in_degree: &[usize], predecessors: &[Vec<usize>]) -> Vec<usize> {
    let Some(start) = (0..in_degree.len()).find(|idx| in_degree[*idx] > 0)
    else {
        return vec![];
    };

    let mut walk = vec![start];
    let mut node = start;
    loop {
        let Some(prev) = predecessors[node]
            .iter()
            .copied()
            .find(|prev| in_degree[*prev] > 0)
        else {
            return walk;
        };
        if let Some(pos) = walk.iter().position(|visited| *visited == prev) {
            // The walk goes against the edges, so reverse it to report the
            // cycle in execution order.
            let mut cycle = walk.split_off(pos);
            cycle.reverse();
            cycle.push(cycle[0]);
            return cycle;
        }
        walk.push(prev);
        node = prev;
    }
}
