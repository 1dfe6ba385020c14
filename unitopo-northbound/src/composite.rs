//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use itertools::Itertools;
use unitopo_yang::{DataNode, DataPath, ListKey};

use crate::configuration::{Operation, WriteOutcome, Writer, invoke_writer};
use crate::debug::Debug;
use crate::error::Error;
use crate::state::Reader;
use crate::underlay::UnderlayAccess;

// Information available to composite checks.
//
// On reads `data` is `None`, so checks decide from the path keys or from
// underlay data. On writes it holds the after-data for creates and updates
// and the before-data for deletes.
#[derive(Clone, Copy, Debug)]
pub struct CheckContext<'a> {
    pub path: &'a DataPath,
    pub data: Option<&'a DataNode>,
    pub underlay: &'a UnderlayAccess<'a>,
}

// Predicate deciding whether a composite candidate handles a request.
pub trait Check: Send + Sync {
    fn check(&self, ctx: &CheckContext<'_>) -> Result<bool, Error>;
}

pub struct Candidate<H> {
    pub name: String,
    check: Box<dyn Check>,
    pub handler: H,
}

//
// Composite dispatcher.
//
// Ordered set of candidate handlers for the same path. Checks are evaluated
// in registration order.
//
pub struct CompositeDispatcher<H> {
    candidates: Vec<Candidate<H>>,
}

// Reader delegating to the first candidate whose check accepts the path.
//
// List keys come from the key source when one is set, so that entries
// handled by different candidates keep a single vendor order. Without a key
// source they are the union of every candidate's keys, in candidate order.
pub struct CompositeReader {
    dispatcher: CompositeDispatcher<Box<dyn Reader>>,
    keys: Option<Box<KeySource>>,
}

type KeySource = dyn Fn(
        &UnderlayAccess<'_>,
        &DataPath,
    ) -> Result<Vec<ListKey>, Error>
    + Send
    + Sync;

// Writer trying every accepting candidate in order until one handles the
// operation.
pub struct CompositeWriter(CompositeDispatcher<Box<dyn Writer>>);

// ===== impl Check =====

impl<F> Check for F
where
    F: Fn(&CheckContext<'_>) -> Result<bool, Error> + Send + Sync,
{
    fn check(&self, ctx: &CheckContext<'_>) -> Result<bool, Error> {
        self(ctx)
    }
}

// ===== impl Candidate =====

impl<H> Candidate<H> {
    pub fn check(&self, ctx: &CheckContext<'_>) -> Result<bool, Error> {
        self.check.check(ctx)
    }
}

// ===== impl CompositeDispatcher =====

impl<H> CompositeDispatcher<H> {
    pub fn new() -> Self {
        CompositeDispatcher { candidates: vec![] }
    }

    #[must_use]
    pub fn candidate(
        mut self,
        name: &str,
        check: impl Check + 'static,
        handler: H,
    ) -> Self {
        self.candidates.push(Candidate {
            name: name.to_owned(),
            check: Box::new(check),
            handler,
        });
        self
    }

    pub fn candidates(&self) -> impl Iterator<Item = &Candidate<H>> {
        self.candidates.iter()
    }

    // Returns the first candidate accepting the request.
    pub fn dispatch(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<Option<&Candidate<H>>, Error> {
        Ok(self.position(ctx)?.map(|pos| &self.candidates[pos]))
    }

    // Returns every candidate accepting the request, in order.
    pub fn accepting(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<Vec<&Candidate<H>>, Error> {
        let mut accepting = vec![];
        for candidate in &self.candidates {
            if candidate.check(ctx)? {
                accepting.push(candidate);
            }
        }
        Ok(accepting)
    }

    fn position(&self, ctx: &CheckContext<'_>) -> Result<Option<usize>, Error> {
        for (pos, candidate) in self.candidates.iter().enumerate() {
            if candidate.check(ctx)? {
                return Ok(Some(pos));
            }
        }
        Ok(None)
    }
}

impl<H> Default for CompositeDispatcher<H> {
    fn default() -> Self {
        CompositeDispatcher::new()
    }
}

// ===== impl CompositeReader =====

impl CompositeReader {
    pub fn new() -> Self {
        CompositeReader {
            dispatcher: CompositeDispatcher::new(),
            keys: None,
        }
    }

    #[must_use]
    pub fn candidate<C>(
        self,
        name: &str,
        check: C,
        reader: impl Reader + 'static,
    ) -> Self
    where
        C: Fn(&CheckContext<'_>) -> Result<bool, Error> + Send + Sync + 'static,
    {
        let dispatcher =
            self.dispatcher.candidate(name, check, Box::new(reader));
        CompositeReader {
            dispatcher,
            keys: self.keys,
        }
    }

    // Sets the ordered source of list keys shared by all candidates.
    #[must_use]
    pub fn key_source<F>(mut self, keys: F) -> Self
    where
        F: Fn(&UnderlayAccess<'_>, &DataPath) -> Result<Vec<ListKey>, Error>
            + Send
            + Sync
            + 'static,
    {
        self.keys = Some(Box::new(keys));
        self
    }

    pub fn dispatcher(&self) -> &CompositeDispatcher<Box<dyn Reader>> {
        &self.dispatcher
    }
}

impl Default for CompositeReader {
    fn default() -> Self {
        CompositeReader::new()
    }
}

impl Reader for CompositeReader {
    fn list_keys(
        &self,
        underlay: &UnderlayAccess<'_>,
        parent: &DataPath,
    ) -> Result<Vec<ListKey>, Error> {
        if let Some(keys) = &self.keys {
            let keys = keys(underlay, parent)?;
            return Ok(keys.into_iter().unique().collect());
        }

        let mut keys = vec![];
        for candidate in self.dispatcher.candidates() {
            keys.extend(candidate.handler.list_keys(underlay, parent)?);
        }
        Ok(keys.into_iter().unique().collect())
    }

    fn read(
        &self,
        underlay: &UnderlayAccess<'_>,
        path: &DataPath,
    ) -> Result<Option<DataNode>, Error> {
        let ctx = CheckContext {
            path,
            data: None,
            underlay,
        };
        match self.dispatcher.dispatch(&ctx)? {
            Some(candidate) => {
                Debug::DispatchSelected(&candidate.name, path).log();
                candidate.handler.read(underlay, path)
            }
            None => {
                Debug::DispatchMiss(None, path).log();
                Ok(None)
            }
        }
    }
}

// ===== impl CompositeWriter =====

impl CompositeWriter {
    pub fn new() -> Self {
        CompositeWriter(CompositeDispatcher::new())
    }

    #[must_use]
    pub fn candidate<C>(
        self,
        name: &str,
        check: C,
        writer: impl Writer + 'static,
    ) -> Self
    where
        C: Fn(&CheckContext<'_>) -> Result<bool, Error> + Send + Sync + 'static,
    {
        CompositeWriter(self.0.candidate(name, check, Box::new(writer)))
    }

    pub fn dispatcher(&self) -> &CompositeDispatcher<Box<dyn Writer>> {
        &self.0
    }

    // Applies one operation. Returns the operation that reached the underlay
    // and the name of the candidate that handled it, or `None` when no
    // candidate did.
    //
    // When an update changes which candidate is selected (e.g. an instance
    // changing type), the previous candidate deletes the old data and the
    // new one creates the new data. If no candidate creates the new data,
    // the delete is what was applied.
    pub(crate) fn apply(
        &self,
        underlay: &UnderlayAccess<'_>,
        operation: Operation,
        path: &DataPath,
        before: Option<&DataNode>,
        after: Option<&DataNode>,
    ) -> Result<Option<(Operation, String)>, Error> {
        if operation == Operation::Update {
            let old = self.0.position(&CheckContext {
                path,
                data: before,
                underlay,
            })?;
            let new = self.0.position(&CheckContext {
                path,
                data: after,
                underlay,
            })?;
            if old != new {
                let deleted = match old {
                    Some(_) => self.chain(
                        underlay,
                        Operation::Delete,
                        path,
                        before,
                        None,
                    )?,
                    None => None,
                };
                let created =
                    self.chain(underlay, Operation::Create, path, None, after)?;
                return Ok(created.or(deleted));
            }
        }

        self.chain(underlay, operation, path, before, after)
    }

    fn chain(
        &self,
        underlay: &UnderlayAccess<'_>,
        operation: Operation,
        path: &DataPath,
        before: Option<&DataNode>,
        after: Option<&DataNode>,
    ) -> Result<Option<(Operation, String)>, Error> {
        let data = match operation {
            Operation::Delete => before,
            Operation::Create | Operation::Update => after,
        };
        let ctx = CheckContext {
            path,
            data,
            underlay,
        };

        for candidate in self.0.accepting(&ctx)? {
            Debug::DispatchSelected(&candidate.name, path).log();
            Debug::WriterInvoked(operation, path).log();
            let outcome = invoke_writer(
                candidate.handler.as_ref(),
                underlay,
                operation,
                path,
                before,
                after,
            )?;
            if outcome == WriteOutcome::Handled {
                return Ok(Some((operation, candidate.name.clone())));
            }
        }

        Debug::DispatchMiss(Some(operation), path).log();
        Ok(None)
    }
}

impl Default for CompositeWriter {
    fn default() -> Self {
        CompositeWriter::new()
    }
}
