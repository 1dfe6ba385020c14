//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::{debug, trace, trace_span};
use unitopo_yang::{DataPath, UnderlayIdentifier};

use crate::configuration::Operation;
use crate::underlay::{Mutation, PassKind, PassStats};

// Northbound debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    ReaderInvoked(&'a DataPath),
    ListKeys(&'a DataPath, usize),
    WriterInvoked(Operation, &'a DataPath),
    DispatchSelected(&'a str, &'a DataPath),
    DispatchMiss(Option<Operation>, &'a DataPath),
    CacheHit(&'a UnderlayIdentifier),
    CacheFetch(&'a UnderlayIdentifier),
    UnderlayMutation(Mutation, &'a UnderlayIdentifier),
    RollbackStep(&'a UnderlayIdentifier),
    PassSummary(PassKind, &'a PassStats),
}

// ===== impl Debug =====

impl Debug<'_> {
    pub(crate) fn log(&self) {
        match self {
            Debug::ReaderInvoked(path) => {
                trace_span!("northbound").in_scope(|| {
                    trace!(%path, "{}", self);
                });
            }
            Debug::ListKeys(path, count) => {
                trace_span!("northbound").in_scope(|| {
                    trace!(%path, %count, "{}", self);
                });
            }
            Debug::WriterInvoked(operation, path) => {
                trace_span!("northbound").in_scope(|| {
                    trace!(?operation, %path, "{}", self);
                });
            }
            Debug::DispatchSelected(candidate, path) => {
                trace_span!("northbound").in_scope(|| {
                    trace!(%candidate, %path, "{}", self);
                });
            }
            Debug::DispatchMiss(operation, path) => {
                trace_span!("northbound").in_scope(|| {
                    debug!(?operation, %path, "{}", self);
                });
            }
            Debug::CacheHit(id) | Debug::CacheFetch(id) => {
                trace_span!("northbound")
                    .in_scope(|| trace!(%id, "{}", self));
            }
            Debug::UnderlayMutation(mutation, id) => {
                trace_span!("northbound").in_scope(|| {
                    trace!(?mutation, %id, "{}", self);
                });
            }
            Debug::RollbackStep(id) => {
                trace_span!("northbound").in_scope(|| {
                    debug!(%id, "{}", self);
                });
            }
            Debug::PassSummary(pass, stats) => {
                trace_span!("northbound").in_scope(|| {
                    debug!(
                        ?pass,
                        transport_reads = stats.transport_reads,
                        cache_hits = stats.cache_hits,
                        mutations = stats.mutations,
                        "{}", self
                    );
                });
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::ReaderInvoked(..) => {
                write!(f, "reader invoked")
            }
            Debug::ListKeys(..) => {
                write!(f, "list keys resolved")
            }
            Debug::WriterInvoked(..) => {
                write!(f, "writer invoked")
            }
            Debug::DispatchSelected(..) => {
                write!(f, "composite candidate selected")
            }
            Debug::DispatchMiss(..) => {
                write!(f, "no composite candidate accepted the request")
            }
            Debug::CacheHit(..) => {
                write!(f, "underlay read served from cache")
            }
            Debug::CacheFetch(..) => {
                write!(f, "underlay read fetched from transport")
            }
            Debug::UnderlayMutation(..) => {
                write!(f, "underlay mutation")
            }
            Debug::RollbackStep(..) => {
                write!(f, "restoring underlay data")
            }
            Debug::PassSummary(..) => {
                write!(f, "pass completed")
            }
        }
    }
}
