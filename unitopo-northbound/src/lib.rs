//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod debug;

pub mod cache;
pub mod composite;
pub mod config;
pub mod configuration;
pub mod error;
pub mod keys;
pub mod logging;
pub mod registry;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod underlay;

pub use crate::composite::{
    Candidate, Check, CheckContext, CompositeDispatcher, CompositeReader,
    CompositeWriter,
};
pub use crate::configuration::{
    AppliedOperation, Change, ConfigDelta, NoopWriter, Operation,
    RollbackOutcome, RollbackPolicy, WriteFailure, WriteOutcome, Writer,
};
pub use crate::error::{Error, RegistryError, TransportError};
pub use crate::keys::KeyResolver;
pub use crate::registry::{
    BindingKind, HandlerBinding, OrderedPlan, PathRegistry,
};
pub use crate::state::Reader;
pub use crate::underlay::{PassStats, Transport, UnderlayAccess};
