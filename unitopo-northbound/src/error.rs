//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use itertools::Itertools;
use tracing::warn;
use unitopo_yang::{DataPath, SchemaPath, UnderlayIdentifier};

// Failure reported by the vendor transport.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

// Errors raised while running a read or write pass.
#[derive(Debug)]
pub enum Error {
    UnderlayRead {
        id: UnderlayIdentifier,
        source: TransportError,
    },
    UnderlayWrite {
        id: UnderlayIdentifier,
        source: TransportError,
    },
    Validation {
        path: DataPath,
        reason: String,
    },
    NoWriter(DataPath),
}

// Errors raised while building the path registry.
#[derive(Debug, Eq, PartialEq)]
pub enum RegistryError {
    Cycle(Vec<SchemaPath>),
    DuplicateBinding(SchemaPath),
    MissingParent(SchemaPath),
    UnknownOrderTarget {
        path: SchemaPath,
        target: SchemaPath,
    },
    OwnedSubtreeConflict {
        path: SchemaPath,
        owner: SchemaPath,
    },
    UnknownRoot(SchemaPath),
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::UnderlayRead { id, source }
            | Error::UnderlayWrite { id, source } => {
                warn!(%id, error = %source, "{}", self);
            }
            Error::Validation { path, reason } => {
                warn!(%path, %reason, "{}", self);
            }
            Error::NoWriter(path) => {
                warn!(%path, "{}", self);
            }
        }
    }

    pub fn validation(path: &DataPath, reason: impl Into<String>) -> Error {
        Error::Validation {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnderlayRead { id, .. } => {
                write!(f, "failed to read underlay data at {id}")
            }
            Error::UnderlayWrite { id, .. } => {
                write!(f, "failed to write underlay data at {id}")
            }
            Error::Validation { path, reason } => {
                write!(f, "invalid configuration at {path}: {reason}")
            }
            Error::NoWriter(path) => {
                write!(f, "no writer registered for {path}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UnderlayRead { source, .. }
            | Error::UnderlayWrite { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

// ===== impl RegistryError =====

impl RegistryError {
    pub fn log(&self) {
        match self {
            RegistryError::Cycle(paths) => {
                let paths = paths.iter().join(" -> ");
                warn!(%paths, "{}", self);
            }
            RegistryError::DuplicateBinding(path)
            | RegistryError::MissingParent(path)
            | RegistryError::UnknownRoot(path) => {
                warn!(%path, "{}", self);
            }
            RegistryError::UnknownOrderTarget { path, target } => {
                warn!(%path, %target, "{}", self);
            }
            RegistryError::OwnedSubtreeConflict { path, owner } => {
                warn!(%path, %owner, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Cycle(..) => {
                write!(f, "ordering constraints form a cycle")
            }
            RegistryError::DuplicateBinding(path) => {
                write!(f, "handler already registered for {path}")
            }
            RegistryError::MissingParent(path) => {
                write!(f, "no handler registered for the parent of {path}")
            }
            RegistryError::UnknownOrderTarget { target, .. } => {
                write!(f, "ordering constraint refers to unknown path {target}")
            }
            RegistryError::OwnedSubtreeConflict { path, owner } => {
                write!(f, "{path} is part of the subtree owned by {owner}")
            }
            RegistryError::UnknownRoot(path) => {
                write!(f, "no schema module provides the root of {path}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}
