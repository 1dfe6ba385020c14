//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// YANG module identifier.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct ModuleId {
    pub name: String,
    pub revision: Option<String>,
}

//
// Schema registry.
//
// Set of YANG modules the registered paths are valid against, along with the
// top-level nodes each module provides. Built once at start-up by the schema
// loader and handed by reference to the path registry builder.
//
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    modules: BTreeMap<ModuleId, BTreeSet<String>>,
}

// ===== impl ModuleId =====

impl ModuleId {
    pub fn new(name: &str, revision: Option<&str>) -> ModuleId {
        ModuleId {
            name: name.to_owned(),
            revision: revision.map(str::to_owned),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(revision) => write!(f, "{}@{}", self.name, revision),
            None => write!(f, "{}", self.name),
        }
    }
}

// ===== impl SchemaRegistry =====

impl SchemaRegistry {
    pub fn new() -> SchemaRegistry {
        SchemaRegistry::default()
    }

    #[must_use]
    pub fn module<'a>(
        mut self,
        module: ModuleId,
        roots: impl IntoIterator<Item = &'a str>,
    ) -> SchemaRegistry {
        self.add_module(module, roots);
        self
    }

    pub fn add_module<'a>(
        &mut self,
        module: ModuleId,
        roots: impl IntoIterator<Item = &'a str>,
    ) {
        self.modules
            .entry(module)
            .or_default()
            .extend(roots.into_iter().map(str::to_owned));
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.keys()
    }

    // Returns the module providing the given top-level node, if any.
    pub fn module_for_root(&self, root: &str) -> Option<&ModuleId> {
        self.modules
            .iter()
            .find(|(_, roots)| roots.contains(root))
            .map(|(module, _)| module)
    }

    pub fn provides_root(&self, root: &str) -> bool {
        self.module_for_root(root).is_some()
    }
}
