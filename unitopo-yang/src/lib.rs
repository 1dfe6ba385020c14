//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod data;
pub mod path;
pub mod schema;

use std::borrow::Cow;

pub use crate::data::{DataNode, Item, LeafValue, ListEntry};
pub use crate::path::{
    DataPath, Datastore, KeyValue, ListKey, PathParseError, SchemaPath,
    Segment, UnderlayIdentifier,
};
pub use crate::schema::{ModuleId, SchemaRegistry};

//
// YANG conversion traits.
//
// Implemented by handler-side enums that translate between vendor values
// and the identities or enumerations of the normalized model.
//

pub trait ToYang {
    // Return YANG textual representation of the value.
    fn to_yang(&self) -> Cow<'static, str>;
}

pub trait TryFromYang: Sized {
    // Construct value from YANG identity or enum value.
    fn try_from_yang(identity: &str) -> Option<Self>;
}
