//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{ToYang, TryFromYang};

// Single component of a list key.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    Num(u64),
    Str(String),
}

// Key of a list entry. Comparable and hashable, otherwise opaque to the
// engine.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
#[serde(transparent)]
pub struct ListKey(SmallVec<[KeyValue; 2]>);

//
// Schema path.
//
// Keyless sequence of node names, used to address handler bindings.
//
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct SchemaPath(Vec<String>);

// One step of a data path.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct Segment {
    pub name: String,
    pub key: Option<ListKey>,
}

//
// Data path.
//
// Instance path into a normalized or vendor data tree. List entries are
// addressed by the segment key.
//
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct DataPath(Vec<Segment>);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum Datastore {
    Config,
    Operational,
}

// Path into the vendor tree, tagged with the datastore it refers to.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct UnderlayIdentifier {
    pub datastore: Datastore,
    pub path: DataPath,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathParseError(pub String);

// ===== impl KeyValue =====

impl KeyValue {
    // Canonical decimal numbers (no sign, no leading zeros) are numeric.
    fn parse(value: &str) -> KeyValue {
        match value.parse::<u64>() {
            Ok(num) if num.to_string() == value => KeyValue::Num(num),
            _ => KeyValue::Str(value.to_owned()),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Num(value) => write!(f, "{value}"),
            KeyValue::Str(value) => write!(f, "{value}"),
        }
    }
}

// ===== impl ListKey =====

impl ListKey {
    pub fn new(values: impl IntoIterator<Item = KeyValue>) -> ListKey {
        ListKey(values.into_iter().collect())
    }

    pub fn values(&self) -> &[KeyValue] {
        &self.0
    }

    // Returns the key as a string when it consists of a single string value.
    pub fn as_str(&self) -> Option<&str> {
        match self.0.as_slice() {
            [KeyValue::Str(value)] => Some(value),
            _ => None,
        }
    }

    // Returns the key as a number when it consists of a single numeric value.
    pub fn as_num(&self) -> Option<u64> {
        match self.0.as_slice() {
            [KeyValue::Num(value)] => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(","))
    }
}

impl From<&str> for ListKey {
    fn from(value: &str) -> ListKey {
        ListKey::new([KeyValue::Str(value.to_owned())])
    }
}

impl From<String> for ListKey {
    fn from(value: String) -> ListKey {
        ListKey::new([KeyValue::Str(value)])
    }
}

impl From<u64> for ListKey {
    fn from(value: u64) -> ListKey {
        ListKey::new([KeyValue::Num(value)])
    }
}

impl From<u32> for ListKey {
    fn from(value: u32) -> ListKey {
        ListKey::new([KeyValue::Num(value.into())])
    }
}

impl From<(&str, u64)> for ListKey {
    fn from((name, index): (&str, u64)) -> ListKey {
        ListKey::new([KeyValue::Str(name.to_owned()), KeyValue::Num(index)])
    }
}

impl From<(&str, &str)> for ListKey {
    fn from((first, second): (&str, &str)) -> ListKey {
        ListKey::new([
            KeyValue::Str(first.to_owned()),
            KeyValue::Str(second.to_owned()),
        ])
    }
}

// ===== impl SchemaPath =====

impl SchemaPath {
    pub fn root() -> SchemaPath {
        SchemaPath::default()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<SchemaPath> {
        let (_, parent) = self.0.split_last()?;
        Some(SchemaPath(parent.to_vec()))
    }

    #[must_use]
    pub fn child(&self, name: &str) -> SchemaPath {
        let mut path = self.clone();
        path.0.push(name.to_owned());
        path
    }

    #[must_use]
    pub fn join(&self, relative: &SchemaPath) -> SchemaPath {
        let mut path = self.clone();
        path.0.extend(relative.0.iter().cloned());
        path
    }

    pub fn starts_with(&self, prefix: &SchemaPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    // Returns whether `self` is a proper ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &SchemaPath) -> bool {
        other.0.len() > self.0.len() && other.starts_with(self)
    }

    pub fn strip_prefix(&self, prefix: &SchemaPath) -> Option<SchemaPath> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| SchemaPath(rest.to_vec()))
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("/"))
    }
}

impl From<&str> for SchemaPath {
    fn from(path: &str) -> SchemaPath {
        SchemaPath(
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }
}

impl From<&DataPath> for SchemaPath {
    fn from(path: &DataPath) -> SchemaPath {
        path.schema()
    }
}

// ===== impl Segment =====

impl Segment {
    pub fn container(name: &str) -> Segment {
        Segment {
            name: name.to_owned(),
            key: None,
        }
    }

    pub fn entry(name: &str, key: impl Into<ListKey>) -> Segment {
        Segment {
            name: name.to_owned(),
            key: Some(key.into()),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}[{}]", self.name, key),
            None => write!(f, "{}", self.name),
        }
    }
}

// ===== impl DataPath =====

impl DataPath {
    pub fn root() -> DataPath {
        DataPath::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    // Key of the last segment, if it addresses a list entry.
    pub fn last_key(&self) -> Option<&ListKey> {
        self.0.last().and_then(|segment| segment.key.as_ref())
    }

    // Key of the nearest list entry segment with the given name, searching
    // from the leaf towards the root.
    pub fn key_of(&self, name: &str) -> Option<&ListKey> {
        self.0
            .iter()
            .rev()
            .find(|segment| segment.name == name)
            .and_then(|segment| segment.key.as_ref())
    }

    pub fn parent(&self) -> Option<DataPath> {
        let (_, parent) = self.0.split_last()?;
        Some(DataPath(parent.to_vec()))
    }

    #[must_use]
    pub fn child(&self, name: &str) -> DataPath {
        self.push(Segment::container(name))
    }

    #[must_use]
    pub fn entry(&self, name: &str, key: impl Into<ListKey>) -> DataPath {
        self.push(Segment::entry(name, key))
    }

    #[must_use]
    pub fn push(&self, segment: Segment) -> DataPath {
        let mut path = self.clone();
        path.0.push(segment);
        path
    }

    #[must_use]
    pub fn join(&self, relative: &DataPath) -> DataPath {
        let mut path = self.clone();
        path.0.extend(relative.0.iter().cloned());
        path
    }

    // Schema path obtained by dropping all list keys.
    pub fn schema(&self) -> SchemaPath {
        SchemaPath(self.0.iter().map(|segment| segment.name.clone()).collect())
    }

    pub fn starts_with(&self, prefix: &DataPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    // Returns whether `self` is a proper ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &DataPath) -> bool {
        other.0.len() > self.0.len() && other.starts_with(self)
    }

    pub fn strip_prefix(&self, prefix: &DataPath) -> Option<DataPath> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| DataPath(rest.to_vec()))
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.iter().join("/"))
    }
}

impl From<&SchemaPath> for DataPath {
    fn from(path: &SchemaPath) -> DataPath {
        DataPath(path.segments().map(Segment::container).collect())
    }
}

impl FromIterator<Segment> for DataPath {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> DataPath {
        DataPath(iter.into_iter().collect())
    }
}

impl FromStr for DataPath {
    type Err = PathParseError;

    // Parses paths such as `Interfaces/Interface[Bundle-Ether1]/Config`.
    //
    // Slashes inside brackets belong to the key, so interface names like
    // `GigabitEthernet0/0/0/1` can be used as keys. Key values written as
    // plain decimal numbers parse as `KeyValue::Num`, others as
    // `KeyValue::Str`.
    fn from_str(s: &str) -> Result<DataPath, PathParseError> {
        let mut segments = vec![];
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            let mut name = String::new();
            let mut key = None;
            while let Some(c) = chars.next() {
                match c {
                    '/' => break,
                    '[' => {
                        let mut raw = String::new();
                        let mut closed = false;
                        for c in chars.by_ref() {
                            if c == ']' {
                                closed = true;
                                break;
                            }
                            raw.push(c);
                        }
                        if !closed {
                            return Err(PathParseError(format!(
                                "unterminated key in segment '{name}'"
                            )));
                        }
                        key = Some(ListKey::new(
                            raw.split(',').map(KeyValue::parse),
                        ));
                        // A key must terminate the segment.
                        match chars.next() {
                            None | Some('/') => break,
                            Some(c) => {
                                return Err(PathParseError(format!(
                                    "unexpected '{c}' after key of '{name}'"
                                )));
                            }
                        }
                    }
                    ']' => {
                        return Err(PathParseError(format!(
                            "unbalanced ']' in segment '{name}'"
                        )));
                    }
                    c => name.push(c),
                }
            }

            if name.is_empty() {
                if key.is_some() {
                    return Err(PathParseError("key without node name".into()));
                }
                continue;
            }
            segments.push(Segment { name, key });
        }

        Ok(DataPath(segments))
    }
}

// ===== impl Datastore =====

impl ToYang for Datastore {
    fn to_yang(&self) -> Cow<'static, str> {
        match self {
            Datastore::Config => "config".into(),
            Datastore::Operational => "operational".into(),
        }
    }
}

impl TryFromYang for Datastore {
    fn try_from_yang(value: &str) -> Option<Datastore> {
        match value {
            "config" => Some(Datastore::Config),
            "operational" => Some(Datastore::Operational),
            _ => None,
        }
    }
}

// ===== impl UnderlayIdentifier =====

impl UnderlayIdentifier {
    pub fn new(datastore: Datastore, path: DataPath) -> UnderlayIdentifier {
        UnderlayIdentifier { datastore, path }
    }

    pub fn config(path: DataPath) -> UnderlayIdentifier {
        UnderlayIdentifier::new(Datastore::Config, path)
    }

    pub fn operational(path: DataPath) -> UnderlayIdentifier {
        UnderlayIdentifier::new(Datastore::Operational, path)
    }

    #[must_use]
    pub fn child(&self, name: &str) -> UnderlayIdentifier {
        UnderlayIdentifier::new(self.datastore, self.path.child(name))
    }

    #[must_use]
    pub fn entry(
        &self,
        name: &str,
        key: impl Into<ListKey>,
    ) -> UnderlayIdentifier {
        UnderlayIdentifier::new(self.datastore, self.path.entry(name, key))
    }
}

impl fmt::Display for UnderlayIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.datastore.to_yang(), self.path)
    }
}

// ===== impl PathParseError =====

impl fmt::Display for PathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid data path: {}", self.0)
    }
}

impl std::error::Error for PathParseError {}
