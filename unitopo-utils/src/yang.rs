//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use unitopo_yang::{DataNode, LeafValue, TryFromYang};

/// Extension methods for `DataNode`.
///
/// Leaf getters return `None` when the leaf is absent or holds a value of a
/// different type. The `_relative` variants accept a `/`-separated path of
/// container names ending with the leaf name (`config/mtu`); a leading `./`
/// is accepted for readability.
pub trait DataNodeExt {
    fn exists(&self, path: &str) -> bool;
    fn get_leaf_relative(&self, path: &str) -> Option<&LeafValue>;
    fn get_u8(&self, name: &str) -> Option<u8>;
    fn get_u8_relative(&self, path: &str) -> Option<u8>;
    fn get_u16(&self, name: &str) -> Option<u16>;
    fn get_u16_relative(&self, path: &str) -> Option<u16>;
    fn get_u32(&self, name: &str) -> Option<u32>;
    fn get_u32_relative(&self, path: &str) -> Option<u32>;
    fn get_u64(&self, name: &str) -> Option<u64>;
    fn get_u64_relative(&self, path: &str) -> Option<u64>;
    fn get_int32(&self, name: &str) -> Option<i32>;
    fn get_int32_relative(&self, path: &str) -> Option<i32>;
    fn get_int64(&self, name: &str) -> Option<i64>;
    fn get_int64_relative(&self, path: &str) -> Option<i64>;
    fn get_bool(&self, name: &str) -> Option<bool>;
    fn get_bool_relative(&self, path: &str) -> Option<bool>;
    fn get_string(&self, name: &str) -> Option<String>;
    fn get_string_relative(&self, path: &str) -> Option<String>;
    fn get_ip(&self, name: &str) -> Option<IpAddr>;
    fn get_ip_relative(&self, path: &str) -> Option<IpAddr>;
    fn get_ipv4(&self, name: &str) -> Option<Ipv4Addr>;
    fn get_ipv4_relative(&self, path: &str) -> Option<Ipv4Addr>;
    fn get_ipv6(&self, name: &str) -> Option<Ipv6Addr>;
    fn get_ipv6_relative(&self, path: &str) -> Option<Ipv6Addr>;
    fn get_identity<T: TryFromYang>(&self, name: &str) -> Option<T>;
    fn get_identity_relative<T: TryFromYang>(&self, path: &str) -> Option<T>;
}

// ===== impl DataNode =====

impl DataNodeExt for DataNode {
    fn exists(&self, path: &str) -> bool {
        let mut node = self;
        let mut segments = split_relative(path).peekable();
        while let Some(name) = segments.next() {
            if segments.peek().is_none() {
                return node.contains(name);
            }
            match node.container(name) {
                Some(child) => node = child,
                None => return false,
            }
        }
        true
    }

    fn get_leaf_relative(&self, path: &str) -> Option<&LeafValue> {
        let mut node = self;
        let mut segments = split_relative(path).peekable();
        while let Some(name) = segments.next() {
            if segments.peek().is_none() {
                return node.leaf(name);
            }
            node = node.container(name)?;
        }
        None
    }

    fn get_u8(&self, name: &str) -> Option<u8> {
        self.leaf(name).and_then(leaf_to_uint)
    }

    fn get_u8_relative(&self, path: &str) -> Option<u8> {
        self.get_leaf_relative(path).and_then(leaf_to_uint)
    }

    fn get_u16(&self, name: &str) -> Option<u16> {
        self.leaf(name).and_then(leaf_to_uint)
    }

    fn get_u16_relative(&self, path: &str) -> Option<u16> {
        self.get_leaf_relative(path).and_then(leaf_to_uint)
    }

    fn get_u32(&self, name: &str) -> Option<u32> {
        self.leaf(name).and_then(leaf_to_uint)
    }

    fn get_u32_relative(&self, path: &str) -> Option<u32> {
        self.get_leaf_relative(path).and_then(leaf_to_uint)
    }

    fn get_u64(&self, name: &str) -> Option<u64> {
        self.leaf(name).and_then(LeafValue::as_u64)
    }

    fn get_u64_relative(&self, path: &str) -> Option<u64> {
        self.get_leaf_relative(path).and_then(LeafValue::as_u64)
    }

    fn get_int32(&self, name: &str) -> Option<i32> {
        self.leaf(name).and_then(leaf_to_int)
    }

    fn get_int32_relative(&self, path: &str) -> Option<i32> {
        self.get_leaf_relative(path).and_then(leaf_to_int)
    }

    fn get_int64(&self, name: &str) -> Option<i64> {
        self.leaf(name).and_then(LeafValue::as_i64)
    }

    fn get_int64_relative(&self, path: &str) -> Option<i64> {
        self.get_leaf_relative(path).and_then(LeafValue::as_i64)
    }

    fn get_bool(&self, name: &str) -> Option<bool> {
        self.leaf(name).and_then(LeafValue::as_bool)
    }

    fn get_bool_relative(&self, path: &str) -> Option<bool> {
        self.get_leaf_relative(path).and_then(LeafValue::as_bool)
    }

    fn get_string(&self, name: &str) -> Option<String> {
        self.leaf(name).map(LeafValue::to_string)
    }

    fn get_string_relative(&self, path: &str) -> Option<String> {
        self.get_leaf_relative(path).map(LeafValue::to_string)
    }

    fn get_ip(&self, name: &str) -> Option<IpAddr> {
        self.leaf(name).and_then(leaf_parse)
    }

    fn get_ip_relative(&self, path: &str) -> Option<IpAddr> {
        self.get_leaf_relative(path).and_then(leaf_parse)
    }

    fn get_ipv4(&self, name: &str) -> Option<Ipv4Addr> {
        self.leaf(name).and_then(leaf_parse)
    }

    fn get_ipv4_relative(&self, path: &str) -> Option<Ipv4Addr> {
        self.get_leaf_relative(path).and_then(leaf_parse)
    }

    fn get_ipv6(&self, name: &str) -> Option<Ipv6Addr> {
        self.leaf(name).and_then(leaf_parse)
    }

    fn get_ipv6_relative(&self, path: &str) -> Option<Ipv6Addr> {
        self.get_leaf_relative(path).and_then(leaf_parse)
    }

    fn get_identity<T: TryFromYang>(&self, name: &str) -> Option<T> {
        self.leaf(name)
            .and_then(LeafValue::as_str)
            .and_then(T::try_from_yang)
    }

    fn get_identity_relative<T: TryFromYang>(&self, path: &str) -> Option<T> {
        self.get_leaf_relative(path)
            .and_then(LeafValue::as_str)
            .and_then(T::try_from_yang)
    }
}

// ===== helper functions =====

fn split_relative(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
}

fn leaf_to_uint<T: TryFrom<u64>>(leaf: &LeafValue) -> Option<T> {
    leaf.as_u64().and_then(|value| T::try_from(value).ok())
}

fn leaf_to_int<T: TryFrom<i64>>(leaf: &LeafValue) -> Option<T> {
    leaf.as_i64().and_then(|value| T::try_from(value).ok())
}

fn leaf_parse<T: FromStr>(leaf: &LeafValue) -> Option<T> {
    leaf.as_str().and_then(|value| value.parse().ok())
}
