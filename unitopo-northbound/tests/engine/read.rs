//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::path::PathBuf;

use maplit::btreemap;
use unitopo_northbound::config::Config;
use unitopo_northbound::testing::{MemoryTransport, TransportOp};
use unitopo_northbound::{
    Error, HandlerBinding, KeyResolver, Reader, UnderlayAccess,
};
use unitopo_utils::yang::DataNodeExt;
use unitopo_yang::{DataNode, DataPath, ListKey};

use crate::fixtures::*;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/engine/data")
        .join(name)
}

fn keys(tree: &DataNode, list: &str) -> Vec<String> {
    tree.get(&path(list).parent().unwrap())
        .and_then(|node| node.list(path(list).last().unwrap().name.as_str()))
        .unwrap_or_default()
        .iter()
        .map(|entry| entry.key.to_string())
        .collect()
}

// Reader returning vendor counters nobody is bound to.
struct NoisyInterfaceReader(KeyResolver);

impl Reader for NoisyInterfaceReader {
    fn list_keys(
        &self,
        underlay: &UnderlayAccess<'_>,
        _parent: &DataPath,
    ) -> Result<Vec<ListKey>, Error> {
        self.0.resolve(underlay, &interfaces_id())
    }

    fn read(
        &self,
        _underlay: &UnderlayAccess<'_>,
        path: &DataPath,
    ) -> Result<Option<DataNode>, Error> {
        let name = path.last_key().map(ToString::to_string).unwrap_or_default();
        Ok(Some(
            DataNode::new().with_leaf("name", name).with_container(
                "counters",
                DataNode::new().with_leaf("in-octets", 10u64),
            ),
        ))
    }
}

fn noisy_bindings() -> Vec<HandlerBinding> {
    vec![
        HandlerBinding::structural("Interfaces"),
        HandlerBinding::list("Interfaces/Interface")
            .reader(NoisyInterfaceReader(KeyResolver::new("interface"))),
    ]
}

#[test]
fn read_pass_normalizes_vendor_tree() {
    let log = CallLog::default();
    let plan = device_plan(&log);
    let transport = MemoryTransport::new().with_config(vendor_tree());

    let tree = plan.read_pass(&transport).unwrap();

    assert_eq!(
        keys(&tree, "Interfaces/Interface"),
        ["ge-0/0/0", "ae0", "ge-0/0/1"]
    );
    let config = tree
        .get(&path("Interfaces/Interface[ge-0/0/0]/Config"))
        .unwrap();
    assert_eq!(config.get_u32("mtu"), Some(9000));
    assert_eq!(config.get_string("description").as_deref(), Some("uplink"));
    assert_eq!(config.get_string("type").as_deref(), Some(ETHERNET));
    assert_eq!(config.get_bool("enabled"), Some(true));
    assert_eq!(
        tree.get(&path("Interfaces/Interface[ge-0/0/1]/Config"))
            .and_then(|config| config.get_bool("enabled")),
        Some(false)
    );
    assert_eq!(
        tree.get(&path("Interfaces/Interface[ae0]/Aggregation/Config"))
            .and_then(|config| config.get_u32("min-links")),
        Some(2)
    );
    assert!(
        tree.get(&path("Interfaces/Interface[ge-0/0/0]/Aggregation"))
            .is_none()
    );

    let unit = DataPath::root()
        .child("Interfaces")
        .entry("Interface", "ge-0/0/0")
        .child("Subinterfaces")
        .entry("Subinterface", 0u64);
    assert_eq!(
        tree.get(&unit)
            .and_then(|unit| unit.get_u32_relative("Config/vlan-id")),
        Some(10)
    );

    assert_eq!(
        keys(&tree, "NetworkInstances/NetworkInstance"),
        ["default", "cust-a", "pw-1"]
    );
    assert_eq!(
        tree.get(&path("NetworkInstances/NetworkInstance[cust-a]/Config"))
            .and_then(|config| config.get_string("route-distinguisher"))
            .as_deref(),
        Some("65550:10")
    );
    assert_eq!(
        tree.get(&path("NetworkInstances/NetworkInstance[pw-1]"))
            .and_then(|instance| instance.get_string_relative("Config/type"))
            .as_deref(),
        Some(L2P2P)
    );
}

#[test]
fn vendor_data_fetched_once_per_pass() {
    let plan = device_plan(&CallLog::default());
    let transport = MemoryTransport::new().with_config(vendor_tree());

    plan.read_pass(&transport).unwrap();

    // The interface, config, aggregation, filter and subinterface handlers
    // all read the same vendor interface entry.
    for name in ["ge-0/0/0", "ae0", "ge-0/0/1"] {
        let id = interface_id(&ListKey::from(name));
        assert_eq!(transport.read_count(&id), 1, "{id}");
    }
    assert_eq!(transport.read_count(&interfaces_id()), 1);
    assert_eq!(transport.read_count(&routing_instances_id()), 1);
    assert_eq!(transport.read_count(&instance_id(&"cust-a".into())), 1);

    // A new pass starts with an empty cache.
    transport.clear_calls();
    plan.read_pass(&transport).unwrap();
    assert_eq!(transport.read_count(&interfaces_id()), 1);
}

#[test]
fn keys_follow_vendor_order() {
    let plan = device_plan(&CallLog::default());
    let transport = MemoryTransport::new().with_config(vendor_tree());

    let first = plan.read_pass(&transport).unwrap();
    let second = plan.read_pass(&transport).unwrap();
    assert_eq!(first, second);

    // Reordering the vendor list reorders the normalized list.
    let reordered = vendor_tree().replace_at(
        &interfaces_id().path,
        Some(
            &DataNode::new()
                .with_entry("interface", "ge-0/0/1", DataNode::new())
                .with_entry("interface", "ae0", DataNode::new()),
        ),
    );
    let transport = MemoryTransport::new().with_config(reordered);
    let tree = plan.read_pass(&transport).unwrap();
    assert_eq!(keys(&tree, "Interfaces/Interface"), ["ge-0/0/1", "ae0"]);
}

#[test]
fn empty_underlay() {
    let log = CallLog::default();
    let plan = device_plan(&log);
    let transport = MemoryTransport::new();

    let tree = plan.read_pass(&transport).unwrap();

    // Structural nodes only exist when something below them does.
    assert!(!tree.contains("Interfaces"));
    assert_eq!(keys(&tree, "NetworkInstances/NetworkInstance"), ["default"]);
    // Composite dispatch never reached the other instance readers.
    assert_eq!(log.handlers(), ["default"]);
}

#[test]
fn reader_only_list_with_filter() {
    let log = CallLog::default();
    let mut bindings = interface_bindings(&log);
    bindings.extend(acl_bindings(&log));
    let plan = plan(bindings);
    let transport = MemoryTransport::new().with_config(vendor_tree());

    let tree = plan.read_pass(&transport).unwrap();

    assert_eq!(keys(&tree, "Acl/Interfaces/Interface"), ["ge-0/0/0"]);
    assert_eq!(
        tree.get(&path("Acl/Interfaces/Interface[ge-0/0/0]"))
            .and_then(|entry| entry.get_string("id"))
            .as_deref(),
        Some("ge-0/0/0")
    );
}

#[test]
fn unowned_reader_output() {
    let transport = MemoryTransport::new().with_config(vendor_tree());

    let plan = plan(noisy_bindings());
    let tree = plan.read_pass(&transport).unwrap();
    let entry = tree.get(&path("Interfaces/Interface[ae0]")).unwrap();
    assert!(entry.contains("name"));
    assert!(!entry.contains("counters"));

    let mut config = Config::default();
    config.read.strip_unowned = false;
    let plan = plan_with(noisy_bindings(), &config);
    let tree = plan.read_pass(&transport).unwrap();
    assert_eq!(
        tree.get(&path("Interfaces/Interface[ae0]"))
            .and_then(|entry| entry.get_u64_relative("counters/in-octets")),
        Some(10)
    );
}

#[test]
fn read_single_path() {
    let log = CallLog::default();
    let plan = device_plan(&log);
    let transport = MemoryTransport::new().with_config(vendor_tree());

    let config = plan
        .read_path(
            &transport,
            &path("Interfaces/Interface[ae0]/Aggregation/Config"),
        )
        .unwrap()
        .unwrap();
    assert_eq!(config.get_u32("min-links"), Some(2));

    // Keys in the path are trusted: no key listing for the interface list.
    assert_eq!(transport.read_count(&interfaces_id()), 0);

    let mtu = plan
        .read_path(&transport, &path("Interfaces/Interface[ge-0/0/0]/Config"))
        .unwrap()
        .and_then(|config| config.get_u32("mtu"));
    assert_eq!(mtu, Some(9000));

    let interfaces = plan
        .read_path(&transport, &path("Interfaces/Interface"))
        .unwrap()
        .unwrap();
    assert_eq!(interfaces.list("Interface").map(<[_]>::len), Some(3));

    assert!(
        plan.read_path(&transport, &path("Interfaces/Interface[xe-1/0/0]"))
            .unwrap()
            .is_none()
    );
    assert!(
        plan.read_path(&transport, &path("Qos/Interfaces"))
            .unwrap()
            .is_none()
    );
}

#[test]
fn read_failure_aborts_pass() {
    let plan = device_plan(&CallLog::default());
    let transport = MemoryTransport::new().with_config(vendor_tree());
    let id = interface_id(&"ae0".into());
    transport.fail_on(TransportOp::Read, id.clone());

    match plan.read_pass(&transport) {
        Err(Error::UnderlayRead { id: failed, .. }) => assert_eq!(failed, id),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn json_vendor_fixture() {
    let transport =
        MemoryTransport::load(fixture("vendor-config.json"), None).unwrap();
    assert_eq!(transport.config(), vendor_tree());

    let tree = device_plan(&CallLog::default()).read_pass(&transport).unwrap();
    let mtus = btreemap! {
        "ae0" => None,
        "ge-0/0/0" => Some(9000),
        "ge-0/0/1" => None,
    };
    for (name, mtu) in mtus {
        let config = path(&format!("Interfaces/Interface[{name}]/Config"));
        assert_eq!(
            tree.get(&config).and_then(|config| config.get_u32("mtu")),
            mtu,
            "{name}"
        );
    }
}
