//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use unitopo_northbound::testing::MemoryTransport;
use unitopo_northbound::underlay::Mutation;
use unitopo_northbound::{Error, Operation};
use unitopo_utils::yang::DataNodeExt;
use unitopo_yang::{DataNode, DataPath, ListKey};

use crate::fixtures::*;

fn ethernet(name: &str, mtu: Option<u32>) -> (ListKey, DataNode) {
    interface(name, interface_config(name, ETHERNET, mtu))
}

fn lag(name: &str, min_links: u32) -> (ListKey, DataNode) {
    let (key, node) = interface(name, interface_config(name, LAG, None));
    (
        key,
        node.with_container(
            "Aggregation",
            DataNode::new().with_container(
                "Config",
                DataNode::new().with_leaf("min-links", min_links),
            ),
        ),
    )
}

fn with_filter(
    (key, node): (ListKey, DataNode),
    filter: DataNode,
) -> (ListKey, DataNode) {
    (key, node.with_container("Filter", filter))
}

#[test]
fn write_then_read_round_trip() {
    let log = CallLog::default();
    let plan = device_plan(&log);
    let transport = MemoryTransport::new();
    let tree = full_tree();

    plan.write_pass(&transport, &DataNode::new(), &tree).unwrap();

    assert_eq!(plan.read_pass(&transport).unwrap(), tree);
    assert_eq!(
        transport
            .config()
            .get(&instance_id(&"cust-a".into()).path)
            .and_then(|instance| instance.get_string("route-distinguisher"))
            .as_deref(),
        Some("1.14:10")
    );
}

#[test]
fn writes_follow_plan_order() {
    let log = CallLog::default();
    let plan = device_plan(&log);
    let transport = MemoryTransport::new();

    let applied = plan
        .write_pass(&transport, &DataNode::new(), &full_tree())
        .unwrap();

    assert_eq!(
        log.writes(),
        [
            ("interface", "create"),
            ("interface", "create"),
            ("interface-config", "create"),
            ("interface-config", "create"),
            ("aggregation", "create"),
            ("filter", "create"),
            ("subinterface", "create"),
            ("subinterface", "create"),
            ("default", "create"),
            ("vrf", "create"),
            ("l2p2p", "create"),
        ]
    );
    assert_eq!(applied.len(), 11);
    assert!(applied.iter().all(|op| op.operation == Operation::Create));
    assert_eq!(
        applied
            .iter()
            .filter_map(|op| op.candidate.as_deref())
            .collect::<Vec<_>>(),
        ["default", "vrf", "l2p2p"]
    );
}

#[test]
fn deletes_run_children_first() {
    let log = CallLog::default();
    let plan = device_plan(&log);
    let transport = MemoryTransport::new();
    let before = interfaces_tree(vec![with_filter(
        lag("ae1", 2),
        DataNode::new().with_leaf("input", "acl-in"),
    )]);
    plan.write_pass(&transport, &DataNode::new(), &before).unwrap();
    log.clear();

    plan.write_pass(&transport, &before, &DataNode::new()).unwrap();

    assert_eq!(
        log.writes(),
        [
            ("filter", "delete"),
            ("aggregation", "delete"),
            ("interface-config", "delete"),
            ("interface", "delete"),
        ]
    );
    assert!(
        transport
            .config()
            .get(&interface_id(&"ae1".into()).path)
            .is_none()
    );
}

#[test]
fn unchanged_tree_is_noop() {
    let log = CallLog::default();
    let plan = device_plan(&log);
    let transport = MemoryTransport::new();
    let tree = full_tree();
    plan.write_pass(&transport, &DataNode::new(), &tree).unwrap();
    log.clear();
    transport.clear_calls();

    let applied = plan.write_pass(&transport, &tree, &tree).unwrap();

    assert!(applied.is_empty());
    assert!(log.writes().is_empty());
    assert!(transport.calls().is_empty());
}

#[test]
fn dry_run_changes() {
    let plan = device_plan(&CallLog::default());
    let before =
        interfaces_tree(vec![ethernet("ge-0/0/0", None), lag("ae0", 1)]);
    let after = interfaces_tree(vec![
        ethernet("ge-0/0/0", Some(1500)),
        interface("ae0", interface_config("ae0", LAG, None)),
    ]);

    let changes = plan
        .changes(&before, &after)
        .unwrap()
        .into_iter()
        .map(|change| (change.operation, change.path))
        .collect::<Vec<_>>();
    assert_eq!(
        changes,
        [
            (
                Operation::Delete,
                path("Interfaces/Interface[ae0]/Aggregation/Config")
            ),
            (Operation::Update, path("Interfaces/Interface[ge-0/0/0]/Config")),
        ]
    );

    // Structural bindings never produce changes of their own.
    let changes = plan.changes(&DataNode::new(), &full_tree()).unwrap();
    assert!(changes.iter().all(|change| {
        plan.binding(&change.binding)
            .is_some_and(|binding| !binding.is_structural())
    }));
}

#[test]
fn update_adds_leaf() {
    let log = CallLog::default();
    let plan = device_plan(&log);
    let transport = MemoryTransport::new();
    let before = interfaces_tree(vec![ethernet("ge-0/0/0", None)]);
    plan.write_pass(&transport, &DataNode::new(), &before).unwrap();
    log.clear();

    let after = interfaces_tree(vec![ethernet("ge-0/0/0", Some(1500))]);
    let applied = plan.write_pass(&transport, &before, &after).unwrap();

    assert_eq!(log.writes(), [("interface-config", "update")]);
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].operation, Operation::Update);
    assert_eq!(plan.read_pass(&transport).unwrap(), after);

    // And removes it again.
    log.clear();
    plan.write_pass(&transport, &after, &before).unwrap();
    assert_eq!(log.writes(), [("interface-config", "update")]);
    assert_eq!(plan.read_pass(&transport).unwrap(), before);
}

#[test]
fn filter_direction_toggle() {
    let plan = device_plan(&CallLog::default());
    let transport = MemoryTransport::new();
    let both = DataNode::new()
        .with_leaf("input", "acl-in")
        .with_leaf("output", "acl-out");
    let ifc = || ethernet("ge-0/0/0", None);
    let before = interfaces_tree(vec![with_filter(ifc(), both.clone())]);
    plan.write_pass(&transport, &DataNode::new(), &before).unwrap();
    let filter = filter_id(&"ge-0/0/0".into());

    // Changing one direction merges, leaving the other one alone.
    transport.clear_calls();
    let changed = both.clone().with_leaf("input", "acl-in-v2");
    let after = interfaces_tree(vec![with_filter(ifc(), changed.clone())]);
    plan.write_pass(&transport, &before, &after).unwrap();
    assert_eq!(transport.mutations(), [(Mutation::Merge, filter.clone())]);
    assert_eq!(transport.config().get(&filter.path), Some(&changed));

    // Removing a direction rewrites the filter.
    transport.clear_calls();
    let input_only = changed.clone().without("output");
    let removed = interfaces_tree(vec![with_filter(ifc(), input_only.clone())]);
    plan.write_pass(&transport, &after, &removed).unwrap();
    assert_eq!(transport.mutations(), [(Mutation::Put, filter.clone())]);
    assert_eq!(transport.config().get(&filter.path), Some(&input_only));
}

#[test]
fn structural_nodes_reach_no_handler() {
    let log = CallLog::default();
    let plan = device_plan(&log);
    let transport = MemoryTransport::new();
    let ifc = ethernet("ge-0/0/0", None);
    let base = interfaces_tree(vec![ifc.clone()]);
    plan.write_pass(&transport, &DataNode::new(), &base).unwrap();
    log.clear();
    transport.clear_calls();

    let after = interfaces_tree(vec![(
        ifc.0,
        ifc.1.with_container(
            "Subinterfaces",
            DataNode::new().with_entry(
                "Subinterface",
                5u64,
                subinterface(5, "voice", 50),
            ),
        ),
    )]);
    plan.write_pass(&transport, &base, &after).unwrap();

    assert_eq!(log.writes(), [("subinterface", "create")]);
    assert_eq!(
        transport.mutations(),
        [(Mutation::Put, unit_id(&"ge-0/0/0".into(), 5))]
    );
}

#[test]
fn missing_writer() {
    let log = CallLog::default();
    let mut bindings = interface_bindings(&log);
    bindings.extend(acl_bindings(&log));
    let plan = plan(bindings);
    let transport = MemoryTransport::new();

    // Reader-only binding.
    let after = DataNode::new().with_container(
        "Acl",
        DataNode::new().with_container(
            "Interfaces",
            DataNode::new().with_entry(
                "Interface",
                "ge-0/0/0",
                DataNode::new().with_leaf("id", "ge-0/0/0"),
            ),
        ),
    );
    let failure = plan
        .write_pass(&transport, &DataNode::new(), &after)
        .unwrap_err();
    assert!(matches!(
        &failure.error,
        Error::NoWriter(path)
            if path.to_string().contains("Acl/Interfaces/Interface")
    ));
    assert!(failure.applied.is_empty());

    // Data nobody is bound to.
    let after = DataNode::new().with_container(
        "Qos",
        DataNode::new().with_leaf("enabled", true),
    );
    assert!(matches!(
        plan.changes(&DataNode::new(), &after),
        Err(Error::NoWriter(path)) if path == DataPath::root().child("Qos")
    ));

    // Leaf below a structural node.
    let after = DataNode::new().with_container(
        "Interfaces",
        DataNode::new().with_leaf("description", "all"),
    );
    assert!(matches!(
        plan.changes(&DataNode::new(), &after),
        Err(Error::NoWriter(path))
            if path == DataPath::root().child("Interfaces")
    ));
    assert!(transport.mutations().is_empty());
}

#[test]
fn handler_validation_aborts_pass() {
    let log = CallLog::default();
    let plan = device_plan(&log);
    let transport = MemoryTransport::new();

    // Aggregation settings on an ethernet interface.
    let (key, node) =
        interface("ge-0/0/2", interface_config("ge-0/0/2", ETHERNET, None));
    let node = node.with_container(
        "Aggregation",
        DataNode::new().with_container(
            "Config",
            DataNode::new().with_leaf("min-links", 1u32),
        ),
    );
    let after = interfaces_tree(vec![(key, node)]);

    let failure = plan
        .write_pass(&transport, &DataNode::new(), &after)
        .unwrap_err();

    assert!(matches!(failure.error, Error::Validation { .. }));
    assert_eq!(failure.applied.len(), 2);
    assert_eq!(
        log.writes().last(),
        Some(&("aggregation", "create"))
    );
}
