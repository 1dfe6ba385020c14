//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use unitopo_northbound::testing::MemoryTransport;
use unitopo_northbound::{
    CheckContext, CompositeWriter, Error, HandlerBinding, NoopWriter,
    Operation, UnderlayAccess, WriteOutcome, Writer,
};
use unitopo_utils::yang::DataNodeExt;
use unitopo_yang::{DataNode, DataPath};

use crate::fixtures::*;

fn instances(instances: Vec<DataNode>) -> DataNode {
    let list = instances.into_iter().fold(DataNode::new(), |list, instance| {
        let name = instance.get_string("name").unwrap_or_default();
        list.with_entry("NetworkInstance", name, instance)
    });
    DataNode::new().with_container("NetworkInstances", list)
}

fn vrf(name: &str, rd: &str) -> DataNode {
    network_instance(
        name,
        DataNode::new()
            .with_leaf("type", L3VRF)
            .with_leaf("route-distinguisher", rd),
    )
}

fn default_instance() -> DataNode {
    network_instance(
        "default",
        DataNode::new().with_leaf("type", DEFAULT_INSTANCE),
    )
}

fn l2p2p(name: &str) -> DataNode {
    network_instance(name, DataNode::new().with_leaf("type", L2P2P))
}

// Writer accepting only interfaces with a description.
struct DescribedOnly;

impl Writer for DescribedOnly {
    fn create(
        &self,
        _underlay: &UnderlayAccess<'_>,
        _path: &DataPath,
        after: &DataNode,
    ) -> Result<WriteOutcome, Error> {
        if after.contains("description") {
            Ok(WriteOutcome::Handled)
        } else {
            Ok(WriteOutcome::NotHandled)
        }
    }

    fn delete(
        &self,
        _underlay: &UnderlayAccess<'_>,
        _path: &DataPath,
        _before: &DataNode,
    ) -> Result<WriteOutcome, Error> {
        Ok(WriteOutcome::NotHandled)
    }
}

#[test]
fn default_only_instance() {
    let log = CallLog::default();
    let plan = plan(network_instance_bindings(&log));
    let transport = MemoryTransport::new();
    let tree = instances(vec![default_instance()]);

    let applied = plan
        .write_pass(&transport, &DataNode::new(), &tree)
        .unwrap();

    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].candidate.as_deref(), Some("default"));
    assert_eq!(log.handlers(), ["default"]);
    assert!(transport.mutations().is_empty());

    log.clear();
    assert_eq!(plan.read_pass(&transport).unwrap(), tree);
    assert_eq!(log.handlers(), ["default"]);
}

#[test]
fn type_change_switches_candidate() {
    let log = CallLog::default();
    let plan = plan(network_instance_bindings(&log));
    let transport = MemoryTransport::new();
    let before = instances(vec![default_instance(), vrf("blue", "100:1")]);
    plan.write_pass(&transport, &DataNode::new(), &before).unwrap();
    log.clear();

    let after = instances(vec![default_instance(), l2p2p("blue")]);
    let applied = plan.write_pass(&transport, &before, &after).unwrap();

    assert_eq!(log.writes(), [("vrf", "delete"), ("l2p2p", "create")]);
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].operation, Operation::Update);
    assert_eq!(applied[0].candidate.as_deref(), Some("l2p2p"));
    assert_eq!(
        transport
            .config()
            .get(&instance_id(&"blue".into()).path)
            .and_then(|instance| instance.get_string("instance-type"))
            .as_deref(),
        Some("l2vpn")
    );
    assert_eq!(plan.read_pass(&transport).unwrap(), after);
}

#[test]
fn same_candidate_update() {
    let log = CallLog::default();
    let plan = plan(network_instance_bindings(&log));
    let transport = MemoryTransport::new();
    let before = instances(vec![vrf("blue", "100:1")]);
    plan.write_pass(&transport, &DataNode::new(), &before).unwrap();
    log.clear();

    let after = instances(vec![vrf("blue", "4200000000:7")]);
    plan.write_pass(&transport, &before, &after).unwrap();

    assert_eq!(log.writes(), [("vrf", "update")]);
    assert_eq!(
        transport
            .config()
            .get(&instance_id(&"blue".into()).path)
            .and_then(|instance| instance.get_string("route-distinguisher"))
            .as_deref(),
        Some("64086.59904:7")
    );
}

#[test]
fn unknown_type_is_dropped() {
    let log = CallLog::default();
    let plan = plan(network_instance_bindings(&log));
    let transport = MemoryTransport::new();
    let after = instances(vec![network_instance(
        "mgmt",
        DataNode::new().with_leaf("type", "L2VSI"),
    )]);

    let applied = plan
        .write_pass(&transport, &DataNode::new(), &after)
        .unwrap();

    assert!(applied.is_empty());
    assert!(log.writes().is_empty());
    assert!(transport.mutations().is_empty());
}

#[test]
fn type_change_to_unknown_reports_delete() {
    let log = CallLog::default();
    let plan = plan(network_instance_bindings(&log));
    let transport = MemoryTransport::new();
    let before = instances(vec![vrf("blue", "100:1")]);
    plan.write_pass(&transport, &DataNode::new(), &before).unwrap();
    log.clear();

    let after = instances(vec![network_instance(
        "blue",
        DataNode::new().with_leaf("type", "L2VSI"),
    )]);
    let applied = plan.write_pass(&transport, &before, &after).unwrap();

    // The old candidate removed the instance and nothing recreated it.
    assert_eq!(log.writes(), [("vrf", "delete")]);
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].operation, Operation::Delete);
    assert_eq!(applied[0].candidate.as_deref(), Some("vrf"));
    assert!(
        transport
            .config()
            .get(&instance_id(&"blue".into()).path)
            .is_none()
    );
}

#[test]
fn mixed_candidates_keep_written_order() {
    let log = CallLog::default();
    let plan = plan(network_instance_bindings(&log));
    let transport = MemoryTransport::new();
    let tree = instances(vec![
        default_instance(),
        l2p2p("pw-9"),
        vrf("blue", "100:1"),
        l2p2p("pw-1"),
    ]);

    plan.write_pass(&transport, &DataNode::new(), &tree).unwrap();

    assert_eq!(plan.read_pass(&transport).unwrap(), tree);
}

#[test]
fn fallback_to_next_accepting_candidate() {
    let writer = CompositeWriter::new()
        .candidate(
            "described",
            |_: &CheckContext<'_>| Ok(true),
            DescribedOnly,
        )
        .candidate(
            "generic",
            |ctx: &CheckContext<'_>| {
                let key = ctx.path.last_key();
                Ok(key.is_some_and(|key| key.as_str() != Some("lo0")))
            },
            NoopWriter,
        );
    let plan = plan(vec![
        HandlerBinding::structural("Interfaces"),
        HandlerBinding::list("Interfaces/Interface").composite_writer(writer),
    ]);
    let transport = MemoryTransport::new();
    let entry = |description: Option<&str>| match description {
        Some(description) => {
            DataNode::new().with_leaf("description", description)
        }
        None => DataNode::new(),
    };
    let after = DataNode::new().with_container(
        "Interfaces",
        DataNode::new()
            .with_entry("Interface", "eth0", entry(None))
            .with_entry("Interface", "eth1", entry(Some("core")))
            .with_entry("Interface", "lo0", entry(None)),
    );

    let applied = plan
        .write_pass(&transport, &DataNode::new(), &after)
        .unwrap();

    // lo0 is rejected by every candidate and silently skipped.
    assert_eq!(
        applied
            .iter()
            .map(|op| {
                let name = op.path.last_key().unwrap().to_string();
                (name, op.candidate.clone())
            })
            .collect::<Vec<_>>(),
        [
            ("eth0".to_owned(), Some("generic".to_owned())),
            ("eth1".to_owned(), Some("described".to_owned())),
        ]
    );
}
