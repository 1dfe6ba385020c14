//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use unitopo_northbound::config::Config;
use unitopo_northbound::testing::{MemoryTransport, TransportOp};
use unitopo_northbound::{
    Error, OrderedPlan, RollbackOutcome, RollbackPolicy, WriteFailure,
};
use unitopo_yang::{DataNode, DataPath, ListKey};

use crate::fixtures::*;

fn compensating_plan(log: &CallLog) -> OrderedPlan {
    let mut config = Config::default();
    config.write.rollback = RollbackPolicy::Compensate;
    let mut bindings = interface_bindings(log);
    bindings.extend(network_instance_bindings(log));
    plan_with(bindings, &config)
}

// Changes the MTU of ge-0/0/0 and adds the ae2 LAG. The aggregation write of
// ae2 fails after the interface writes went through.
fn failing_pass(
    plan: &OrderedPlan,
    transport: &MemoryTransport,
) -> WriteFailure {
    let before = plan.read_pass(transport).unwrap();
    let config_path: DataPath =
        "Interfaces/Interface[ge-0/0/0]/Config".parse().unwrap();
    let config = before
        .get(&config_path)
        .unwrap()
        .clone()
        .with_leaf("mtu", 1500u32);
    let (_, ae2) = interface("ae2", interface_config("ae2", LAG, None));
    let ae2 = ae2.with_container(
        "Aggregation",
        DataNode::new().with_container(
            "Config",
            DataNode::new().with_leaf("min-links", 3u32),
        ),
    );
    let after = before
        .replace_at(&config_path, Some(&config))
        .replace_at(&"Interfaces/Interface[ae2]".parse().unwrap(), Some(&ae2));

    transport.fail_on(TransportOp::Put, aggregation_id(&"ae2".into()));
    plan.write_pass(transport, &before, &after).unwrap_err()
}

#[test]
fn compensate_restores_vendor_data() {
    let plan = compensating_plan(&CallLog::default());
    let transport = MemoryTransport::new().with_config(vendor_tree());
    let ae2 = ListKey::from("ae2");

    let failure = failing_pass(&plan, &transport);

    match &failure.error {
        Error::UnderlayWrite { id, .. } => {
            assert_eq!(*id, aggregation_id(&ae2))
        }
        error => panic!("unexpected error: {error}"),
    }
    assert_eq!(failure.applied.len(), 3);
    let RollbackOutcome::Restored(restored) = &failure.rollback else {
        panic!("unexpected rollback outcome: {:?}", failure.rollback);
    };
    assert_eq!(
        *restored,
        [
            aggregation_id(&ae2),
            interface_id(&"ge-0/0/0".into()),
            interface_id(&ae2),
        ]
    );
    assert_eq!(transport.config(), vendor_tree());
}

#[test]
fn no_rollback_by_default() {
    let log = CallLog::default();
    let plan = device_plan(&log);
    let transport = MemoryTransport::new().with_config(vendor_tree());

    let failure = failing_pass(&plan, &transport);

    assert!(matches!(failure.rollback, RollbackOutcome::NotAttempted));
    assert_eq!(failure.applied.len(), 3);
    let config = transport.config();
    assert!(config.get(&interface_id(&"ae2".into()).path).is_some());
    assert_eq!(
        config
            .get(&interface_id(&"ge-0/0/0".into()).path)
            .and_then(|entry| entry.leaf("mtu"))
            .and_then(|mtu| mtu.as_u64()),
        Some(1500)
    );
}

#[test]
fn failed_rollback_reported() {
    let plan = compensating_plan(&CallLog::default());
    let transport = MemoryTransport::new().with_config(vendor_tree());
    transport.fail_on(TransportOp::Delete, interface_id(&"ae2".into()));

    let failure = failing_pass(&plan, &transport);

    let RollbackOutcome::Failed { restored, error } = &failure.rollback else {
        panic!("unexpected rollback outcome: {:?}", failure.rollback);
    };
    assert_eq!(restored.len(), 2);
    assert!(matches!(**error, Error::UnderlayWrite { .. }));
}
