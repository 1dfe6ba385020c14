//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::Arc;
use std::thread;

use unitopo_northbound::testing::MemoryTransport;
use unitopo_yang::DataNode;

use crate::fixtures::*;

const THREADS: usize = 4;

#[test]
fn shared_plan_concurrent_reads() {
    let plan = Arc::new(device_plan(&CallLog::default()));
    let expected = plan
        .read_pass(&MemoryTransport::new().with_config(vendor_tree()))
        .unwrap();

    let handles = (0..THREADS)
        .map(|_| {
            let plan = Arc::clone(&plan);
            thread::spawn(move || {
                let transport =
                    MemoryTransport::new().with_config(vendor_tree());
                plan.read_pass(&transport).unwrap()
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn shared_plan_concurrent_writes() {
    let plan = device_plan(&CallLog::default());
    let tree = full_tree();

    let transports = (0..THREADS)
        .map(|_| Arc::new(MemoryTransport::new()))
        .collect::<Vec<_>>();
    thread::scope(|scope| {
        for transport in &transports {
            let (plan, tree) = (&plan, &tree);
            scope.spawn(move || {
                plan.write_pass(transport.as_ref(), &DataNode::new(), tree)
                    .unwrap();
            });
        }
    });

    let first = transports[0].config();
    for transport in &transports {
        assert_eq!(transport.config(), first);
        assert_eq!(plan.read_pass(transport.as_ref()).unwrap(), tree);
    }
}
