//! Model-based property tests.
//!
//! proptest supplies raw bytes, `arbitrary` turns them into an operation
//! sequence, and the cluster runs it with invariants checked after every
//! step.
//!
//! ```text
//! proptest bytes ─► Vec<Operation> ─► SimCluster::apply ─► InvariantRegistry
//! ```

use std::time::Duration;

use arbitrary::Unstructured;
use bluechat_harness::{InvariantRegistry, Operation, SimCluster, SmallText};
use bluechat_proto::DeliveryStatus;
use proptest::prelude::*;

fn operations(bytes: &[u8]) -> Vec<Operation> {
    Unstructured::new(bytes).arbitrary().unwrap_or_default()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: no operation sequence breaks an invariant.
    #[test]
    fn prop_invariants_hold(seed in any::<u64>(), bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let registry = InvariantRegistry::standard();
        let mut cluster = SimCluster::new(seed, 3).unwrap();

        for (step, op) in operations(&bytes).iter().enumerate() {
            let _ = cluster.apply(op);
            if let Err(violations) = registry.check_all(&cluster.snapshot()) {
                prop_assert!(false, "step {step} {op:?}: {violations:?}");
            }
        }

        cluster.apply(&Operation::Deliver).unwrap();
        if let Err(violations) = registry.check_all(&cluster.snapshot()) {
            prop_assert!(false, "after final delivery: {violations:?}");
        }
    }

    /// Property: a run is fully determined by its seed and operations.
    #[test]
    fn prop_runs_are_reproducible(seed in any::<u64>(), bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let ops = operations(&bytes);
        let run = || {
            let mut cluster = SimCluster::new(seed, 3).unwrap();
            let results: Vec<bool> = ops.iter().map(|op| cluster.apply(op).is_ok()).collect();
            (results, format!("{:?}", cluster.snapshot()))
        };

        prop_assert_eq!(run(), run());
    }

    /// Property: on a healthy medium every accepted message is delivered.
    #[test]
    fn prop_healthy_medium_delivers_everything(
        seed in any::<u64>(),
        sends in prop::collection::vec((0u8..3, 0u8..3, any::<u8>()), 1..24),
    ) {
        let mut cluster = SimCluster::new(seed, 3).unwrap();
        cluster.power_on_all();
        for i in 0..3 {
            for j in 0..3 {
                if i != j {
                    let _ = cluster.apply(&Operation::Connect { node: i, peer: j });
                }
            }
        }

        let mut accepted = Vec::new();
        for (node, peer, text) in sends {
            let op = Operation::Send { node, peer, text: SmallText(text) };
            if cluster.apply(&op).is_ok() {
                accepted.push((usize::from(node), usize::from(peer)));
            }
        }
        cluster.deliver_all();

        for (from, to) in accepted {
            let me = cluster.id(from);
            let session = cluster.node(from).session(cluster.id(to)).unwrap();
            let outbound: Vec<_> = session.messages.iter().filter(|m| m.sender_id == me).collect();
            prop_assert!(!outbound.is_empty());
            prop_assert!(outbound.iter().all(|m| m.status == DeliveryStatus::Delivered));
        }
    }

    /// Property: unread counts equal messages received while out of view.
    #[test]
    fn prop_unread_counts_messages_out_of_view(seed in any::<u64>(), count in 1u32..12) {
        let mut cluster = SimCluster::new(seed, 2).unwrap();
        cluster.power_on_all();
        let (ana, bia) = (cluster.id(0), cluster.id(1));
        cluster.node_mut(0).connect(bia).unwrap();

        for n in 0..count {
            cluster.node_mut(0).send_text(bia, &format!("m{n}")).unwrap();
            cluster.advance(Duration::from_millis(10));
        }
        cluster.deliver_all();

        let session = cluster.node(1).session(ana).unwrap();
        prop_assert_eq!(session.unread_count, count);
        prop_assert_eq!(session.messages.len(), count as usize);
    }
}
