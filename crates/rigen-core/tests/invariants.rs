//! Invariants for the registry, range partition, and chain builder.
//!
//! These tests drive the model pieces with arbitrary operation sequences and
//! check the properties the trace relies on:
//! - at least one live node at all times,
//! - recycling hands out the smallest tombstone,
//! - compaction never leaves a tombstone at or above `num_nodes`,
//! - every partition covers `[1, max_val]` exactly, and
//! - closed chains never contain duplicates.

use proptest::prelude::*;
use rigen_core::{
    wiring, ChainBuilder, ChainEvent, Closure, DeleteOutcome, Instruction, Lfsr, NodeId,
    NodeRegistry, OpClass, Ranges,
};

#[derive(Clone, Debug)]
enum Op {
    Create,
    Delete(NodeId),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Create), (0u32..64).prop_map(Op::Delete)]
}

#[track_caller]
fn check_registry(r: &NodeRegistry) {
    assert!(r.live_count() >= 1, "no live node left");
    assert!(
        r.tombstoned().all(|id| id < r.num_nodes()),
        "tombstone at or above num_nodes"
    );
    if r.num_nodes() > 0 {
        assert!(r.is_live(r.num_nodes() - 1), "top slot left tombstoned");
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn registry_invariants_hold(initial in 1u32..32, ops in prop::collection::vec(arb_op(), 0..200)) {
        let mut r = NodeRegistry::new(initial).unwrap();
        check_registry(&r);

        for op in ops {
            match op {
                Op::Create => {
                    let smallest = r.tombstoned().next();
                    let before = r.num_nodes();
                    let a = r.allocate();
                    match smallest {
                        Some(id) => {
                            prop_assert_eq!(a.id, id);
                            prop_assert!(!a.grew);
                        }
                        None => {
                            prop_assert_eq!(a.id, before);
                            prop_assert!(a.grew);
                        }
                    }
                }
                Op::Delete(id) => {
                    let id = id % r.num_nodes();
                    let snapshot = r.clone();
                    match r.tombstone(id) {
                        DeleteOutcome::Deleted { compacted_from } => {
                            prop_assert!(!r.is_live(id));
                            if let Some(prev) = compacted_from {
                                prop_assert!(r.num_nodes() < prev);
                            }
                        }
                        DeleteOutcome::AlreadyDeleted
                        | DeleteOutcome::LastLiveNode
                        | DeleteOutcome::OutOfRange => {
                            prop_assert_eq!(&r, &snapshot);
                        }
                    }
                }
            }
            check_registry(&r);
        }
    }

    #[test]
    fn partition_is_complete(
        feed in 2u64..=0x1_0000,
        create in 0.0f64..=0.5,
        delete in 0.0f64..=0.5,
        nodes in 1u32..512,
    ) {
        let lfsr = Lfsr::new(feed, 1).unwrap();
        if let Ok(r) = Ranges::compute(lfsr.max_val(), create, delete, nodes) {
            prop_assert_eq!(r.total(), lfsr.max_val());
            prop_assert!(r.chain > 0);
            prop_assert_eq!(r.chain % u64::from(nodes), 0);
            for prnum in 1..=lfsr.max_val().min(4096) {
                match r.classify(prnum) {
                    OpClass::Unknown => prop_assert!(false, "draw {} fell outside all ranges", prnum),
                    OpClass::Chain(id) => prop_assert!(id < nodes),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn closed_chains_have_no_duplicates(draws in prop::collection::vec(0u32..8, 0..100)) {
        let r = NodeRegistry::new(8).unwrap();
        let mut b = ChainBuilder::new();
        for id in draws {
            if let ChainEvent::Closed(Closure::Finalized(chain)) = b.push(id, &r) {
                let mut sorted = chain.clone();
                sorted.sort_unstable();
                sorted.dedup();
                prop_assert_eq!(sorted.len(), chain.len());
                prop_assert!(chain.len() >= 2);

                let w = wiring(&chain);
                prop_assert_eq!(w.len(), chain.len());
                let producer_is_first = matches!(w.first(), Some(Instruction::Producer { .. }));
                let consumer_is_last = matches!(w.last(), Some(Instruction::Consumer { .. }));
                prop_assert!(producer_is_first);
                prop_assert!(consumer_is_last);
            }
        }
    }
}
