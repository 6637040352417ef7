//! Fuzz target for whole-cluster operation sequences
//!
//! Runs arbitrary operation sequences against a three-node simulated cluster
//! and checks every standard invariant after each step.
//!
//! # Invariants
//!
//! - Applying an operation NEVER panics; rejections are errors
//! - Every standard invariant holds after every step

#![no_main]

use arbitrary::Arbitrary;
use bluechat_harness::{InvariantRegistry, Operation, SimCluster};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Scenario {
    seed: u64,
    operations: Vec<Operation>,
}

fuzz_target!(|scenario: Scenario| {
    let registry = InvariantRegistry::standard();
    let mut cluster = SimCluster::new(scenario.seed, 3).expect("cluster starts");

    for (step, op) in scenario.operations.iter().enumerate() {
        let _ = cluster.apply(op);
        registry.assert_all(&cluster.snapshot(), &format!("at step {step} ({op:?})"));
    }
});
