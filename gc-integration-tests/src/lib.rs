//! Test-only harness for driving a matching garbler/evaluator pair over a
//! real loopback TCP socket, exactly as two separate processes would.
//!
//! A dedicated `[[test]]` target driving garbler/evaluator parties together
//! over real sockets, rather than folding network tests into `gc`'s own
//! `#[cfg(test)]` modules.

use std::collections::HashMap;
use std::net::TcpListener;
use std::thread;

use anyhow::Result;
use gc::config::GarbleConfig;

/// Run one garbler/evaluator pair to completion over loopback TCP and
/// return `(garbler_output, evaluator_output)`. Binds to an OS-assigned
/// port so concurrently-running tests never collide.
pub fn run_end_to_end(
    circuit_source: &'static str,
    config: GarbleConfig,
    garbler_inputs: HashMap<String, bool>,
    evaluator_inputs: HashMap<String, bool>,
) -> Result<(bool, bool)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let address = listener.local_addr()?.to_string();

    let garbler_thread = thread::spawn(move || gc::garbler::run_garbler_on_listener(listener, circuit_source, &garbler_inputs, config));

    let mut resolver = move |identifier: &str| -> Result<bool> {
        evaluator_inputs
            .get(identifier)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("test fixture supplies no bit for evaluator-owned identifier '{identifier}'"))
    };
    let evaluator_output = gc::evaluator::run_evaluator(&address, &mut resolver, config)?;
    let garbler_output = garbler_thread.join().expect("garbler thread panicked")?;

    Ok((garbler_output, evaluator_output))
}

/// [`run_end_to_end`], asserting both parties agree and returning the
/// shared boolean.
pub fn run_and_assert_agreement(
    circuit_source: &'static str,
    config: GarbleConfig,
    garbler_inputs: HashMap<String, bool>,
    evaluator_inputs: HashMap<String, bool>,
) -> bool {
    let (garbler_output, evaluator_output) = run_end_to_end(circuit_source, config, garbler_inputs, evaluator_inputs).unwrap();
    assert_eq!(
        garbler_output, evaluator_output,
        "garbler and evaluator disagreed on the circuit's output — desynchronized garbling state"
    );
    garbler_output
}

/// The tree `((A AND B) AND (C XOR D)) AND (E XOR F)` used by the
/// concrete end-to-end scenarios below.
pub const SIMPLE2_CIRCUIT: &str = "((A AND B) AND (C XOR D)) AND (E XOR F)";

/// All six optimizations, for tests that sweep every variant.
pub const ALL_OPTIMIZATIONS: [gc::config::Optimization; 6] = [
    gc::config::Optimization::Classical,
    gc::config::Optimization::PointAndPermute,
    gc::config::Optimization::Grr3,
    gc::config::Optimization::FreeXor,
    gc::config::Optimization::FleXor,
    gc::config::Optimization::HalfGates,
];
