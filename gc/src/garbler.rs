//! The garbler's side of the two-party protocol, with progress reporting
//! via `indicatif`.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::config::GarbleConfig;
use crate::constants::PROGRESS_UPDATE_INTERVAL;
use crate::ot::{garbler_ot, key_bits_for_label_width};
use crate::transport::{receive, send, wait_for_ack};

/// A plain (non-OT) label transfer: bytes plus the pp_bit the evaluator
/// needs to index garbled tables. `represents` never crosses the wire.
#[derive(Serialize, Deserialize)]
pub(crate) struct LabelWire {
    pub(crate) bytes: Vec<u8>,
    pub(crate) pp_bit: Option<bool>,
}

/// Run the garbler role: accept one connection, garble `circuit_source`,
/// exchange input labels, send the sanitized circuit, and learn the final
/// boolean output.
///
/// `garbler_inputs` must already hold a bit for every identifier the
/// garbler owns (collecting those bits, interactively or otherwise, is an
/// external concern handled entirely by the caller, e.g. `gc-cli`). Any
/// identifier not present is assumed evaluator-owned and is
/// transferred via oblivious transfer instead.
pub fn run_garbler(
    address: &str,
    circuit_source: &str,
    garbler_inputs: &HashMap<String, bool>,
    config: GarbleConfig,
) -> Result<bool> {
    let listener = TcpListener::bind(address).with_context(|| format!("failed to bind {address}"))?;
    run_garbler_on_listener(listener, circuit_source, garbler_inputs, config)
}

/// Same as [`run_garbler`] but against an already-bound listener. Lets a
/// caller bind to `127.0.0.1:0`, read back the OS-assigned port via
/// `TcpListener::local_addr`, and hand that address to an evaluator — the
/// shape every end-to-end test in `gc-integration-tests` needs to avoid
/// colliding on a fixed port.
pub fn run_garbler_on_listener(
    listener: TcpListener,
    circuit_source: &str,
    garbler_inputs: &HashMap<String, bool>,
    config: GarbleConfig,
) -> Result<bool> {
    let (mut stream, _peer) = listener.accept().context("failed to accept evaluator connection")?;
    garble_and_run(&mut stream, circuit_source, garbler_inputs, config)
}

pub(crate) fn garble_and_run<S: Read + Write>(
    stream: &mut S,
    circuit_source: &str,
    garbler_inputs: &HashMap<String, bool>,
    config: GarbleConfig,
) -> Result<bool> {
    let mut rng = crate::config::rng_from_os_entropy();
    let circuit = Circuit::build(circuit_source, &mut rng, config).context("failed to parse and garble circuit")?;

    let input_wires = circuit.input_wires();
    let identifiers: Vec<String> = input_wires
        .iter()
        .map(|w| w.borrow().identifier.clone().ok_or_else(|| anyhow!("input wire missing identifier")))
        .collect::<Result<_>>()?;

    send(stream, &identifiers)?;
    wait_for_ack(stream)?;

    let progress = if identifiers.len() as u32 >= PROGRESS_UPDATE_INTERVAL {
        let bar = ProgressBar::new(identifiers.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} transferring input labels [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };

    let key_bits = key_bits_for_label_width(config.num_bytes);

    for (i, wire) in input_wires.iter().enumerate() {
        let identifier = identifiers[i].clone();
        if let Some(&bit) = garbler_inputs.get(&identifier) {
            // Garbler owns this identifier: hand the evaluator the single
            // label representing our bit directly.
            send(stream, &true)?;
            let label = wire.borrow().get(bit).clone();
            send(
                stream,
                &LabelWire {
                    bytes: label.bytes().to_vec(),
                    pp_bit: label.pp_bit(),
                },
            )?;
            wait_for_ack(stream)?;
        } else {
            // Evaluator owns this identifier: it picks its label via OT so
            // we never learn which one it chose.
            send(stream, &false)?;
            let (false_label, true_label) = {
                let w = wire.borrow();
                let (f, t) = w.labels();
                (f.clone(), t.clone())
            };
            garbler_ot(stream, &mut rng, false_label.bytes(), true_label.bytes(), key_bits)?;
        }
        if let Some(bar) = &progress {
            bar.set_position((i + 1) as u64);
        }
    }
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    let sanitized = circuit.sanitize().context("failed to sanitize circuit for transmission")?;
    send(stream, &sanitized)?;

    let final_label: LabelWire = receive(stream)?;
    let root_true_label = circuit.root.gate().output.borrow().get(true).to_base64();
    let final_base64 = crate::label::Label::from_bytes(final_label.bytes, None).to_base64();
    let output = final_base64 == root_true_label;

    send(stream, &output)?;
    Ok(output)
}
