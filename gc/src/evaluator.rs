//! The evaluator's side of the two-party protocol. Mirrors `garbler.rs`'s
//! transport and progress-reporting idiom for the opposite role.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

use crate::circuit::SanitizedNode;
use crate::config::GarbleConfig;
use crate::constants::PROGRESS_UPDATE_INTERVAL;
use crate::garbler::LabelWire;
use crate::label::Label;
use crate::ot::{evaluator_ot, key_bits_for_label_width};
use crate::transport::{receive, send, send_ack, wait_for_ack};

/// How many times to retry a connection before giving up, and the delay
/// between attempts. The garbler binds and accepts first, so a freshly
/// started evaluator commonly races it by a few hundred milliseconds.
const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(250);

fn connect_with_retry(address: &str) -> Result<TcpStream> {
    let mut last_err = None;
    for _ in 0..CONNECT_ATTEMPTS {
        match TcpStream::connect(address) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                last_err = Some(e);
                std::thread::sleep(CONNECT_RETRY_DELAY);
            }
        }
    }
    Err(last_err.unwrap()).with_context(|| format!("failed to connect to garbler at {address}"))
}

/// Run the evaluator role: connect to the garbler, resolve every input
/// wire's bit via `resolve_input`, reconstruct the sanitized circuit, and
/// report the final boolean back to the garbler.
///
/// `resolve_input` is called once per identifier the evaluator itself owns
/// (the garbler's owned identifiers arrive as plain labels and never need
/// resolving). Interactive prompting stays outside this library;
/// `gc-cli` supplies a closure that checks pre-parsed flags before falling
/// back to an interactive y/n + 0/1 prompt.
pub fn run_evaluator(address: &str, resolve_input: &mut dyn FnMut(&str) -> Result<bool>, config: GarbleConfig) -> Result<bool> {
    let mut stream = connect_with_retry(address)?;
    evaluate(&mut stream, resolve_input, config)
}

fn evaluate<S: Read + Write>(
    stream: &mut S,
    resolve_input: &mut dyn FnMut(&str) -> Result<bool>,
    config: GarbleConfig,
) -> Result<bool> {
    let mut rng = crate::config::rng_from_os_entropy();

    let identifiers: Vec<String> = receive(stream).context("receiving input identifier list")?;
    send_ack(stream)?;

    let progress = if identifiers.len() as u32 >= PROGRESS_UPDATE_INTERVAL {
        let bar = ProgressBar::new(identifiers.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} receiving input labels [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };

    let key_bits = key_bits_for_label_width(config.num_bytes);
    let mut labels: VecDeque<Label> = VecDeque::with_capacity(identifiers.len());

    for (i, identifier) in identifiers.iter().enumerate() {
        let garbler_owned: bool = receive(stream).context("receiving label-transfer mode flag")?;
        if garbler_owned {
            let wire: LabelWire = receive(stream).context("receiving plain input label")?;
            send_ack(stream)?;
            labels.push_back(Label::from_bytes(wire.bytes, wire.pp_bit));
        } else {
            let bit = resolve_input(identifier).with_context(|| format!("resolving input bit for '{identifier}'"))?;
            let bytes = evaluator_ot(stream, &mut rng, bit).context("running oblivious transfer")?;
            labels.push_back(Label::from_bytes(bytes, None));
        }
        if let Some(bar) = &progress {
            bar.set_position((i + 1) as u64);
        }
    }
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    let sanitized: SanitizedNode = receive(stream).context("receiving sanitized circuit")?;
    let final_label = sanitized.reconstruct(&config, &mut labels).context("reconstructing circuit output label")?;

    send(
        stream,
        &LabelWire {
            bytes: final_label.bytes().to_vec(),
            pp_bit: final_label.pp_bit(),
        },
    )
    .context("sending final output label")?;

    let output: bool = receive(stream).context("receiving final boolean output")?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::config::Optimization;
    use std::collections::HashMap;
    use std::sync::mpsc::{Receiver, Sender, channel};
    use std::thread;

    struct ChannelStream {
        tx: Sender<Vec<u8>>,
        rx: Receiver<Vec<u8>>,
        pending: Vec<u8>,
    }

    impl Read for ChannelStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            while self.pending.len() < buf.len() {
                match self.rx.recv() {
                    Ok(chunk) => self.pending.extend_from_slice(&chunk),
                    Err(_) => break,
                }
            }
            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }
    }
    impl Write for ChannelStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.tx.send(buf.to_vec()).map_err(|_| std::io::Error::other("peer gone"))?;
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn duplex() -> (ChannelStream, ChannelStream) {
        let (a_to_b, b_from_a) = channel();
        let (b_to_a, a_from_b) = channel();
        (
            ChannelStream { tx: a_to_b, rx: a_from_b, pending: Vec::new() },
            ChannelStream { tx: b_to_a, rx: b_from_a, pending: Vec::new() },
        )
    }

    fn run_pair(circuit_source: &'static str, config: GarbleConfig, garbler_bits: HashMap<String, bool>, evaluator_bits: HashMap<String, bool>) -> bool {
        let (mut garbler_stream, mut evaluator_stream) = duplex();

        let garbler_thread =
            thread::spawn(move || crate::garbler::garble_and_run(&mut garbler_stream, circuit_source, &garbler_bits, config));

        let mut resolver = move |identifier: &str| -> Result<bool> {
            evaluator_bits
                .get(identifier)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("test fixture missing bit for '{identifier}'"))
        };
        let evaluator_result = evaluate(&mut evaluator_stream, &mut resolver, config).unwrap();
        let garbler_result = garbler_thread.join().unwrap().unwrap();
        assert_eq!(garbler_result, evaluator_result);
        evaluator_result
    }

    #[test]
    fn classical_and_gate_evaluates_true_when_both_inputs_true() {
        let config = GarbleConfig::new(Optimization::Classical);
        let garbler_bits = HashMap::from([("A".to_string(), true)]);
        let evaluator_bits = HashMap::from([("B".to_string(), true)]);
        assert!(run_pair("A AND B", config, garbler_bits, evaluator_bits));
    }

    #[test]
    fn classical_and_gate_evaluates_false_when_one_input_false() {
        let config = GarbleConfig::new(Optimization::Classical);
        let garbler_bits = HashMap::from([("A".to_string(), true)]);
        let evaluator_bits = HashMap::from([("B".to_string(), false)]);
        assert!(!run_pair("A AND B", config, garbler_bits, evaluator_bits));
    }

    #[test]
    fn half_gates_tree_matches_plain_evaluation() {
        let config = GarbleConfig::new(Optimization::HalfGates);
        let garbler_bits = HashMap::from([("A".to_string(), true), ("C".to_string(), false), ("E".to_string(), true)]);
        let evaluator_bits = HashMap::from([("B".to_string(), true), ("D".to_string(), true), ("F".to_string(), false)]);
        // ((A AND B) AND (C XOR D)) AND (E XOR F)
        // ((T AND T) AND (F XOR T)) AND (T XOR F) = (T AND T) AND T = T
        assert!(run_pair(
            "((A AND B) AND (C XOR D)) AND (E XOR F)",
            config,
            garbler_bits,
            evaluator_bits
        ));
    }

    #[test]
    fn circuit_builds_and_input_count_matches_identifiers() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let config = GarbleConfig::new(Optimization::Grr3);
        let circuit = Circuit::build("A AND B", &mut rng, config).unwrap();
        assert_eq!(circuit.input_wires().len(), 2);
    }
}
