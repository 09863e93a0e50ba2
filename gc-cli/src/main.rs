use std::collections::HashMap;
use std::io::{self, Write as _};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use gc::config::{GarbleConfig, Optimization};
use gc::{circuit, evaluator, garbler};

/// Two-party garbled-circuits garbler/evaluator.
#[derive(Parser, Debug)]
#[command(name = "gc-cli")]
#[command(about = "Run a Yao's garbled-circuits garbler or evaluator over TCP")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Garble a `.circuit` file and serve it to one evaluator.
    Garbler {
        /// Address to bind and listen on, e.g. `127.0.0.1:9000`.
        #[arg(long)]
        address: String,
        /// Path to the `.circuit` grammar file to garble.
        #[arg(long)]
        circuit: PathBuf,
        /// Garbling optimization to apply.
        #[arg(long, value_enum, default_value_t = OptimizationArg::Classical)]
        optimization: OptimizationArg,
        /// Comma-separated identifiers this party supplies bits for, matched
        /// positionally with `--bits`. Any identifier not listed here is
        /// prompted for interactively.
        #[arg(long, value_delimiter = ',')]
        identifiers: Vec<String>,
        /// Comma-separated 0/1 bits, one per entry in `--identifiers`.
        #[arg(long, value_delimiter = ',')]
        bits: Vec<u8>,
    },
    /// Connect to a running garbler and evaluate the circuit it garbled.
    Evaluator {
        /// Address of the garbler, e.g. `127.0.0.1:9000`.
        #[arg(long)]
        address: String,
        /// Garbling optimization the garbler is using; must match.
        #[arg(long, value_enum, default_value_t = OptimizationArg::Classical)]
        optimization: OptimizationArg,
        /// Comma-separated identifiers this party supplies bits for, matched
        /// positionally with `--bits`. Any identifier not listed here is
        /// prompted for interactively as it streams in from the garbler.
        #[arg(long, value_delimiter = ',')]
        identifiers: Vec<String>,
        /// Comma-separated 0/1 bits, one per entry in `--identifiers`.
        #[arg(long, value_delimiter = ',')]
        bits: Vec<u8>,
    },
    /// Parse and garble a circuit file without running the network
    /// protocol, printing its tree for inspection.
    ShowCircuit {
        /// Path to the `.circuit` grammar file to render.
        #[arg(long)]
        circuit: PathBuf,
        #[arg(long, value_enum, default_value_t = OptimizationArg::Classical)]
        optimization: OptimizationArg,
        /// Print a JSON shape summary instead of the indented tree.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OptimizationArg {
    Classical,
    PointAndPermute,
    Grr3,
    FreeXor,
    FleXor,
    HalfGates,
}

impl From<OptimizationArg> for Optimization {
    fn from(value: OptimizationArg) -> Self {
        match value {
            OptimizationArg::Classical => Optimization::Classical,
            OptimizationArg::PointAndPermute => Optimization::PointAndPermute,
            OptimizationArg::Grr3 => Optimization::Grr3,
            OptimizationArg::FreeXor => Optimization::FreeXor,
            OptimizationArg::FleXor => Optimization::FleXor,
            OptimizationArg::HalfGates => Optimization::HalfGates,
        }
    }
}

/// Build the `identifier -> bit` map from parallel `--identifiers`/`--bits`
/// flags, validating that both lists are the same length and every bit is
/// literally 0 or 1.
fn parse_flag_inputs(identifiers: &[String], bits: &[u8]) -> Result<HashMap<String, bool>> {
    if identifiers.len() != bits.len() {
        bail!(
            "--identifiers and --bits must list the same number of entries ({} vs {})",
            identifiers.len(),
            bits.len()
        );
    }
    identifiers
        .iter()
        .zip(bits.iter())
        .map(|(id, &b)| match b {
            0 => Ok((id.clone(), false)),
            1 => Ok((id.clone(), true)),
            other => bail!("bit for '{id}' must be 0 or 1, got {other}"),
        })
        .collect()
}

/// Ask y/n whether the operator supplies this identifier, then 0/1 for its
/// value.
fn prompt_for_identifier(identifier: &str) -> Result<Option<bool>> {
    loop {
        print!("Do you supply {identifier}? (y/n) ");
        io::stdout().flush().ok();
        let mut line = String::new();
        io::stdin().read_line(&mut line).context("reading from stdin")?;
        match line.trim() {
            "y" => break,
            "n" => return Ok(None),
            _ => println!("Sorry, didn't recognize that. Indicate with y or n whether you supply {identifier}."),
        }
    }
    loop {
        print!("Choice for {identifier} (0/1): ");
        io::stdout().flush().ok();
        let mut line = String::new();
        io::stdin().read_line(&mut line).context("reading from stdin")?;
        match line.trim() {
            "0" => return Ok(Some(false)),
            "1" => return Ok(Some(true)),
            _ => println!("Sorry, you must supply either a 0 (false) or a 1 (true) for wire {identifier}."),
        }
    }
}

fn run_garbler_command(address: &str, circuit_path: &PathBuf, optimization: OptimizationArg, identifiers: &[String], bits: &[u8]) -> Result<()> {
    let source = std::fs::read_to_string(circuit_path).with_context(|| format!("reading circuit file {}", circuit_path.display()))?;
    let mut inputs = parse_flag_inputs(identifiers, bits)?;

    let all_identifiers = circuit::parse_identifiers(&source).context("parsing circuit grammar")?;
    println!("Circuit declares {} input wire(s): {}", all_identifiers.len(), all_identifiers.join(", "));
    for identifier in &all_identifiers {
        if inputs.contains_key(identifier) {
            continue;
        }
        if let Some(bit) = prompt_for_identifier(identifier)? {
            inputs.insert(identifier.clone(), bit);
        }
    }

    let config = GarbleConfig::new(optimization.into());
    println!("Waiting for evaluator to connect on {address}...");
    let output = garbler::run_garbler(address, &source, &inputs, config)?;
    println!("Protocol complete. Output: {output}");
    Ok(())
}

fn run_evaluator_command(address: &str, optimization: OptimizationArg, identifiers: &[String], bits: &[u8]) -> Result<()> {
    let flag_inputs = parse_flag_inputs(identifiers, bits)?;
    let config = GarbleConfig::new(optimization.into());

    let mut resolver = move |identifier: &str| -> Result<bool> {
        if let Some(&bit) = flag_inputs.get(identifier) {
            return Ok(bit);
        }
        prompt_for_identifier(identifier)?.ok_or_else(|| anyhow!("identifier '{identifier}' is evaluator-owned and requires a bit"))
    };

    println!("Connecting to garbler at {address}...");
    let output = evaluator::run_evaluator(address, &mut resolver, config)?;
    println!("Protocol complete. Output: {output}");
    Ok(())
}

fn run_show_circuit(circuit_path: &PathBuf, optimization: OptimizationArg, json: bool) -> Result<()> {
    let source = std::fs::read_to_string(circuit_path).with_context(|| format!("reading circuit file {}", circuit_path.display()))?;
    let config = GarbleConfig::new(optimization.into());
    let mut rng = gc::config::rng_from_os_entropy();
    let built = circuit::Circuit::build(&source, &mut rng, config).context("parsing and garbling circuit")?;
    if json {
        println!("{}", built.summary_json().context("rendering circuit summary as JSON")?);
    } else {
        print!("{}", built.render());
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Commands::Garbler { address, circuit, optimization, identifiers, bits } => {
            run_garbler_command(&address, &circuit, optimization, &identifiers, &bits)
        }
        Commands::Evaluator { address, optimization, identifiers, bits } => run_evaluator_command(&address, optimization, &identifiers, &bits),
        Commands::ShowCircuit { circuit, optimization, json } => run_show_circuit(&circuit, optimization, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn circuit_fixture(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("creating temp circuit file");
        file.write_all(contents.as_bytes()).expect("writing temp circuit file");
        file
    }

    #[test]
    fn parse_flag_inputs_builds_map_from_matching_lists() {
        let identifiers = vec!["A".to_string(), "B".to_string()];
        let bits = vec![1u8, 0u8];
        let inputs = parse_flag_inputs(&identifiers, &bits).unwrap();
        assert_eq!(inputs.get("A"), Some(&true));
        assert_eq!(inputs.get("B"), Some(&false));
    }

    #[test]
    fn parse_flag_inputs_rejects_mismatched_lengths() {
        let identifiers = vec!["A".to_string()];
        let bits = vec![1u8, 0u8];
        assert!(parse_flag_inputs(&identifiers, &bits).is_err());
    }

    #[test]
    fn parse_flag_inputs_rejects_non_binary_bit() {
        let identifiers = vec!["A".to_string()];
        let bits = vec![2u8];
        assert!(parse_flag_inputs(&identifiers, &bits).is_err());
    }

    #[test]
    fn show_circuit_renders_tree_from_a_file_on_disk() {
        let fixture = circuit_fixture("A AND B");
        let path = fixture.path().to_path_buf();
        run_show_circuit(&path, OptimizationArg::Classical, false).unwrap();
    }

    #[test]
    fn show_circuit_renders_json_summary_from_a_file_on_disk() {
        let fixture = circuit_fixture("((A AND B) AND (C XOR D)) AND (E XOR F)");
        let path = fixture.path().to_path_buf();
        run_show_circuit(&path, OptimizationArg::HalfGates, true).unwrap();
    }

    #[test]
    fn garbler_command_reads_identifiers_from_a_circuit_file_on_disk() {
        let fixture = circuit_fixture("A AND B");
        let path = fixture.path().to_path_buf();
        let source = std::fs::read_to_string(&path).unwrap();
        let all_identifiers = circuit::parse_identifiers(&source).unwrap();
        assert_eq!(all_identifiers, vec!["A", "B"]);
    }
}
