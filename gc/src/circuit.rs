//! Circuit parsing, tree construction, sanitization, and evaluator-side
//! reconstruction. Parsing is recursive descent over the `.circuit`
//! grammar, garbling each gate post-order as its subtree returns, with a
//! child's output wire shared in-process as its parent's input.

use std::collections::{HashMap, VecDeque};

use anyhow::{Result, anyhow, bail};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::config::GarbleConfig;
use crate::gate::{Gate, GarbledTable, GateType, WireRef, ungarble_table};
use crate::label::Label;

/// A node in the garbler's fully-populated tree: owns its `Gate`, whose
/// `left`/`right` wire references are either fresh (leaf) or shared with a
/// child's output wire (internal).
pub enum GateNode {
    Leaf(Gate),
    Internal(Gate, Box<GateNode>, Box<GateNode>),
}

impl GateNode {
    pub fn gate(&self) -> &Gate {
        match self {
            GateNode::Leaf(g) => g,
            GateNode::Internal(g, _, _) => g,
        }
    }

    pub fn gate_mut(&mut self) -> &mut Gate {
        match self {
            GateNode::Leaf(g) => g,
            GateNode::Internal(g, _, _) => g,
        }
    }

    /// Leaves in left-to-right order, flattened as `[leaf0.left, leaf0.right,
    /// leaf1.left, leaf1.right, ...]`.
    pub fn input_wires(&self) -> Vec<WireRef> {
        match self {
            GateNode::Leaf(g) => vec![g.left.clone().unwrap(), g.right.clone().unwrap()],
            GateNode::Internal(_, left, right) => {
                let mut wires = left.input_wires();
                wires.extend(right.input_wires());
                wires
            }
        }
    }

    /// Gate types in root-first breadth-first order. Used to validate parser
    /// structure against a known tree shape.
    pub fn level_order_gate_types(&self) -> Vec<GateType> {
        let mut result = Vec::new();
        let mut queue: VecDeque<&GateNode> = VecDeque::new();
        queue.push_back(self);
        while let Some(node) = queue.pop_front() {
            result.push(node.gate().gate_type);
            if let GateNode::Internal(_, left, right) = node {
                queue.push_back(left);
                queue.push_back(right);
            }
        }
        result
    }

    /// Evaluate this subtree directly on plaintext bits, bypassing garbling
    /// entirely. Used as ground truth in tests: `evaluate(garble(C), x)`
    /// must always agree with `C.evaluate_plain(x)`.
    pub fn evaluate_plain(&self, inputs: &HashMap<String, bool>) -> Result<bool> {
        match self {
            GateNode::Leaf(g) => {
                let left_id = g
                    .left
                    .as_ref()
                    .and_then(|w| w.borrow().identifier.clone())
                    .ok_or_else(|| anyhow!("leaf gate missing left identifier"))?;
                let right_id = g
                    .right
                    .as_ref()
                    .and_then(|w| w.borrow().identifier.clone())
                    .ok_or_else(|| anyhow!("leaf gate missing right identifier"))?;
                let left_bit = *inputs
                    .get(&left_id)
                    .ok_or_else(|| anyhow!("missing plaintext input bit for '{left_id}'"))?;
                let right_bit = *inputs
                    .get(&right_id)
                    .ok_or_else(|| anyhow!("missing plaintext input bit for '{right_id}'"))?;
                Ok(g.gate_type.eval(left_bit, right_bit))
            }
            GateNode::Internal(g, left, right) => {
                let left_bit = left.evaluate_plain(inputs)?;
                let right_bit = right.evaluate_plain(inputs)?;
                Ok(g.gate_type.eval(left_bit, right_bit))
            }
        }
    }

    /// Deep clone into a serializable form with all wire references
    /// stripped, for transmission to the evaluator.
    pub fn sanitize(&self) -> Result<SanitizedNode> {
        let gate = self.gate();
        let table = gate
            .table
            .clone()
            .ok_or_else(|| anyhow!("gate must be garbled before it can be sanitized"))?;
        Ok(match self {
            GateNode::Leaf(g) => SanitizedNode::Leaf {
                gate_type: g.gate_type,
                table,
            },
            GateNode::Internal(_, left, right) => SanitizedNode::Internal {
                gate_type: gate.gate_type,
                table,
                left: Box::new(left.sanitize()?),
                right: Box::new(right.sanitize()?),
            },
        })
    }
}

/// The evaluator's copy of the circuit: no wire references, `represents`
/// fields never existed in the first place (labels here are opaque bytes
/// inside ciphertext entries only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SanitizedNode {
    Leaf {
        gate_type: GateType,
        table: GarbledTable,
    },
    Internal {
        gate_type: GateType,
        table: GarbledTable,
        left: Box<SanitizedNode>,
        right: Box<SanitizedNode>,
    },
}

impl SanitizedNode {
    /// Reconstruct bottom-up: leaves consume two labels each from `inputs`
    /// (in the order the garbler listed input wires); internal nodes feed
    /// their children's reconstructed labels into `ungarble`. Processing
    /// children before parents achieves the same dependency order as the
    /// deepest-level-first traversal described by the protocol.
    pub fn reconstruct(&self, config: &GarbleConfig, inputs: &mut VecDeque<Label>) -> Result<Label> {
        match self {
            SanitizedNode::Leaf { table, .. } => {
                let left_label = inputs
                    .pop_front()
                    .ok_or_else(|| anyhow!("ran out of input labels while reconstructing a leaf"))?;
                let right_label = inputs
                    .pop_front()
                    .ok_or_else(|| anyhow!("ran out of input labels while reconstructing a leaf"))?;
                ungarble_table(config, table, &left_label, &right_label)
            }
            SanitizedNode::Internal {
                table,
                left,
                right,
                ..
            } => {
                let left_label = left.reconstruct(config, inputs)?;
                let right_label = right.reconstruct(config, inputs)?;
                ungarble_table(config, table, &left_label, &right_label)
            }
        }
    }
}

/// A fully-parsed, fully-garbled circuit, retained by the garbler for the
/// final output comparison.
pub struct Circuit {
    pub root: GateNode,
    pub config: GarbleConfig,
    pub r: Option<Vec<u8>>,
}

impl Circuit {
    /// Parse and garble a circuit from its textual grammar in one pass:
    /// `build_node` recurses to the leaves first, then garbles each gate as
    /// its subtree returns, satisfying the post-order ordering invariant.
    pub fn build(source: &str, rng: &mut ChaCha12Rng, config: GarbleConfig) -> Result<Self> {
        let r = if config.optimization.uses_free_xor_offset() {
            Some(sample_free_xor_offset(rng, config.num_bytes))
        } else {
            None
        };
        let root = build_node(source.trim(), rng, &config, r.as_deref())?;
        Ok(Circuit { root, config, r })
    }

    pub fn input_wires(&self) -> Vec<WireRef> {
        self.root.input_wires()
    }

    pub fn sanitize(&self) -> Result<SanitizedNode> {
        self.root.sanitize()
    }

    /// Ground-truth plaintext evaluation of the circuit this garbled tree
    /// was built from. See [`GateNode::evaluate_plain`].
    pub fn evaluate_plain(&self, inputs: &HashMap<String, bool>) -> Result<bool> {
        self.root.evaluate_plain(inputs)
    }

    /// Summarize the circuit's shape as human-inspectable JSON: input
    /// identifiers in protocol order, total gate count, and the optimization
    /// in force. Never sent over the wire, which stays bincode (see
    /// [`crate::transport`]) — this is for inspection only.
    pub fn summary_json(&self) -> Result<String> {
        let identifiers: Vec<String> = self
            .input_wires()
            .iter()
            .map(|w| w.borrow().identifier.clone().unwrap_or_default())
            .collect();
        let gate_types = self.root.level_order_gate_types();
        let summary = serde_json::json!({
            "optimization": format!("{:?}", self.config.optimization),
            "num_bytes": self.config.num_bytes,
            "input_identifiers": identifiers,
            "gate_count": gate_types.len(),
            "gate_types_level_order": gate_types.iter().map(|g| g.as_str()).collect::<Vec<_>>(),
        });
        serde_json::to_string_pretty(&summary).map_err(|e| anyhow!("failed to render circuit summary as JSON: {e}"))
    }

    /// Render the tree with indentation, for debugging / dry-run display.
    pub fn render(&self) -> String {
        fn go(node: &GateNode, depth: usize, out: &mut String) {
            match node {
                GateNode::Leaf(g) => {
                    let ids = (
                        g.left.as_ref().and_then(|w| w.borrow().identifier.clone()),
                        g.right.as_ref().and_then(|w| w.borrow().identifier.clone()),
                    );
                    out.push_str(&"  ".repeat(depth));
                    out.push_str(&format!(
                        "{} {} {}\n",
                        ids.0.unwrap_or_default(),
                        g.gate_type.as_str(),
                        ids.1.unwrap_or_default()
                    ));
                }
                GateNode::Internal(g, left, right) => {
                    out.push_str(&"  ".repeat(depth));
                    out.push_str(g.gate_type.as_str());
                    out.push('\n');
                    go(left, depth + 1, out);
                    go(right, depth + 1, out);
                }
            }
        }
        let mut out = String::new();
        go(&self.root, 0, &mut out);
        out
    }
}

/// Recover the leaf identifiers of a `.circuit` expression in left-to-right
/// order without generating any labels or gates. Lets a caller (e.g.
/// `gc-cli`) discover which identifiers need input bits before it has
/// enough context to garble the circuit for real.
pub fn parse_identifiers(source: &str) -> Result<Vec<String>> {
    fn go(expr: &str, out: &mut Vec<String>) -> Result<()> {
        let (left_expr, op, right_expr) = separate(expr)?;
        GateType::parse(&op)?;
        if !left_expr.contains('(') && !left_expr.contains(' ') && !right_expr.contains('(') && !right_expr.contains(' ') {
            out.push(left_expr);
            out.push(right_expr);
            return Ok(());
        }
        go(&left_expr, out)?;
        go(&right_expr, out)?;
        Ok(())
    }
    let mut out = Vec::new();
    go(source.trim(), &mut out)?;
    Ok(out)
}

fn sample_free_xor_offset(rng: &mut ChaCha12Rng, num_bytes: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut r = vec![0u8; num_bytes];
    rng.fill_bytes(&mut r);
    *r.last_mut().unwrap() |= 1;
    r
}

fn build_node(expr: &str, rng: &mut ChaCha12Rng, config: &GarbleConfig, r: Option<&[u8]>) -> Result<GateNode> {
    let (left_expr, op, right_expr) = separate(expr)?;
    let gate_type = GateType::parse(&op)?;

    if !left_expr.contains('(') && !left_expr.contains(' ') && !right_expr.contains('(') && !right_expr.contains(' ') {
        // Both sides are bare leaf identifiers: `leaf OP leaf`.
        let gate = Gate::new_leaf(gate_type, left_expr, right_expr, rng, config, r);
        let mut node = GateNode::Leaf(gate);
        node.gate_mut().garble(rng, config, r)?;
        return Ok(node);
    }

    let left_node = build_node(&left_expr, rng, config, r)?;
    let right_node = build_node(&right_expr, rng, config, r)?;

    let mut gate = Gate::new_internal(gate_type, rng, config, r);
    gate.left = Some(left_node.gate().output.clone());
    gate.right = Some(right_node.gate().output.clone());
    gate.garble(rng, config, r)?;

    Ok(GateNode::Internal(gate, Box::new(left_node), Box::new(right_node)))
}

/// Split `expr` into `(LEFT, OP, RIGHT)`.
///
/// If there is no `(` the expression is three space-separated tokens
/// `leaf OP leaf`. Otherwise it has the shape `(LEFT) OP (RIGHT)`: scan
/// parenthesis balance from position 0 to find the matching close paren.
fn separate(expr: &str) -> Result<(String, String, String)> {
    let expr = expr.trim();
    if !expr.contains('(') {
        let tokens: Vec<&str> = expr.split_whitespace().collect();
        if tokens.len() != 3 {
            bail!("malformed leaf expression: '{expr}'");
        }
        return Ok((tokens[0].to_string(), tokens[1].to_string(), tokens[2].to_string()));
    }

    if !expr.starts_with('(') {
        bail!("expected '(' at start of expression: '{expr}'");
    }

    let bytes = expr.as_bytes();
    let mut depth = 0i32;
    let mut close_index = None;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    close_index = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let close_index = close_index.ok_or_else(|| anyhow!("unbalanced parentheses in '{expr}'"))?;
    let left_expr = expr[1..close_index].to_string();

    let rest = expr[close_index + 1..].trim();
    let op_end = rest
        .find(|c: char| c.is_whitespace())
        .ok_or_else(|| anyhow!("missing operator after '{left_expr}'"))?;
    let op = rest[..op_end].to_string();
    let right_part = rest[op_end..].trim();

    if !right_part.starts_with('(') || !right_part.ends_with(')') {
        bail!("expected parenthesized right-hand expression in '{expr}'");
    }
    let right_expr = right_part[1..right_part.len() - 1].to_string();

    Ok((left_expr, op, right_expr))
}
