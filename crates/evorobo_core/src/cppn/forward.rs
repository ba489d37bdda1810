use super::topology::evaluation_order;
use evorobo_data::{Activation, Cppn, NodeType};
use std::collections::HashMap;

/// A CPPN flattened for repeated queries.
///
/// Incoming connections of every node are stored contiguously in
/// `incoming_flat`, addressed through `incoming_offsets`.
#[derive(Clone, Debug)]
pub struct CompiledCppn {
    num_inputs: usize,
    order: Vec<usize>,
    kinds: Vec<NodeType>,
    input_slot: Vec<Option<usize>>,
    activations: Vec<Activation>,
    incoming_flat: Vec<(usize, f64)>,
    incoming_offsets: Vec<usize>,
    outputs: Vec<Option<usize>>,
}

pub fn compile(cppn: &Cppn) -> CompiledCppn {
    let idx_of: HashMap<u64, usize> = cppn
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, n)| (n.id, idx))
        .collect();

    let mut incoming: Vec<Vec<(usize, f64)>> = vec![Vec::new(); cppn.nodes.len()];
    for c in cppn.connections.iter().filter(|c| c.enabled) {
        if let (Some(&f), Some(&t)) = (idx_of.get(&c.from), idx_of.get(&c.to)) {
            incoming[t].push((f, c.weight));
        }
    }

    let mut incoming_flat = Vec::new();
    let mut incoming_offsets = Vec::with_capacity(cppn.nodes.len() + 1);
    for list in &incoming {
        incoming_offsets.push(incoming_flat.len());
        incoming_flat.extend_from_slice(list);
    }
    incoming_offsets.push(incoming_flat.len());

    CompiledCppn {
        num_inputs: cppn.num_inputs,
        order: evaluation_order(cppn),
        kinds: cppn.nodes.iter().map(|n| n.node_type).collect(),
        input_slot: cppn
            .nodes
            .iter()
            .map(|n| {
                (n.node_type == NodeType::Input && (n.id as usize) < cppn.num_inputs)
                    .then_some(n.id as usize)
            })
            .collect(),
        activations: cppn.nodes.iter().map(|n| n.activation).collect(),
        incoming_flat,
        incoming_offsets,
        outputs: (0..cppn.num_outputs)
            .map(|o| idx_of.get(&cppn.output_id(o)).copied())
            .collect(),
    }
}

impl CompiledCppn {
    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// Evaluates the network for one query. Missing inputs read as 0.0.
    #[must_use]
    pub fn activate(&self, inputs: &[f64]) -> Vec<f64> {
        let mut values = vec![0.0; self.kinds.len()];
        for &idx in &self.order {
            values[idx] = match self.kinds[idx] {
                NodeType::Input => self.input_slot[idx]
                    .and_then(|slot| inputs.get(slot))
                    .copied()
                    .unwrap_or(0.0),
                NodeType::Bias => 1.0,
                NodeType::Hidden | NodeType::Output => {
                    let start = self.incoming_offsets[idx];
                    let end = self.incoming_offsets[idx + 1];
                    let sum: f64 = self.incoming_flat[start..end]
                        .iter()
                        .map(|&(from, w)| values[from] * w)
                        .sum();
                    self.activations[idx].apply(sum)
                }
            };
        }
        self.outputs
            .iter()
            .map(|slot| slot.map_or(0.0, |idx| values[idx]))
            .collect()
    }
}
