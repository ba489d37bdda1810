use evorobo_data::Cppn;
use rand::Rng;
use std::collections::HashMap;

/// NEAT crossover aligned on innovation numbers.
///
/// The child keeps `primary`'s topology. Matching genes take their weight and
/// enabled flag from either parent with equal chance; disjoint and excess genes
/// come from `primary`. Hidden nodes present in both parents pick their
/// activation the same way.
pub fn cppn_crossover_with_rng<R: Rng>(primary: &Cppn, other: &Cppn, rng: &mut R) -> Cppn {
    let other_connections: HashMap<u64, usize> = other
        .connections
        .iter()
        .enumerate()
        .map(|(idx, c)| (c.innovation, idx))
        .collect();

    let connections = primary
        .connections
        .iter()
        .map(|c1| match other_connections.get(&c1.innovation) {
            Some(&idx) if rng.gen_bool(0.5) => {
                let c2 = &other.connections[idx];
                let mut gene = c1.clone();
                gene.weight = c2.weight;
                gene.enabled = c2.enabled;
                gene
            }
            _ => c1.clone(),
        })
        .collect();

    let other_nodes: HashMap<u64, usize> = other
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, n)| (n.id, idx))
        .collect();

    let nodes = primary
        .nodes
        .iter()
        .map(|n1| match other_nodes.get(&n1.id) {
            Some(&idx) if rng.gen_bool(0.5) => {
                let mut node = n1.clone();
                node.activation = other.nodes[idx].activation;
                node
            }
            _ => n1.clone(),
        })
        .collect();

    Cppn {
        num_inputs: primary.num_inputs,
        num_outputs: primary.num_outputs,
        nodes,
        connections,
    }
}
