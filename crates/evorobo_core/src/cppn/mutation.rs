use super::topology::would_create_cycle;
use super::*;
use evorobo_data::{Connection, Cppn, InnovationDatabase, Node, NodeType};
use rand::seq::SliceRandom;
use rand::Rng;

pub fn mutate_with_config<R: Rng>(
    cppn: &mut Cppn,
    innov_db: &mut InnovationDatabase,
    config: &MutationConfig,
    rng: &mut R,
) {
    for conn in &mut cppn.connections {
        if rng.gen_bool(config.weight_rate) {
            if rng.gen_bool(config.weight_replace_prob) {
                conn.weight = rng.gen_range(-1.0..1.0);
            } else {
                conn.weight += rng.gen_range(-config.weight_power..config.weight_power);
            }
            conn.weight = conn.weight.clamp(-config.max_weight, config.max_weight);
        }
    }

    if rng.gen_bool(config.add_connection_prob) {
        add_connection(cppn, innov_db, config.add_connection_tries, rng);
    }

    if rng.gen_bool(config.add_node_prob) {
        add_node(cppn, innov_db, rng);
    }

    if rng.gen_bool(config.toggle_enable_prob) && !cppn.connections.is_empty() {
        let idx = rng.gen_range(0..cppn.connections.len());
        // Never disable the last enabled connection into a node.
        let to = cppn.connections[idx].to;
        let others_into_target = cppn
            .connections
            .iter()
            .enumerate()
            .filter(|(i, c)| *i != idx && c.enabled && c.to == to)
            .count();
        let conn = &mut cppn.connections[idx];
        if !conn.enabled || others_into_target > 0 {
            conn.enabled = !conn.enabled;
        }
    }

    if rng.gen_bool(config.activation_change_prob) {
        let hidden: Vec<usize> = cppn
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.node_type == NodeType::Hidden)
            .map(|(idx, _)| idx)
            .collect();
        if let Some(&idx) = hidden.choose(rng) {
            if let Some(&activation) = Activation::ALL.choose(rng) {
                cppn.nodes[idx].activation = activation;
            }
        }
    }
}

/// Adds one new acyclic connection, registering it in the innovation database.
pub fn add_connection<R: Rng>(
    cppn: &mut Cppn,
    innov_db: &mut InnovationDatabase,
    tries: usize,
    rng: &mut R,
) -> bool {
    let sources: Vec<u64> = cppn
        .nodes
        .iter()
        .filter(|n| n.node_type != NodeType::Output)
        .map(|n| n.id)
        .collect();
    let targets: Vec<u64> = cppn
        .nodes
        .iter()
        .filter(|n| matches!(n.node_type, NodeType::Hidden | NodeType::Output))
        .map(|n| n.id)
        .collect();
    if sources.is_empty() || targets.is_empty() {
        return false;
    }

    for _ in 0..tries {
        let from = sources[rng.gen_range(0..sources.len())];
        let to = targets[rng.gen_range(0..targets.len())];
        if cppn
            .connections
            .iter()
            .any(|c| c.from == from && c.to == to)
        {
            continue;
        }
        if would_create_cycle(cppn, from, to) {
            continue;
        }
        cppn.connections.push(Connection {
            from,
            to,
            weight: rng.gen_range(-1.0..1.0),
            enabled: true,
            innovation: innov_db.connection_innovation(from, to),
        });
        return true;
    }
    false
}

/// Splits a random enabled connection with a new hidden node.
pub fn add_node<R: Rng>(cppn: &mut Cppn, innov_db: &mut InnovationDatabase, rng: &mut R) -> bool {
    let enabled: Vec<usize> = cppn
        .connections
        .iter()
        .enumerate()
        .filter(|(_, c)| c.enabled)
        .map(|(idx, _)| idx)
        .collect();
    let Some(&idx) = enabled.choose(rng) else {
        return false;
    };

    let (from, to, weight, innovation) = {
        let c = &cppn.connections[idx];
        (c.from, c.to, c.weight, c.innovation)
    };
    let split = innov_db.split_innovation(innovation, from, to);
    if cppn.nodes.iter().any(|n| n.id == split.node_id) {
        // This genome already split the connection once.
        return false;
    }

    let activation = Activation::ALL
        .choose(rng)
        .copied()
        .unwrap_or(Activation::Sigmoid);
    cppn.connections[idx].enabled = false;
    cppn.nodes.push(Node {
        id: split.node_id,
        node_type: NodeType::Hidden,
        activation,
    });
    cppn.connections.push(Connection {
        from,
        to: split.node_id,
        weight: 1.0,
        enabled: true,
        innovation: split.in_innovation,
    });
    cppn.connections.push(Connection {
        from: split.node_id,
        to,
        weight,
        enabled: true,
        innovation: split.out_innovation,
    });
    true
}
