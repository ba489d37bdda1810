use super::*;
use evorobo_data::{Connection, Cppn, InnovationDatabase, Node, NodeType};
use rand::Rng;
use std::collections::{HashMap, HashSet, VecDeque};

pub fn create_minimal_with_rng<R: Rng>(
    num_inputs: usize,
    num_outputs: usize,
    innov_db: &mut InnovationDatabase,
    rng: &mut R,
) -> Cppn {
    let mut nodes = Vec::with_capacity(num_inputs + 1 + num_outputs);
    for i in 0..num_inputs {
        nodes.push(Node {
            id: i as u64,
            node_type: NodeType::Input,
            activation: Activation::Linear,
        });
    }
    nodes.push(Node {
        id: num_inputs as u64,
        node_type: NodeType::Bias,
        activation: Activation::Linear,
    });
    for o in 0..num_outputs {
        nodes.push(Node {
            id: (num_inputs + 1 + o) as u64,
            node_type: NodeType::Output,
            activation: Activation::Tanh,
        });
    }

    let mut connections = Vec::with_capacity((num_inputs + 1) * num_outputs);
    for from in 0..=num_inputs as u64 {
        for o in 0..num_outputs {
            let to = (num_inputs + 1 + o) as u64;
            connections.push(Connection {
                from,
                to,
                weight: rng.gen_range(-1.0..1.0),
                enabled: true,
                innovation: innov_db.connection_innovation(from, to),
            });
        }
    }

    Cppn {
        num_inputs,
        num_outputs,
        nodes,
        connections,
    }
}

/// True when adding `from -> to` would close a cycle. Disabled connections
/// count too, so re-enabling one can never create a cycle either.
pub fn would_create_cycle(cppn: &Cppn, from: u64, to: u64) -> bool {
    if from == to {
        return true;
    }
    let mut adj: HashMap<u64, Vec<u64>> = HashMap::new();
    for c in &cppn.connections {
        adj.entry(c.from).or_default().push(c.to);
    }

    let mut visited = HashSet::new();
    let mut stack = vec![to];
    while let Some(u) = stack.pop() {
        if u == from {
            return true;
        }
        if !visited.insert(u) {
            continue;
        }
        if let Some(next) = adj.get(&u) {
            stack.extend(next.iter().copied());
        }
    }
    false
}

/// Node indices in evaluation order over enabled connections.
///
/// Kahn's algorithm seeded in node order, so the result only depends on the
/// genome. Nodes caught in a cycle (only possible for hand-edited genomes)
/// are appended in node order.
pub fn evaluation_order(cppn: &Cppn) -> Vec<usize> {
    let idx_of: HashMap<u64, usize> = cppn
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, n)| (n.id, idx))
        .collect();

    let mut in_degree = vec![0usize; cppn.nodes.len()];
    let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); cppn.nodes.len()];
    for c in cppn.connections.iter().filter(|c| c.enabled) {
        if let (Some(&f), Some(&t)) = (idx_of.get(&c.from), idx_of.get(&c.to)) {
            in_degree[t] += 1;
            out_edges[f].push(t);
        }
    }

    let mut queue: VecDeque<usize> = (0..cppn.nodes.len())
        .filter(|&idx| in_degree[idx] == 0)
        .collect();
    let mut order = Vec::with_capacity(cppn.nodes.len());
    let mut placed = vec![false; cppn.nodes.len()];
    while let Some(u) = queue.pop_front() {
        order.push(u);
        placed[u] = true;
        for &v in &out_edges[u] {
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push_back(v);
            }
        }
    }

    if order.len() < cppn.nodes.len() {
        order.extend((0..cppn.nodes.len()).filter(|&idx| !placed[idx]));
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_minimal_is_fully_connected() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut db = InnovationDatabase::new();
        let cppn = create_minimal_with_rng(4, 4, &mut db, &mut rng);
        assert_eq!(cppn.nodes.len(), 9);
        assert_eq!(cppn.connections.len(), 20);
        assert_eq!(db.len(), 20);

        // A second genome shares every innovation number.
        let other = create_minimal_with_rng(4, 4, &mut db, &mut rng);
        assert_eq!(db.len(), 20);
        for (a, b) in cppn.connections.iter().zip(&other.connections) {
            assert_eq!(a.innovation, b.innovation);
        }
    }

    #[test]
    fn test_cycle_detection() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut db = InnovationDatabase::new();
        let cppn = create_minimal_with_rng(2, 1, &mut db, &mut rng);
        // 0 -> 3 exists, so 3 -> 0 would close a loop.
        assert!(would_create_cycle(&cppn, 3, 0));
        assert!(!would_create_cycle(&cppn, 0, 3));
        assert!(would_create_cycle(&cppn, 1, 1));
    }

    #[test]
    fn test_order_puts_inputs_before_outputs() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut db = InnovationDatabase::new();
        let cppn = create_minimal_with_rng(3, 2, &mut db, &mut rng);
        let order = evaluation_order(&cppn);
        assert_eq!(order.len(), cppn.nodes.len());
        let pos = |id: u64| {
            order
                .iter()
                .position(|&idx| cppn.nodes[idx].id == id)
                .unwrap()
        };
        assert!(pos(0) < pos(cppn.output_id(0)));
        assert!(pos(cppn.bias_id()) < pos(cppn.output_id(1)));
    }
}
