use serde::{Deserialize, Serialize};

/// Role of a node inside a CPPN.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeType {
    /// Receives one coordinate of the query.
    Input,
    /// Constant 1.0 input.
    Bias,
    /// Internal node added by a split mutation.
    Hidden,
    /// Produces one value of the query result.
    Output,
}

/// Activation function applied to the weighted sum of a node's inputs.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Sigmoid,
    Tanh,
    Sine,
    Gaussian,
    Abs,
}

impl Activation {
    pub const ALL: [Activation; 6] = [
        Activation::Linear,
        Activation::Sigmoid,
        Activation::Tanh,
        Activation::Sine,
        Activation::Gaussian,
        Activation::Abs,
    ];

    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Sigmoid => 1.0 / (1.0 + (-4.9 * x).exp()),
            Activation::Tanh => x.tanh(),
            Activation::Sine => x.sin(),
            Activation::Gaussian => (-2.5 * x * x).exp(),
            Activation::Abs => x.abs(),
        }
    }
}

/// A node in a CPPN genome.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Node identifier. Inputs, bias and outputs use fixed ids; hidden ids
    /// come from the innovation database.
    pub id: u64,
    pub node_type: NodeType,
    pub activation: Activation,
}

/// A weighted link between two nodes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub from: u64,
    pub to: u64,
    pub weight: f64,
    pub enabled: bool,
    /// Innovation number used to align genes during crossover.
    pub innovation: u64,
}

/// Compositional pattern-producing network genome.
///
/// Node ids `0..num_inputs` are inputs, `num_inputs` is the bias node and the
/// following `num_outputs` ids are outputs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Cppn {
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

impl Cppn {
    #[must_use]
    pub fn bias_id(&self) -> u64 {
        self.num_inputs as u64
    }

    #[must_use]
    pub fn output_id(&self, output: usize) -> u64 {
        (self.num_inputs + 1 + output) as u64
    }

    #[must_use]
    pub fn node(&self, id: u64) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn hidden_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Hidden)
            .count()
    }

    #[must_use]
    pub fn enabled_connections(&self) -> usize {
        self.connections.iter().filter(|c| c.enabled).count()
    }
}
