pub mod body;
pub mod cppn;
pub mod genotype;
pub mod innovation;
pub mod measures;
pub mod state;

pub use body::{Body, Direction, Module, ModuleKind};
pub use cppn::{Activation, Connection, Cppn, Node, NodeType};
pub use genotype::Genotype;
pub use innovation::{InnovationDatabase, SplitInnovation, HIDDEN_NODE_ID_BASE};
pub use measures::{EnvConditions, Measures};
pub use state::{ActorState, BatchState, EnvironmentState, Quaternion, Vector3};
