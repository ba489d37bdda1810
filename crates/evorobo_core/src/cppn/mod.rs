pub mod crossover;
pub mod forward;
pub mod mutation;
pub mod topology;

pub use evorobo_data::{Activation, Connection, Cppn, InnovationDatabase, Node, NodeType};
pub use forward::CompiledCppn;

use crate::config::MutationConfig;
use rand::Rng;

/// Core logic of CPPN genomes.
pub trait CppnLogic {
    /// Minimal network: every input and the bias wired to every output.
    fn new_minimal<R: Rng>(
        num_inputs: usize,
        num_outputs: usize,
        innov_db: &mut InnovationDatabase,
        rng: &mut R,
    ) -> Self;

    fn mutate_with_config<R: Rng>(
        &mut self,
        innov_db: &mut InnovationDatabase,
        config: &MutationConfig,
        rng: &mut R,
    );

    #[must_use]
    fn crossover_with_rng<R: Rng>(&self, other: &Self, rng: &mut R) -> Self;

    /// Builds an evaluable network from the genome.
    #[must_use]
    fn compile(&self) -> CompiledCppn;
}

impl CppnLogic for Cppn {
    fn new_minimal<R: Rng>(
        num_inputs: usize,
        num_outputs: usize,
        innov_db: &mut InnovationDatabase,
        rng: &mut R,
    ) -> Self {
        topology::create_minimal_with_rng(num_inputs, num_outputs, innov_db, rng)
    }

    fn mutate_with_config<R: Rng>(
        &mut self,
        innov_db: &mut InnovationDatabase,
        config: &MutationConfig,
        rng: &mut R,
    ) {
        mutation::mutate_with_config(self, innov_db, config, rng)
    }

    fn crossover_with_rng<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        crossover::cppn_crossover_with_rng(self, other, rng)
    }

    fn compile(&self) -> CompiledCppn {
        forward::compile(self)
    }
}
