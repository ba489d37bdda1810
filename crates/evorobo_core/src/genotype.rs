//! Genotype codec: random creation, variation and development.
//!
//! A genotype is never modified in place; [`mutate`] and [`crossover`] return
//! new values. Structural innovations are registered in the run-owned
//! innovation databases passed by `&mut`.

use crate::body::{develop_body, SubstrateDimensions, BODY_CPPN_INPUTS, BODY_CPPN_OUTPUTS};
use crate::config::MutationConfig;
use crate::controller::{CpgController, CpgNetwork};
use crate::cppn::CppnLogic;
use crate::physics::Actor;
use evorobo_data::{Body, Cppn, Genotype, InnovationDatabase};
use rand::Rng;

/// Inputs of the brain CPPN: two joint positions.
pub const BRAIN_CPPN_INPUTS: usize = 6;
/// Output of the brain CPPN: the CPG weight.
pub const BRAIN_CPPN_OUTPUTS: usize = 1;

/// Minimal body and brain networks, each mutated `num_initial_mutations` times.
pub fn random<R: Rng>(
    innov_db_body: &mut InnovationDatabase,
    innov_db_brain: &mut InnovationDatabase,
    rng: &mut R,
    num_initial_mutations: usize,
) -> Genotype {
    let config = MutationConfig::default();
    let mut body = Cppn::new_minimal(BODY_CPPN_INPUTS, BODY_CPPN_OUTPUTS, innov_db_body, rng);
    let mut brain = Cppn::new_minimal(BRAIN_CPPN_INPUTS, BRAIN_CPPN_OUTPUTS, innov_db_brain, rng);
    for _ in 0..num_initial_mutations {
        body.mutate_with_config(innov_db_body, &config, rng);
        brain.mutate_with_config(innov_db_brain, &config, rng);
    }
    Genotype { body, brain }
}

pub fn mutate<R: Rng>(
    genotype: &Genotype,
    innov_db_body: &mut InnovationDatabase,
    innov_db_brain: &mut InnovationDatabase,
    rng: &mut R,
) -> Genotype {
    mutate_with_config(
        genotype,
        innov_db_body,
        innov_db_brain,
        &MutationConfig::default(),
        rng,
    )
}

pub fn mutate_with_config<R: Rng>(
    genotype: &Genotype,
    innov_db_body: &mut InnovationDatabase,
    innov_db_brain: &mut InnovationDatabase,
    config: &MutationConfig,
    rng: &mut R,
) -> Genotype {
    let mut child = genotype.clone();
    child.body.mutate_with_config(innov_db_body, config, rng);
    child.brain.mutate_with_config(innov_db_brain, config, rng);
    child
}

/// Innovation-aligned crossover; the child takes `parent1`'s topology.
pub fn crossover<R: Rng>(parent1: &Genotype, parent2: &Genotype, rng: &mut R) -> Genotype {
    Genotype {
        body: parent1.body.crossover_with_rng(&parent2.body, rng),
        brain: parent1.brain.crossover_with_rng(&parent2.brain, rng),
    }
}

/// A developed phenotype: body plus CPG brain.
#[derive(Clone, Debug, PartialEq)]
pub struct ModularRobot {
    pub body: Body,
    pub brain: CpgNetwork,
}

impl ModularRobot {
    /// Simulatable geometry and a fresh controller for it.
    #[must_use]
    pub fn make_actor_and_controller(&self) -> (Actor, CpgController) {
        (
            Actor::from_body(&self.body),
            CpgController::new(self.brain.clone()),
        )
    }
}

#[must_use]
pub fn develop(genotype: &Genotype, max_modules: usize, substrate: SubstrateDimensions) -> ModularRobot {
    let body = develop_body(&genotype.body, max_modules, substrate);
    let brain = CpgNetwork::develop(&genotype.brain, &body);
    ModularRobot { body, brain }
}
