//! The experiment's evolutionary policy.
//!
//! Parents are drawn by 2-tournaments, offspring are produced by crossover and
//! mutation of the CPPN genotype, and survivors are chosen steady-state from
//! the old and new populations together. Fitness comes from simulating every
//! offspring in its own environment of one batch.
//!
//! The policy owns the run's random number generator and both innovation
//! databases; their state is appended to the `optimizer` table once per
//! generation, inside the generation's transaction.

use crate::ea::{EaOptimizer, EaPolicy, EaSettings, Evaluation, ProcessIdGen};
use crate::error::{EaError, Result};
use evorobo_core::config::MutationConfig;
use evorobo_core::controller::{ActorController, CpgController};
use evorobo_core::genotype::{self, ModularRobot};
use evorobo_core::measure::Measure;
use evorobo_core::physics::{
    Actor, ActorControl, Batch, ControlFn, Environment, LocalRunner, PosedActor, Runner,
};
use evorobo_core::population_management::steady_state;
use evorobo_core::rng::RunRng;
use evorobo_core::selection::{multiple_unique, tournament};
use evorobo_data::{
    ActorState, BatchState, EnvConditions, Genotype, InnovationDatabase, Quaternion, Vector3,
};
use evorobo_io::DbOptimizerState;
use rusqlite::Connection;
use std::collections::BTreeMap;

/// Tournament size for both parent and survivor selection.
const TOURNAMENT_SIZE: usize = 2;

/// Timing of every simulated batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationSettings {
    /// Seconds per evaluation.
    pub simulation_time: u32,
    pub sampling_frequency: f64,
    pub control_frequency: f64,
}

pub struct Optimizer {
    runner: Box<dyn Runner>,
    rng: RunRng,
    innov_db_body: InnovationDatabase,
    innov_db_brain: InnovationDatabase,
    simulation: SimulationSettings,
    mutation: MutationConfig,
    num_generations: usize,
    run_simulation: bool,
}

impl Optimizer {
    /// Starts a new run: evaluates `initial_population` and stores it as
    /// generation 0 together with the first checkpoint.
    #[allow(clippy::too_many_arguments)]
    pub fn new_run(
        conn: Connection,
        process_id: u64,
        process_id_gen: ProcessIdGen,
        initial_population: Vec<Genotype>,
        rng: RunRng,
        innov_db_body: InnovationDatabase,
        innov_db_brain: InnovationDatabase,
        settings: EaSettings,
        simulation: SimulationSettings,
        mutation: MutationConfig,
        num_generations: usize,
        run_simulation: bool,
    ) -> Result<EaOptimizer<Self>> {
        let policy = Self {
            runner: Box::new(LocalRunner::new(true)),
            rng,
            innov_db_body,
            innov_db_brain,
            simulation,
            mutation,
            num_generations,
            run_simulation,
        };
        tracing::info!(
            process_id,
            population = settings.population_size,
            offspring = settings.offspring_size,
            num_generations,
            run_simulation,
            "Starting new run"
        );
        EaOptimizer::new(
            conn,
            process_id,
            process_id_gen,
            initial_population,
            settings,
            policy,
        )
    }

    /// Resumes the run stored for `process_id`.
    ///
    /// The generator and both innovation databases are overwritten with the
    /// latest checkpoint; timings and the generation count come from the
    /// database, not from the caller. `mutation` is not checkpointed.
    #[allow(clippy::too_many_arguments)]
    pub fn from_database(
        conn: Connection,
        process_id: u64,
        process_id_gen: ProcessIdGen,
        mut rng: RunRng,
        mut innov_db_body: InnovationDatabase,
        mut innov_db_brain: InnovationDatabase,
        mutation: MutationConfig,
        run_simulation: bool,
    ) -> Result<EaOptimizer<Self>> {
        evorobo_io::check_schema_version(&conn)
            .map_err(|e| EaError::incompatible(e.to_string()))?;
        let ea_row = evorobo_io::ea::DbEaOptimizer::load(&conn, process_id)?.ok_or_else(|| {
            EaError::incompatible(format!("no EA row for process {process_id}"))
        })?;
        let checkpoint = DbOptimizerState::latest(&conn, process_id)?.ok_or_else(|| {
            EaError::incompatible(format!("no checkpoint for process {process_id}"))
        })?;
        if checkpoint.generation_index != ea_row.generation_index {
            return Err(EaError::incompatible(format!(
                "checkpoint is at generation {} but the population is at {}",
                checkpoint.generation_index, ea_row.generation_index
            )));
        }
        if checkpoint.generation_index > checkpoint.num_generations {
            return Err(EaError::incompatible(format!(
                "checkpoint generation {} exceeds num_generations {}",
                checkpoint.generation_index, checkpoint.num_generations
            )));
        }

        rng.restore(&checkpoint.rng)
            .map_err(|e| EaError::serialization(format!("rng state: {e:#}")))?;
        innov_db_body
            .restore(&checkpoint.innov_db_body)
            .map_err(|e| EaError::serialization(format!("body innovation database: {e:#}")))?;
        innov_db_brain
            .restore(&checkpoint.innov_db_brain)
            .map_err(|e| EaError::serialization(format!("brain innovation database: {e:#}")))?;

        let policy = Self {
            runner: Box::new(LocalRunner::new(true)),
            rng,
            innov_db_body,
            innov_db_brain,
            simulation: SimulationSettings {
                simulation_time: checkpoint.simulation_time,
                sampling_frequency: checkpoint.sampling_frequency,
                control_frequency: checkpoint.control_frequency,
            },
            mutation,
            num_generations: checkpoint.num_generations,
            run_simulation,
        };
        EaOptimizer::from_database(conn, process_id, process_id_gen, policy)
    }

    #[must_use]
    pub fn rng(&self) -> &RunRng {
        &self.rng
    }

    #[must_use]
    pub fn innov_db_body(&self) -> &InnovationDatabase {
        &self.innov_db_body
    }

    #[must_use]
    pub fn innov_db_brain(&self) -> &InnovationDatabase {
        &self.innov_db_brain
    }

    #[must_use]
    pub fn simulation(&self) -> SimulationSettings {
        self.simulation
    }

    #[must_use]
    pub fn mutation(&self) -> &MutationConfig {
        &self.mutation
    }

    #[must_use]
    pub fn num_generations(&self) -> usize {
        self.num_generations
    }

    fn simulate(&mut self, phenotypes: &[ModularRobot]) -> Result<Vec<BatchState>> {
        let (environments, mut controllers): (Vec<Environment>, Vec<CpgController>) = phenotypes
            .iter()
            .map(|phenotype| {
                let (actor, controller) = phenotype.make_actor_and_controller();
                let mut env = Environment::new(EnvConditions::default());
                env.actors.push(pose_upright(actor, Quaternion::identity()));
                (env, controller)
            })
            .unzip();

        let control: ControlFn<'_> = Box::new(|dt: f64, control: &mut ActorControl| {
            for (env_index, controller) in controllers.iter_mut().enumerate() {
                controller.step(dt);
                control.set_dof_targets(env_index, 0, controller.dof_targets());
            }
        });
        let mut batch = Batch::new(
            self.simulation.simulation_time,
            self.simulation.sampling_frequency,
            self.simulation.control_frequency,
            control,
        );
        batch.environments = environments;
        Ok(self.runner.run_batch(batch)?)
    }
}

/// Places `actor` so its bounding box rests on the ground.
pub fn pose_upright(actor: Actor, orientation: Quaternion) -> PosedActor {
    let aabb = actor.calc_aabb();
    let dof_states = vec![0.0; actor.dof_count()];
    PosedActor {
        position: Vector3::new(0.0, 0.0, aabb.size.z / 2.0 - aabb.offset.z),
        orientation,
        dof_states,
        actor,
    }
}

/// Trace of one environment's first actor, keyed by sample index.
pub fn serialize_states(states: &[BatchState], env_index: usize) -> Result<String> {
    let trace: BTreeMap<usize, &ActorState> = states
        .iter()
        .enumerate()
        .filter_map(|(step, state)| {
            state
                .envs
                .get(env_index)
                .and_then(|env| env.actor_states.first())
                .map(|actor| (step, actor))
        })
        .collect();
    Ok(evorobo_io::to_json(&trace)?)
}

impl EaPolicy for Optimizer {
    fn select_parents(
        &mut self,
        population: &[Genotype],
        fitnesses: &[f64],
        num_parent_groups: usize,
    ) -> Vec<Vec<usize>> {
        let rng = &mut self.rng;
        (0..num_parent_groups)
            .map(|_| {
                multiple_unique(population, fitnesses, 2, |_, f| {
                    tournament(rng, f, TOURNAMENT_SIZE)
                })
            })
            .collect()
    }

    fn select_survivors(
        &mut self,
        old_individuals: &[Genotype],
        old_fitnesses: &[f64],
        new_individuals: &[Genotype],
        new_fitnesses: &[f64],
        num_survivors: usize,
    ) -> (Vec<usize>, Vec<usize>) {
        assert_eq!(
            old_individuals.len(),
            num_survivors,
            "steady-state selection keeps the population size"
        );
        let rng = &mut self.rng;
        steady_state(
            old_individuals,
            old_fitnesses,
            new_individuals,
            new_fitnesses,
            |_, f| tournament(rng, f, TOURNAMENT_SIZE),
        )
    }

    fn crossover(&mut self, parents: &[&Genotype]) -> Genotype {
        assert_eq!(parents.len(), 2, "crossover takes exactly two parents");
        genotype::crossover(parents[0], parents[1], &mut self.rng)
    }

    fn mutate(&mut self, genotype: &Genotype) -> Genotype {
        genotype::mutate_with_config(
            genotype,
            &mut self.innov_db_body,
            &mut self.innov_db_brain,
            &self.mutation,
            &mut self.rng,
        )
    }

    fn evaluate_generation(
        &mut self,
        genotypes: &[Genotype],
        settings: &EaSettings,
        generation_index: usize,
    ) -> Result<Evaluation> {
        let phenotypes: Vec<ModularRobot> = genotypes
            .iter()
            .map(|g| genotype::develop(g, settings.max_modules, settings.substrate))
            .collect();

        let states = if self.run_simulation {
            Some(self.simulate(&phenotypes)?)
        } else {
            None
        };

        let mut measures = Vec::with_capacity(genotypes.len());
        let mut traces = Vec::with_capacity(genotypes.len());
        for (idx, g) in genotypes.iter().enumerate() {
            // Measured on a fresh development.
            let phenotype = genotype::develop(g, settings.max_modules, settings.substrate);
            measures.push(
                Measure {
                    states: states.as_deref(),
                    genotype_idx: idx,
                    phenotype: &phenotype,
                    generation: generation_index,
                    simulation_time: self.simulation.simulation_time,
                }
                .measure_all_non_relative(),
            );
            traces.push(match &states {
                Some(states) => Some(serialize_states(states, idx)?),
                None => None,
            });
        }

        tracing::debug!(
            generation = generation_index,
            individuals = genotypes.len(),
            simulated = self.run_simulation,
            "Evaluated genotypes"
        );

        Ok(Evaluation {
            measures,
            states: traces,
            samples: states.as_ref().map_or(0, Vec::len),
        })
    }

    fn must_do_next_gen(&self, generation_index: usize) -> bool {
        generation_index != self.num_generations
    }

    fn on_generation_checkpoint(
        &self,
        conn: &Connection,
        process_id: u64,
        generation_index: usize,
    ) -> Result<()> {
        let rng = self
            .rng
            .to_bytes()
            .map_err(|e| EaError::serialization(format!("rng state: {e}")))?;
        let innov_db_body = self
            .innov_db_body
            .serialize()
            .map_err(|e| EaError::serialization(format!("body innovation database: {e}")))?;
        let innov_db_brain = self
            .innov_db_brain
            .serialize()
            .map_err(|e| EaError::serialization(format!("brain innovation database: {e}")))?;
        DbOptimizerState {
            process_id,
            generation_index,
            rng,
            innov_db_body,
            innov_db_brain,
            simulation_time: self.simulation.simulation_time,
            sampling_frequency: self.simulation.sampling_frequency,
            control_frequency: self.simulation.control_frequency,
            num_generations: self.num_generations,
        }
        .insert(conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evorobo_core::body::SubstrateDimensions;
    use evorobo_data::EnvironmentState;

    fn settings() -> EaSettings {
        EaSettings {
            population_size: 4,
            offspring_size: 3,
            fitness_measure: "speed_y".to_string(),
            max_modules: 8,
            substrate: SubstrateDimensions::Planar,
        }
    }

    fn policy(run_simulation: bool) -> Optimizer {
        Optimizer {
            runner: Box::new(LocalRunner::new(true)),
            rng: RunRng::seed_from_u64(3),
            innov_db_body: InnovationDatabase::new(),
            innov_db_brain: InnovationDatabase::new(),
            simulation: SimulationSettings {
                simulation_time: 2,
                sampling_frequency: 5.0,
                control_frequency: 10.0,
            },
            mutation: MutationConfig::default(),
            num_generations: 2,
            run_simulation,
        }
    }

    fn population(policy: &mut Optimizer, n: usize) -> Vec<Genotype> {
        (0..n)
            .map(|_| {
                genotype::random(
                    &mut policy.innov_db_body,
                    &mut policy.innov_db_brain,
                    &mut policy.rng,
                    5,
                )
            })
            .collect()
    }

    #[test]
    fn test_parent_groups_are_distinct_pairs() {
        let mut p = policy(false);
        let pop = population(&mut p, 4);
        let groups = p.select_parents(&pop, &[0.1, 0.4, 0.2, 0.3], 10);
        assert_eq!(groups.len(), 10);
        for group in groups {
            assert_eq!(group.len(), 2);
            assert_ne!(group[0], group[1]);
        }
    }

    #[test]
    fn test_survivors_keep_population_size() {
        let mut p = policy(false);
        let old = population(&mut p, 4);
        let new = population(&mut p, 7);
        let (o, n) = p.select_survivors(&old, &[0.0; 4], &new, &[1.0; 7], 4);
        assert_eq!(o.len() + n.len(), 4);
    }

    #[test]
    #[should_panic(expected = "exactly two parents")]
    fn test_crossover_needs_two_parents() {
        let mut p = policy(false);
        let pop = population(&mut p, 1);
        let _ = p.crossover(&[&pop[0]]);
    }

    #[test]
    fn test_evaluation_without_simulation_has_no_states() {
        let mut p = policy(false);
        let pop = population(&mut p, 3);
        let eval = p.evaluate_generation(&pop, &settings(), 4).unwrap();
        assert_eq!(eval.measures.len(), 3);
        assert_eq!(eval.states, vec![None, None, None]);
        assert_eq!(eval.samples, 0);
        for m in &eval.measures {
            assert_eq!(m.get("birth"), Some(4.0));
            assert_eq!(m.get("speed_y"), None);
        }
    }

    #[test]
    fn test_evaluation_with_simulation_is_aligned() {
        let mut p = policy(true);
        let pop = population(&mut p, 3);
        let eval = p.evaluate_generation(&pop, &settings(), 0).unwrap();
        // 2 s sampled at 5 Hz plus the initial sample.
        assert_eq!(eval.samples, 11);
        for (m, trace) in eval.measures.iter().zip(&eval.states) {
            assert!(m.get("speed_y").is_some());
            let trace: BTreeMap<usize, ActorState> =
                serde_json::from_str(trace.as_deref().unwrap()).unwrap();
            assert_eq!(trace.len(), 11);
        }

        // A single-genotype batch measures the same as its slot in the group.
        let alone = p.evaluate_generation(&pop[1..2], &settings(), 0).unwrap();
        assert_eq!(alone.measures[0], eval.measures[1]);
    }

    #[test]
    fn test_mutate_follows_mutation_config() {
        let mut p = policy(false);
        let pop = population(&mut p, 1);
        p.mutation = MutationConfig {
            weight_rate: 0.0,
            add_connection_prob: 0.0,
            add_node_prob: 0.0,
            toggle_enable_prob: 0.0,
            activation_change_prob: 0.0,
            ..MutationConfig::default()
        };
        assert_eq!(p.mutate(&pop[0]), pop[0]);

        p.mutation.weight_rate = 1.0;
        let child = p.mutate(&pop[0]);
        assert_eq!(child.body.connections.len(), pop[0].body.connections.len());
        assert_ne!(child, pop[0]);
    }

    #[test]
    fn test_must_do_next_gen() {
        let p = policy(false);
        assert!(p.must_do_next_gen(0));
        assert!(p.must_do_next_gen(1));
        assert!(!p.must_do_next_gen(2));
    }

    #[test]
    fn test_serialize_states_keys_by_sample() {
        let state = |y: f64| BatchState {
            time_seconds: y,
            envs: vec![EnvironmentState {
                actor_states: vec![ActorState {
                    position: Vector3::new(0.0, y, 0.0),
                    orientation: Quaternion::identity(),
                    dof_state: vec![],
                }],
            }],
        };
        let json = serialize_states(&[state(0.0), state(1.0)], 0).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["1"]["position"]["y"], 1.0);
        assert_eq!(serialize_states(&[state(0.0)], 3).unwrap(), "{}");
    }

    #[test]
    fn test_pose_upright_rests_on_ground() {
        let robot = genotype::develop(
            &population(&mut policy(false), 1)[0],
            8,
            SubstrateDimensions::Planar,
        );
        let (actor, _) = robot.make_actor_and_controller();
        let aabb = actor.calc_aabb();
        let posed = pose_upright(actor, Quaternion::identity());
        assert!((posed.position.z - (aabb.size.z / 2.0 - aabb.offset.z)).abs() < 1e-12);
        assert_eq!(posed.dof_states.len(), posed.actor.dof_count());
    }
}
