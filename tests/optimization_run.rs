mod common;

use common::{snapshot, RunBuilder};
use evorobo_core::RunRng;
use evorobo_data::InnovationDatabase;
use evorobo_io::ea::{load_parents, DbEaGeneration, DbEaOptimizer};
use evorobo_io::DbOptimizerState;
use evorobo_lib::ea::DEFAULT_ENV_CONDITIONS_ID;

#[test]
fn test_scenario_without_simulation_writes_one_checkpoint_per_generation() {
    let mut optimizer = RunBuilder::new()
        .with_sizes(10, 10)
        .with_generations(3)
        .start();
    optimizer.run().unwrap();

    assert_eq!(optimizer.generation_index(), 3);
    assert_eq!(optimizer.population().len(), 10);

    let conn = optimizer.connection();
    let rows = DbOptimizerState::all(conn, 0).unwrap();
    let indices: Vec<usize> = rows.iter().map(|r| r.generation_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert!(rows.iter().all(|r| r.num_generations == 3));

    let ea_row = DbEaOptimizer::load(conn, 0).unwrap().unwrap();
    assert_eq!(ea_row.generation_index, 3);
    assert_eq!(ea_row.next_individual_id, 40);

    for generation in 0..=3 {
        let members = DbEaGeneration::load(conn, 0, generation, DEFAULT_ENV_CONDITIONS_ID).unwrap();
        assert_eq!(members.len(), 10, "generation {generation}");
    }
}

#[test]
fn test_population_order_and_measures() {
    let mut optimizer = RunBuilder::new().with_generations(2).start();
    optimizer.run().unwrap();

    for individual in optimizer.population() {
        // Without simulation there is no speed, so fitness falls back to zero.
        assert_eq!(individual.fitness, 0.0);
        assert!(individual.measures.get("modules_count").is_some());
        assert!(individual.measures.get("speed_y").is_none());
    }

    let ids: Vec<u64> = optimizer.population().iter().map(|i| i.id).collect();
    let old: Vec<u64> = ids.iter().copied().filter(|&id| id < 20).collect();
    let new: Vec<u64> = ids.iter().copied().filter(|&id| id >= 20).collect();
    // Old survivors first, each part in ascending order.
    assert_eq!(ids, old.iter().chain(&new).copied().collect::<Vec<_>>());
    assert!(old.windows(2).all(|w| w[0] < w[1]));
    assert!(new.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_offspring_record_two_distinct_parents() {
    let mut optimizer = RunBuilder::new().with_generations(1).start();
    optimizer.run().unwrap();
    let conn = optimizer.connection();
    for child in 10..20 {
        let parents = load_parents(conn, 0, child).unwrap();
        assert_eq!(parents.len(), 2);
        assert_ne!(parents[0], parents[1]);
        assert!(parents.iter().all(|&p| p < 10));
    }
}

#[test]
fn test_fixed_seed_runs_are_identical() {
    let run = || {
        let mut optimizer = RunBuilder::new().with_seed(7).start();
        optimizer.run().unwrap();
        let rows = DbOptimizerState::all(optimizer.connection(), 0).unwrap();
        (snapshot(&optimizer), rows)
    };
    let (pop_a, rows_a) = run();
    let (pop_b, rows_b) = run();
    assert_eq!(pop_a, pop_b);
    assert_eq!(rows_a, rows_b);

    let mut other = RunBuilder::new().with_seed(8).start();
    other.run().unwrap();
    assert_ne!(snapshot(&other), pop_a);
}

#[test]
fn test_checkpoint_restores_policy_state() {
    let mut optimizer = RunBuilder::new().start();
    optimizer.run().unwrap();
    let latest = DbOptimizerState::latest(optimizer.connection(), 0)
        .unwrap()
        .unwrap();
    assert_eq!(latest.generation_index, 3);

    let policy = optimizer.policy();
    let rng = RunRng::from_bytes(&latest.rng).unwrap();
    assert_eq!(rng.state(), policy.rng().state());
    assert_eq!(
        &InnovationDatabase::deserialize(&latest.innov_db_body).unwrap(),
        policy.innov_db_body()
    );
    assert_eq!(
        &InnovationDatabase::deserialize(&latest.innov_db_brain).unwrap(),
        policy.innov_db_brain()
    );
}

#[test]
fn test_run_with_simulation_stores_states() {
    let mut optimizer = RunBuilder::new()
        .with_sizes(4, 2)
        .with_generations(1)
        .with_simulation(1)
        .start();
    optimizer.run().unwrap();

    let conn = optimizer.connection();
    for id in 0..6 {
        let trace = evorobo_io::ea::load_states(conn, 0, id, DEFAULT_ENV_CONDITIONS_ID)
            .unwrap()
            .expect("simulated individuals keep their trace");
        let value: serde_json::Value = serde_json::from_str(&trace).unwrap();
        // 1 s at 5 Hz plus the initial sample.
        assert_eq!(value.as_object().unwrap().len(), 6);
    }
    assert!(optimizer
        .population()
        .iter()
        .all(|i| i.measures.get("speed_y").is_some()));
}

#[test]
fn test_failed_generation_leaves_optimizer_unchanged() {
    let mut optimizer = RunBuilder::new().with_generations(2).start();
    let before = snapshot(&optimizer);
    optimizer
        .connection()
        .execute_batch("DROP TABLE optimizer;")
        .unwrap();

    assert!(optimizer.step().is_err());
    assert_eq!(optimizer.generation_index(), 0);
    assert_eq!(snapshot(&optimizer), before);
    let ea_row = DbEaOptimizer::load(optimizer.connection(), 0).unwrap().unwrap();
    assert_eq!(ea_row.generation_index, 0);
    assert_eq!(ea_row.next_individual_id, 10);

    evorobo_io::create_tables(optimizer.connection()).unwrap();
    optimizer.step().unwrap();
    assert_eq!(optimizer.generation_index(), 1);
    let ea_row = DbEaOptimizer::load(optimizer.connection(), 0).unwrap().unwrap();
    assert_eq!(ea_row.generation_index, 1);
    assert_eq!(ea_row.next_individual_id, 20);
    assert!(optimizer.population().iter().all(|i| i.id < 20));
}
