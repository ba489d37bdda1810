mod common;

use common::{resume, snapshot, RunBuilder};
use evorobo_io::DbOptimizerState;
use evorobo_lib::EaError;
use rusqlite::Connection;

#[test]
fn test_resume_matches_uninterrupted_run() {
    let mut full = RunBuilder::new().with_generations(4).start();
    full.run().unwrap();

    let mut partial = RunBuilder::new().with_generations(4).start();
    partial.step().unwrap();
    partial.step().unwrap();
    assert_eq!(partial.generation_index(), 2);

    let mut resumed = resume(partial.into_connection(), false).unwrap();
    assert_eq!(resumed.generation_index(), 2);
    assert_eq!(resumed.policy().num_generations(), 4);
    resumed.run().unwrap();

    assert_eq!(resumed.generation_index(), 4);
    assert_eq!(snapshot(&resumed), snapshot(&full));
    assert_eq!(
        DbOptimizerState::all(resumed.connection(), 0).unwrap(),
        DbOptimizerState::all(full.connection(), 0).unwrap()
    );
}

#[test]
fn test_resume_from_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study").join("exp").join("run_1");

    let conn = evorobo_io::open_database_sqlite(&path).unwrap();
    let mut first = RunBuilder::new().with_generations(2).start_on(conn);
    first.step().unwrap();
    drop(first);

    let conn = evorobo_io::open_database_sqlite(&path).unwrap();
    assert!(evorobo_lib::ea::run_exists(&conn, 0).unwrap());
    let mut resumed = resume(conn, false).unwrap();
    assert_eq!(resumed.generation_index(), 1);
    resumed.run().unwrap();
    assert_eq!(
        DbOptimizerState::count(resumed.connection(), 0).unwrap(),
        3
    );
}

#[test]
fn test_resume_of_finished_run_does_nothing() {
    let mut optimizer = RunBuilder::new().with_generations(1).start();
    optimizer.run().unwrap();
    let before = snapshot(&optimizer);

    let mut resumed = resume(optimizer.into_connection(), false).unwrap();
    resumed.run().unwrap();
    assert_eq!(resumed.generation_index(), 1);
    assert_eq!(snapshot(&resumed), before);
    assert_eq!(DbOptimizerState::count(resumed.connection(), 0).unwrap(), 2);
}

#[test]
fn test_resume_on_empty_database_is_incompatible() {
    let conn = Connection::open_in_memory().unwrap();
    assert!(!evorobo_lib::ea::run_exists(&conn, 0).unwrap());
    assert!(matches!(resume(conn, false), Err(EaError::Incompatible(_))));
}

#[test]
fn test_resume_without_ea_row_is_incompatible() {
    let conn = Connection::open_in_memory().unwrap();
    evorobo_io::create_tables(&conn).unwrap();
    assert!(matches!(resume(conn, false), Err(EaError::Incompatible(_))));
}

#[test]
fn test_resume_without_checkpoint_is_incompatible() {
    let optimizer = RunBuilder::new().start();
    let conn = optimizer.into_connection();
    conn.execute("DELETE FROM optimizer", []).unwrap();
    assert!(matches!(resume(conn, false), Err(EaError::Incompatible(_))));
}

#[test]
fn test_resume_past_num_generations_is_incompatible() {
    let mut optimizer = RunBuilder::new().with_generations(2).start();
    optimizer.run().unwrap();
    let conn = optimizer.into_connection();
    conn.execute("UPDATE optimizer SET num_generations = 1", [])
        .unwrap();
    assert!(matches!(resume(conn, false), Err(EaError::Incompatible(_))));
}

#[test]
fn test_resume_with_other_schema_version_is_incompatible() {
    let optimizer = RunBuilder::new().start();
    let conn = optimizer.into_connection();
    conn.pragma_update(None, "user_version", 99).unwrap();
    assert!(matches!(resume(conn, false), Err(EaError::Incompatible(_))));
}
