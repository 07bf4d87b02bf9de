use std::time::{Duration, Instant};

use herald_db::{connect_with_retry, create_pool, run_migrations, DbRuntimeSettings, PoolError};

#[test]
fn db_initialization_works() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("herald.db");
    let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default())
        .expect("failed to create pool");
    let conn = pool.get().expect("failed to get connection");
    let applied = run_migrations(&conn).expect("failed to run migrations");
    assert_eq!(applied, 2);

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .expect("failed to prepare table query");
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .expect("failed to execute table query")
        .map(|r| r.expect("failed to read table name"))
        .collect();

    assert_eq!(
        tables,
        vec!["_herald_migrations", "stream_entries", "subscribers"]
    );
}

#[test]
fn migrated_schema_is_visible_to_other_pooled_connections() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("herald.db");
    let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default())
        .expect("failed to create pool");

    let first = pool.get().expect("first connection");
    run_migrations(&first).expect("migrations");

    let second = pool.get().expect("second connection");
    let count: i64 = second
        .query_row("SELECT COUNT(*) FROM subscribers", [], |row| row.get(0))
        .expect("subscribers table should be visible");
    assert_eq!(count, 0);
}

#[test]
fn connect_with_retry_succeeds_on_first_attempt() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("herald.db");
    let pool = connect_with_retry(
        path.to_str().unwrap(),
        DbRuntimeSettings::default(),
        3,
        Duration::from_secs(10),
    )
    .expect("should connect");
    assert!(pool.get().is_ok());
}

#[test]
fn connect_with_retry_gives_up_after_all_attempts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing").join("nested").join("herald.db");
    let settings = DbRuntimeSettings {
        connect_timeout_ms: 100,
        ..DbRuntimeSettings::default()
    };

    let started = Instant::now();
    let err = connect_with_retry(
        path.to_str().unwrap(),
        settings,
        3,
        Duration::from_millis(20),
    )
    .expect_err("a database inside a missing directory cannot be opened");

    match err {
        PoolError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(
        started.elapsed() >= Duration::from_millis(40),
        "should sleep between attempts"
    );
}
