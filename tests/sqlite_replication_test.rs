use dbsplit::adapter::{AdapterConfig, DatabaseAdapter, SqliteAdapter};
use dbsplit::profiling::ProfilerSettings;
use dbsplit::query::StatementClass;
use dbsplit::session::ReplicationAdapter;
use dbsplit::types::Value;
use dbsplit::DbSplitError;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Create `name.db` holding a one-row `origin` table labelled `name`
fn seed(dir: &TempDir, name: &str) -> String {
    let path = dir.path().join(format!("{name}.db")).to_string_lossy().to_string();
    let mut db = SqliteAdapter::new(AdapterConfig::new(name, &path));
    db.query("CREATE TABLE origin (id INTEGER PRIMARY KEY, name TEXT NOT NULL)", &[])
        .unwrap();
    db.insert("origin", &[("name", Value::from(name))]).unwrap();
    db.close_connection().unwrap();
    path
}

fn split_router(dir: &TempDir) -> ReplicationAdapter {
    let primary = seed(dir, "primary");
    let replica = seed(dir, "replica");
    ReplicationAdapter::with_replica(
        Box::new(SqliteAdapter::new(AdapterConfig::new("primary", primary))),
        Box::new(SqliteAdapter::new(
            AdapterConfig::new("replica", replica).with_read_only(true),
        )),
    )
}

fn names(router: &mut ReplicationAdapter) -> Vec<Value> {
    router
        .fetch_col("SELECT name FROM origin ORDER BY id", &[])
        .unwrap()
}

#[test]
fn test_reads_and_writes_split_across_files() {
    let dir = TempDir::new().unwrap();
    let mut router = split_router(&dir);

    assert_eq!(names(&mut router), vec![Value::from("replica")]);

    let changed = router
        .query("INSERT INTO origin (name) VALUES (?)", &[Value::from("written")])
        .unwrap();
    assert_eq!(changed.rows_affected, 1);
    assert_eq!(router.last_insert_id(None, None).unwrap(), Some(2));

    // the write landed on the primary file only
    assert_eq!(names(&mut router), vec![Value::from("replica")]);
    router.begin_transaction().unwrap();
    assert_eq!(
        names(&mut router),
        vec![Value::from("primary"), Value::from("written")]
    );
    router.commit().unwrap();
}

#[test]
fn test_read_your_writes_inside_transaction() {
    let dir = TempDir::new().unwrap();
    let mut router = split_router(&dir);

    router.begin_transaction().unwrap();
    router
        .insert("origin", &[("name", Value::from("pending"))])
        .unwrap();
    assert_eq!(
        names(&mut router),
        vec![Value::from("primary"), Value::from("pending")]
    );
    router.rollback().unwrap();

    router.begin_transaction().unwrap();
    assert_eq!(names(&mut router), vec![Value::from("primary")]);
    router.commit().unwrap();
}

#[test]
fn test_shared_file_replica_sees_committed_writes() {
    let dir = TempDir::new().unwrap();
    let path = seed(&dir, "shared");
    let mut router = ReplicationAdapter::with_replica(
        Box::new(SqliteAdapter::new(AdapterConfig::new("primary", &path))),
        Box::new(SqliteAdapter::new(
            AdapterConfig::new("replica", &path).with_read_only(true),
        )),
    );

    router.begin_transaction().unwrap();
    router
        .update("origin", &[("name", Value::from("renamed"))], &["id = 1"])
        .unwrap();
    assert_eq!(names(&mut router), vec![Value::from("renamed")]);
    router.commit().unwrap();

    // back on the replica connection, which reads the committed row
    assert_eq!(names(&mut router), vec![Value::from("renamed")]);
    assert_eq!(
        router.replica().unwrap().profiler().total_num_queries(),
        0,
        "profiling was never enabled"
    );
}

#[test]
fn test_writes_never_reach_read_only_replica() {
    let dir = TempDir::new().unwrap();
    let mut router = split_router(&dir);

    router.delete("origin", &[]).unwrap();
    router.query("DROP TABLE origin", &[]).unwrap();

    // replica data is intact
    assert_eq!(names(&mut router), vec![Value::from("replica")]);
    assert_eq!(router.list_tables().unwrap(), Vec::<String>::new());
}

#[test]
fn test_replica_rejects_direct_writes() {
    let dir = TempDir::new().unwrap();
    let path = seed(&dir, "replica");
    let mut replica = SqliteAdapter::new(AdapterConfig::new("replica", path).with_read_only(true));

    let err = replica
        .query("INSERT INTO origin (name) VALUES ('x')", &[])
        .unwrap_err();
    assert!(matches!(err, DbSplitError::Sqlite(_)));
}

#[test]
fn test_missing_replica_file_fails_get_connection_after_primary() {
    let dir = TempDir::new().unwrap();
    let primary = seed(&dir, "primary");
    let missing = dir.path().join("missing.db").to_string_lossy().to_string();
    let mut router = ReplicationAdapter::with_replica(
        Box::new(SqliteAdapter::new(AdapterConfig::new("primary", primary))),
        Box::new(SqliteAdapter::new(
            AdapterConfig::new("replica", missing).with_read_only(true),
        )),
    );

    assert!(router.get_connection().is_err());
    assert!(router.primary().is_connected());
    assert!(!router.replica().unwrap().is_connected());
    assert!(router.is_connected());
}

#[test]
fn test_profiler_mirrored_to_both_sides() {
    let dir = TempDir::new().unwrap();
    let mut router = split_router(&dir);
    router.set_profiler(ProfilerSettings::enabled()).unwrap();

    names(&mut router);
    router
        .query("UPDATE origin SET name = 'x' WHERE id = 1", &[])
        .unwrap();
    names(&mut router);

    let primary = router.primary().profiler();
    assert_eq!(primary.total_num_queries(), 1);
    assert_eq!(primary.total_num_queries_of(StatementClass::Write), 1);

    let replica = router.replica().unwrap().profiler();
    assert_eq!(replica.total_num_queries_of(StatementClass::Read), 2);
    assert_eq!(
        replica.last_query_profile().unwrap().query,
        "SELECT name FROM origin ORDER BY id"
    );
}

#[test]
fn test_metadata_comes_from_primary() {
    let dir = TempDir::new().unwrap();
    let mut router = split_router(&dir);

    router
        .query("CREATE TABLE primary_only (id INTEGER PRIMARY KEY, note VARCHAR(40))", &[])
        .unwrap();
    let mut tables = router.list_tables().unwrap();
    tables.sort();
    assert_eq!(tables, vec!["origin".to_string(), "primary_only".to_string()]);

    let columns = router.describe_table("primary_only", None).unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[1].column_name, "note");
    assert_eq!(columns[1].length, Some(40));
}
