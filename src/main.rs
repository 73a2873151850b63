use anyhow::{Context, Result};
use tracing::info;

use dbsplit::adapter::{DatabaseAdapter, SqliteAdapter};
use dbsplit::config::Config;
use dbsplit::profiling::ProfilerSettings;
use dbsplit::session::ReplicationAdapter;
use dbsplit::types::FetchedRow;

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Begin,
    Commit,
    Rollback,
    Sql(&'a str),
}

impl<'a> Command<'a> {
    /// Transaction control is recognised by its leading keyword so the
    /// router's transaction state follows the primary's. `BEGIN` modifiers
    /// (`DEFERRED`, `IMMEDIATE`, `EXCLUSIVE`) are dropped; the primary opens
    /// its default transaction. `ROLLBACK ... TO` only unwinds a savepoint and
    /// stays plain SQL.
    fn parse(statement: &'a str) -> Self {
        let text = statement.trim().trim_end_matches(';').to_ascii_lowercase();
        let words: Vec<&str> = text.split_whitespace().collect();
        match words.as_slice() {
            ["begin", ..] => Command::Begin,
            ["commit", ..] | ["end", ..] => Command::Commit,
            ["rollback", "to", ..] | ["rollback", "transaction", "to", ..] => Command::Sql(statement),
            ["rollback", ..] => Command::Rollback,
            _ => Command::Sql(statement),
        }
    }
}

fn main() -> Result<()> {
    let config = Config::load();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .with_writer(std::io::stderr)
        .init();

    info!("dbsplit v{}", env!("CARGO_PKG_VERSION"));

    let primary = SqliteAdapter::new(config.primary_config());
    let replica = config
        .replica_config()
        .map(|c| Box::new(SqliteAdapter::new(c)) as Box<dyn DatabaseAdapter>);
    let mut router = ReplicationAdapter::new(Box::new(primary), replica);

    router.set_fetch_mode(config.fetch_mode)?;
    if config.profile {
        router.set_profiler(ProfilerSettings::enabled())?;
    }
    router
        .get_connection()
        .context("Failed to open database connections")?;

    for statement in &config.statements {
        run(&mut router, statement, config.json)
            .with_context(|| format!("Statement failed: {statement}"))?;
    }

    if router.in_transaction() {
        info!("Rolling back transaction left open by the last statement");
        router.rollback()?;
    }

    if config.profile {
        eprintln!("primary: {}", router.primary().profiler().report());
        if let Some(replica) = router.replica() {
            eprintln!("replica: {}", replica.profiler().report());
        }
    }

    router.close_connection()?;
    Ok(())
}

fn run(router: &mut ReplicationAdapter, statement: &str, json: bool) -> Result<()> {
    match Command::parse(statement) {
        Command::Begin => router.begin_transaction()?,
        Command::Commit => router.commit()?,
        Command::Rollback => router.rollback()?,
        Command::Sql(sql) => {
            let route = router.route_for(sql);
            let result = router.query(sql, &[])?;
            if json {
                let rows: Vec<FetchedRow> = result.into_fetched(router.fetch_mode());
                println!("{}", serde_json::json!({ "route": format!("{route:?}"), "rows": rows }));
            } else if result.columns.is_empty() {
                println!("[{route:?}] {} row(s) affected", result.rows_affected);
            } else {
                println!("[{route:?}] {}", result.columns.join(" | "));
                for row in &result.rows {
                    let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                    println!("{}", cells.join(" | "));
                }
            }
        }
    }
    Ok(())
}
