use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS runs (
            id            TEXT PRIMARY KEY,
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            config        TEXT NOT NULL DEFAULT '{}',
            colony_count  INTEGER NOT NULL,
            skipped_count INTEGER NOT NULL,
            group_count   INTEGER NOT NULL,
            cell_count    INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS abundance (
            run_id      TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            group_label TEXT NOT NULL,
            cell_id     INTEGER NOT NULL,
            botz        REAL NOT NULL,
            boundary    INTEGER NOT NULL,
            eligible    INTEGER NOT NULL,
            abundance   REAL NOT NULL,
            proportion  REAL,
            PRIMARY KEY (run_id, group_label, cell_id)
        );

        CREATE TABLE IF NOT EXISTS skipped (
            run_id      TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            survey_id   TEXT NOT NULL,
            site_id     TEXT NOT NULL,
            species     TEXT NOT NULL,
            reason      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS conditions (
            run_id      TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            message     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_abundance_run ON abundance(run_id, group_label);
        CREATE INDEX IF NOT EXISTS idx_skipped_run ON skipped(run_id);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        for table in &["metadata", "runs", "abundance", "skipped", "conditions"] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap();
            let expected = if *table == "metadata" { 1 } else { 0 };
            assert_eq!(count, expected, "{table}");
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }
}
