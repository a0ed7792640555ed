use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use seabird_core::{AllocationRun, Grid};

use crate::config::RunConfig;
use crate::error::{Result, StoreError};
use crate::schema;

/// SQLite archive of allocation runs.
pub struct Store {
    conn: Connection,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub id: Uuid,
    pub created_at: String,
    pub colony_count: usize,
    pub skipped_count: usize,
    pub group_count: usize,
    pub cell_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArchivedRow {
    pub cell_id: u32,
    pub botz: f64,
    pub boundary: bool,
    pub eligible: bool,
    pub abundance: f64,
    /// `None` when the group could not be normalized.
    pub proportion: Option<f64>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Save ---

    /// Archive a finished run with a JSON snapshot of its config. Groups
    /// that failed normalization keep their raw abundance with a NULL
    /// proportion.
    pub fn save_run(&self, run: &AllocationRun, grid: &Grid, config: &RunConfig) -> Result<Uuid> {
        let config_json = serde_json::to_string(config)?;
        let rule = &config.eligibility;
        let run_id = Uuid::new_v4();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO runs (id, config, colony_count, skipped_count, group_count, cell_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run_id.to_string(),
                config_json,
                run.colonies.len() as i64,
                run.skipped.len() as i64,
                run.table.groups.len() as i64,
                grid.len() as i64,
            ],
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO abundance (run_id, group_label, cell_id, botz, boundary, eligible, abundance, proportion)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for row in &run.table.rows {
                let Some(cell) = grid.get(row.cell_id) else {
                    continue;
                };
                let proportion = run
                    .distribution(&row.group)
                    .and_then(|d| d.rows.iter().find(|r| r.cell_id == row.cell_id))
                    .map(|r| r.proportion);
                insert.execute(params![
                    run_id.to_string(),
                    row.group,
                    row.cell_id,
                    cell.botz,
                    cell.boundary as i32,
                    rule.is_eligible(cell) as i32,
                    row.abundance,
                    proportion,
                ])?;
            }

            let mut skip = tx.prepare(
                "INSERT INTO skipped (run_id, survey_id, site_id, species, reason) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for s in &run.skipped {
                skip.execute(params![
                    run_id.to_string(),
                    s.colony.survey_id,
                    s.colony.site_id,
                    s.colony.species,
                    s.reason.to_string(),
                ])?;
            }

            let mut condition =
                tx.prepare("INSERT INTO conditions (run_id, message) VALUES (?1, ?2)")?;
            for message in run.failures.iter().chain(run.warnings()) {
                condition.execute(params![run_id.to_string(), message.to_string()])?;
            }
        }

        tx.commit()?;
        tracing::info!("archived run {run_id}");
        Ok(run_id)
    }

    // --- Load ---

    pub fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, colony_count, skipped_count, group_count, cell_count
             FROM runs ORDER BY created_at, rowid",
        )?;
        let rows: Vec<(String, String, i64, i64, i64, i64)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(id, created_at, colonies, skipped, groups, cells)| {
                Ok(RunSummary {
                    id: parse_uuid(&id)?,
                    created_at,
                    colony_count: colonies as usize,
                    skipped_count: skipped as usize,
                    group_count: groups as usize,
                    cell_count: cells as usize,
                })
            })
            .collect()
    }

    pub fn run_config(&self, run_id: Uuid) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT config FROM runs WHERE id = ?1",
                [run_id.to_string()],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn load_group(&self, run_id: Uuid, group: &str) -> Result<Vec<ArchivedRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT cell_id, botz, boundary, eligible, abundance, proportion
             FROM abundance WHERE run_id = ?1 AND group_label = ?2 ORDER BY cell_id",
        )?;
        let rows = stmt
            .query_map(params![run_id.to_string(), group], |row| {
                Ok(ArchivedRow {
                    cell_id: row.get(0)?,
                    botz: row.get(1)?,
                    boundary: row.get::<_, i32>(2)? != 0,
                    eligible: row.get::<_, i32>(3)? != 0,
                    abundance: row.get(4)?,
                    proportion: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn load_conditions(&self, run_id: Uuid) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT message FROM conditions WHERE run_id = ?1 ORDER BY rowid")?;
        let rows = stmt
            .query_map([run_id.to_string()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    pub fn skipped_count(&self, run_id: Uuid) -> Result<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM skipped WHERE run_id = ?1",
            [run_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("bad UUID '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPolygon, Point, polygon};
    use seabird_core::{
        AllocationConfig, Colony, ColonyKey, GridCell, LandMask, run_allocation,
    };

    fn rect(x0: f64, x1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: -50_000.0),
            (x: x1, y: -50_000.0),
            (x: x1, y: 50_000.0),
            (x: x0, y: 50_000.0),
        ]])
    }

    fn grid() -> Grid {
        Grid::new(vec![
            GridCell::new(0, rect(-50_000.0, 0.0), false, -30.0),
            GridCell::new(1, rect(0.0, 50_000.0), false, -30.0),
            GridCell::new(2, rect(50_000.0, 100_000.0), true, -30.0),
        ])
        .unwrap()
    }

    fn config() -> RunConfig {
        RunConfig::parse(
            "[inputs]\ncolonies = \"c.csv\"\nradii = \"r.csv\"\ngrid = \"g.geojson\"\n",
        )
        .unwrap()
    }

    fn run(grid: &Grid) -> AllocationRun {
        let colonies = vec![
            Colony::new(
                ColonyKey::new("S1", "a", "ARTE"),
                "terns",
                Point::new(0.0, 0.0),
                200.0,
                Some(10.0),
            ),
            Colony::new(
                ColonyKey::new("S1", "b", "GBBG"),
                "gulls",
                Point::new(0.0, 0.0),
                20.0,
                Some(0.0),
            ),
            Colony::new(
                ColonyKey::new("S1", "c", "XXXX"),
                "unknown",
                Point::new(0.0, 0.0),
                5.0,
                None,
            ),
        ];
        run_allocation(&colonies, &LandMask::empty(), grid, &AllocationConfig::default())
    }

    #[test]
    fn test_save_and_list() {
        let store = Store::open_in_memory().unwrap();
        let grid = grid();
        let id = store.save_run(&run(&grid), &grid, &config()).unwrap();

        let runs = store.list_runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, id);
        assert_eq!(runs[0].colony_count, 2);
        assert_eq!(runs[0].skipped_count, 1);
        assert_eq!(runs[0].group_count, 2);
        assert_eq!(runs[0].cell_count, 3);
        let snapshot = store.run_config(id).unwrap().unwrap();
        let restored: RunConfig = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(restored, config());
        assert_eq!(store.skipped_count(id).unwrap(), 1);
    }

    #[test]
    fn test_group_rows_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let grid = grid();
        let id = store.save_run(&run(&grid), &grid, &config()).unwrap();

        let terns = store.load_group(id, "terns").unwrap();
        assert_eq!(terns.len(), 3);
        assert!((terns[0].abundance - 100.0).abs() < 1e-6);
        assert_eq!(terns[0].proportion.map(|p| (p * 2.0).round()), Some(1.0));
        assert!(terns[2].boundary);
        assert!(!terns[2].eligible);
        assert_eq!(terns[2].proportion, Some(0.0));
    }

    #[test]
    fn test_failed_group_keeps_abundance_without_proportion() {
        let store = Store::open_in_memory().unwrap();
        let grid = grid();
        let id = store.save_run(&run(&grid), &grid, &config()).unwrap();

        let gulls = store.load_group(id, "gulls").unwrap();
        assert_eq!(gulls.len(), 3);
        assert!(gulls.iter().all(|r| r.proportion.is_none() && r.abundance == 0.0));
        let conditions = store.load_conditions(id).unwrap();
        assert_eq!(conditions.len(), 1);
        assert!(conditions[0].contains("gulls"));
    }

    #[test]
    fn test_floor_warning_is_archived_with_table() {
        let store = Store::open_in_memory().unwrap();
        let grid = grid();
        // Buffer entirely inside cell 0; cell 1 must be floored.
        let colonies = vec![Colony::new(
            ColonyKey::new("S2", "a", "ARTE"),
            "terns",
            Point::new(-25_000.0, 0.0),
            200.0,
            Some(10.0),
        )];
        let run = run_allocation(&colonies, &LandMask::empty(), &grid, &AllocationConfig::default());
        let id = store.save_run(&run, &grid, &config()).unwrap();

        let terns = store.load_group(id, "terns").unwrap();
        assert!(terns.iter().all(|r| r.proportion.is_some()));
        assert_eq!(terns[1].proportion, Some(1.0));
        let conditions = store.load_conditions(id).unwrap();
        assert_eq!(conditions.len(), 1);
        assert!(conditions[0].contains("zero-floor"));
    }

    #[test]
    fn test_unknown_run_config_is_none() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.run_config(Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn test_open_file_creates_parent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("runs.db");
        let store = Store::open(&path).unwrap();
        assert!(store.list_runs().unwrap().is_empty());
        assert!(path.exists());
    }
}
