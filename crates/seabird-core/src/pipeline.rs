//! One allocation run, from colonies to normalized group distributions.
//!
//! Each colony is mapped independently to its overlap records (in
//! parallel when enabled), then the records are reduced by group-by-sum.
//! No stage mutates another stage's output.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::aggregate::{AbundanceTable, aggregate};
use crate::buffer::build_buffer;
use crate::colony::{Colony, ColonyKey};
use crate::constants::DEFAULT_UNITS_PER_KM;
use crate::error::AllocError;
use crate::grid::{Eligibility, Grid};
use crate::land::LandMask;
use crate::normalize::{GroupDistribution, normalize};
use crate::overlap::{OverlapRecord, allocate_buffer};

#[derive(Clone, Debug, PartialEq)]
pub struct AllocationConfig {
    /// Planar units per kilometre of foraging radius.
    pub units_per_km: f64,
    /// Map colonies across the rayon pool.
    pub parallel: bool,
    pub eligibility: Eligibility,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            units_per_km: DEFAULT_UNITS_PER_KM,
            parallel: true,
            eligibility: Eligibility::default(),
        }
    }
}

/// A colony that contributed nothing, and why.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedColony {
    pub colony: ColonyKey,
    pub reason: AllocError,
}

/// Per-colony result of the map step.
#[derive(Clone, Debug)]
pub struct ColonyAllocation {
    pub colony: ColonyKey,
    pub group: String,
    pub count: f64,
    pub buffer_area: f64,
    pub records: Vec<OverlapRecord>,
}

impl ColonyAllocation {
    pub fn allocated(&self) -> f64 {
        self.records.iter().map(|r| r.allocated).sum()
    }
}

/// Everything a run produces.
#[derive(Clone, Debug)]
pub struct AllocationRun {
    pub colonies: Vec<ColonyAllocation>,
    pub skipped: Vec<SkippedColony>,
    pub table: AbundanceTable,
    pub distributions: Vec<GroupDistribution>,
    /// Group-level normalization conditions.
    pub failures: Vec<AllocError>,
}

impl AllocationRun {
    pub fn records(&self) -> impl Iterator<Item = &OverlapRecord> {
        self.colonies.iter().flat_map(|c| c.records.iter())
    }

    /// Colonies whose buffer was empty (zero radius, or all land).
    pub fn empty_buffers(&self) -> usize {
        self.colonies.iter().filter(|c| c.buffer_area <= 0.0).count()
    }

    /// Warnings attached to tables that were still produced.
    pub fn warnings(&self) -> impl Iterator<Item = &AllocError> {
        self.distributions.iter().flat_map(|d| d.warnings.iter())
    }

    pub fn distribution(&self, group: &str) -> Option<&GroupDistribution> {
        self.distributions.iter().find(|d| d.group == group)
    }
}

/// Map one colony to its overlap records.
pub fn allocate_colony(
    colony: &Colony,
    land: &LandMask,
    grid: &Grid,
    units_per_km: f64,
) -> Result<ColonyAllocation, SkippedColony> {
    let skip = |reason: AllocError| SkippedColony {
        colony: colony.key.clone(),
        reason,
    };

    let radius_km = colony.radius_km.ok_or_else(|| {
        skip(AllocError::MissingRadius {
            colony: colony.key.clone(),
        })
    })?;
    let buffer = build_buffer(colony, radius_km, land, units_per_km).map_err(skip)?;
    let records = allocate_buffer(&buffer, grid);

    Ok(ColonyAllocation {
        colony: colony.key.clone(),
        group: colony.group.clone(),
        count: colony.count,
        buffer_area: buffer.area,
        records,
    })
}

/// Allocate every colony, aggregate by group and normalize.
pub fn run_allocation(
    colonies: &[Colony],
    land: &LandMask,
    grid: &Grid,
    config: &AllocationConfig,
) -> AllocationRun {
    let map = |colony: &Colony| allocate_colony(colony, land, grid, config.units_per_km);
    let results: Vec<Result<ColonyAllocation, SkippedColony>> = if config.parallel {
        colonies.par_iter().map(map).collect()
    } else {
        colonies.iter().map(map).collect()
    };

    let mut allocations = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for result in results {
        match result {
            Ok(allocation) => allocations.push(allocation),
            Err(skip) => {
                tracing::warn!("skipping colony {}: {}", skip.colony, skip.reason);
                skipped.push(skip);
            }
        }
    }
    allocations.sort_by(|a, b| a.colony.cmp(&b.colony));
    skipped.sort_by(|a, b| a.colony.cmp(&b.colony));

    let groups: BTreeSet<String> = allocations.iter().map(|a| a.group.clone()).collect();
    let records: Vec<OverlapRecord> = allocations
        .iter()
        .flat_map(|a| a.records.iter().cloned())
        .collect();
    let table = aggregate(&records, &groups, grid);
    let outcome = normalize(&table, grid, &config.eligibility);

    tracing::info!(
        "allocated {} colonies ({} skipped) into {} groups over {} cells",
        allocations.len(),
        skipped.len(),
        groups.len(),
        grid.len()
    );

    AllocationRun {
        colonies: allocations,
        skipped,
        table,
        distributions: outcome.distributions,
        failures: outcome.failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridCell;
    use approx::assert_relative_eq;
    use geo::{MultiPolygon, Point, polygon};

    fn rect(x0: f64, x1: f64, y0: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
        ]])
    }

    /// 2 x 2 grid of 100 km cells centred on the origin.
    fn quad_grid() -> Grid {
        let s = 100_000.0;
        Grid::new(vec![
            GridCell::new(0, rect(-s, 0.0, -s, 0.0), false, -40.0),
            GridCell::new(1, rect(0.0, s, -s, 0.0), false, -40.0),
            GridCell::new(2, rect(-s, 0.0, 0.0, s), false, -40.0),
            GridCell::new(3, rect(0.0, s, 0.0, s), false, -40.0),
        ])
        .unwrap()
    }

    fn colony(site: &str, x: f64, y: f64, count: f64, radius_km: Option<f64>) -> Colony {
        Colony::new(
            ColonyKey::new("2019", site, "BLKI"),
            "kittiwakes",
            Point::new(x, y),
            count,
            radius_km,
        )
    }

    #[test]
    fn test_centred_colony_splits_evenly() {
        let run = run_allocation(
            &[colony("a", 0.0, 0.0, 1000.0, Some(20.0))],
            &LandMask::empty(),
            &quad_grid(),
            &AllocationConfig::default(),
        );
        let rows: Vec<f64> = run.table.rows.iter().map(|r| r.abundance).collect();
        for a in &rows {
            assert_relative_eq!(*a, 250.0, epsilon = 1e-6);
        }
        assert_relative_eq!(run.colonies[0].allocated(), 1000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_radius_skipped_not_fatal() {
        let run = run_allocation(
            &[
                colony("a", 50_000.0, 50_000.0, 100.0, Some(10.0)),
                colony("b", -50_000.0, 50_000.0, 100.0, None),
            ],
            &LandMask::empty(),
            &quad_grid(),
            &AllocationConfig::default(),
        );
        assert_eq!(run.colonies.len(), 1);
        assert_eq!(run.skipped.len(), 1);
        assert!(matches!(run.skipped[0].reason, AllocError::MissingRadius { .. }));
    }

    #[test]
    fn test_zero_radius_contributes_nothing() {
        let run = run_allocation(
            &[colony("a", 50_000.0, 50_000.0, 100.0, Some(0.0))],
            &LandMask::empty(),
            &quad_grid(),
            &AllocationConfig::default(),
        );
        assert_eq!(run.empty_buffers(), 1);
        assert_eq!(run.records().count(), 0);
        assert_eq!(run.table.group_total("kittiwakes"), 0.0);
        assert!(matches!(
            run.failures[0],
            AllocError::NoAllocableAbundance { .. }
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let colonies: Vec<Colony> = (0..12)
            .map(|i| {
                let x = -90_000.0 + 15_000.0 * i as f64;
                colony(&format!("c{i}"), x, 10_000.0 * (i % 3) as f64, 50.0 + i as f64, Some(30.0))
            })
            .collect();
        let sequential = AllocationConfig {
            parallel: false,
            ..AllocationConfig::default()
        };
        let a = run_allocation(&colonies, &LandMask::empty(), &quad_grid(), &sequential);
        let b = run_allocation(&colonies, &LandMask::empty(), &quad_grid(), &AllocationConfig::default());
        assert_eq!(a.table, b.table);
        assert_eq!(a.distributions, b.distributions);
    }
}
