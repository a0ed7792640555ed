//! Zero-floor normalization of per-group abundance into cell proportions.
//!
//! The downstream ecosystem model needs every habitable cell to start with
//! some biomass, so eligible cells that received nothing are raised to the
//! group's smallest positive share. The total added is taken back from the
//! single largest cell, which keeps the proportions summing to one.

use serde::Serialize;

use crate::aggregate::AbundanceTable;
use crate::error::AllocError;
use crate::grid::{Eligibility, Grid};

/// One row of a group's output table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub cell_id: u32,
    pub botz: f64,
    pub boundary: bool,
    pub eligible: bool,
    pub group: String,
    pub abundance: f64,
    /// Zero for ineligible cells.
    pub proportion: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupDistribution {
    pub group: String,
    pub total_abundance: f64,
    pub rows: Vec<NormalizedRow>,
    /// Eligible cells raised from zero to the floor.
    pub floored_cells: usize,
    /// Cell that paid for the floor, when any cell was raised.
    pub adjusted_cell: Option<u32>,
    /// Conditions that did not stop the table from being written.
    pub warnings: Vec<AllocError>,
}

impl GroupDistribution {
    pub fn eligible_rows(&self) -> impl Iterator<Item = &NormalizedRow> {
        self.rows.iter().filter(|row| row.eligible)
    }
}

/// Distributions for every group that could be normalized, plus the
/// conditions raised by the rest.
#[derive(Clone, Debug, Default)]
pub struct NormalizationOutcome {
    pub distributions: Vec<GroupDistribution>,
    pub failures: Vec<AllocError>,
}

/// Normalize every group in `table`. A group that fails does not stop
/// the others.
pub fn normalize(table: &AbundanceTable, grid: &Grid, rule: &Eligibility) -> NormalizationOutcome {
    let mut outcome = NormalizationOutcome::default();
    for group in &table.groups {
        match normalize_group(group, table, grid, rule) {
            Ok(distribution) => outcome.distributions.push(distribution),
            Err(err) => {
                tracing::warn!("{err}");
                outcome.failures.push(err);
            }
        }
    }
    outcome
}

/// Normalize one group's abundance over the eligible cells of `grid`.
///
/// When several cells tie for the largest proportion, the one with the
/// lowest cell id pays for the floor. If paying leaves that cell at or
/// below zero the table is still produced, with a `FloorExceedsMaximum`
/// warning attached.
pub fn normalize_group(
    group: &str,
    table: &AbundanceTable,
    grid: &Grid,
    rule: &Eligibility,
) -> Result<GroupDistribution, AllocError> {
    let mut rows: Vec<NormalizedRow> = table
        .group_rows(group)
        .filter_map(|row| {
            let cell = grid.get(row.cell_id)?;
            Some(NormalizedRow {
                cell_id: cell.id,
                botz: cell.botz,
                boundary: cell.boundary,
                eligible: rule.is_eligible(cell),
                group: group.to_string(),
                abundance: row.abundance,
                proportion: 0.0,
            })
        })
        .collect();
    rows.sort_by_key(|row| row.cell_id);

    let total: f64 = rows.iter().filter(|r| r.eligible).map(|r| r.abundance).sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(AllocError::NoAllocableAbundance {
            group: group.to_string(),
        });
    }

    for row in rows.iter_mut().filter(|r| r.eligible) {
        row.proportion = row.abundance / total;
    }

    let min_positive = rows
        .iter()
        .filter(|r| r.eligible && r.proportion > 0.0)
        .map(|r| r.proportion)
        .fold(f64::INFINITY, f64::min);

    // First maximum in cell-id order.
    let mut max_index: Option<usize> = None;
    for (i, row) in rows.iter().enumerate() {
        if !row.eligible {
            continue;
        }
        if max_index.is_none_or(|m| row.proportion > rows[m].proportion) {
            max_index = Some(i);
        }
    }

    let floored_cells = rows
        .iter()
        .filter(|r| r.eligible && r.proportion == 0.0)
        .count();

    let mut adjusted_cell = None;
    let mut warnings = Vec::new();
    if floored_cells > 0
        && let Some(max_index) = max_index
    {
        let compensation = floored_cells as f64 * min_positive;
        let max_proportion = rows[max_index].proportion;
        if max_proportion - compensation <= 0.0 {
            let warning = AllocError::FloorExceedsMaximum {
                group: group.to_string(),
                max_proportion,
                compensation,
            };
            tracing::warn!("{warning}");
            warnings.push(warning);
        }
        for row in rows.iter_mut().filter(|r| r.eligible && r.proportion == 0.0) {
            row.proportion = min_positive;
        }
        rows[max_index].proportion = max_proportion - compensation;
        adjusted_cell = Some(rows[max_index].cell_id);
    }

    Ok(GroupDistribution {
        group: group.to_string(),
        total_abundance: total,
        rows,
        floored_cells,
        adjusted_cell,
        warnings,
    })
}
