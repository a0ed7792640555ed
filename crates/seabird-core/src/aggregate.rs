use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::grid::Grid;
use crate::overlap::OverlapRecord;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AbundanceRow {
    pub cell_id: u32,
    pub group: String,
    pub abundance: f64,
}

/// Summed abundance for every (group, cell) pair.
///
/// Rows are ordered by group, then cell id, and cover the full cross
/// product: cells nothing reached carry zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AbundanceTable {
    pub groups: Vec<String>,
    pub rows: Vec<AbundanceRow>,
}

impl AbundanceTable {
    pub fn group_rows<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a AbundanceRow> {
        self.rows.iter().filter(move |row| row.group == group)
    }

    pub fn group_total(&self, group: &str) -> f64 {
        self.group_rows(group).map(|row| row.abundance).sum()
    }
}

/// Group-by-sum of overlap records into per-cell, per-group abundance.
///
/// Records are summed in a canonical order so the totals do not depend on
/// the order colonies were processed in. Records naming a cell outside
/// `grid` are ignored.
pub fn aggregate(records: &[OverlapRecord], groups: &BTreeSet<String>, grid: &Grid) -> AbundanceTable {
    let mut ordered: Vec<&OverlapRecord> = records.iter().collect();
    // A colony key can repeat across survey rows, so the amount breaks ties.
    ordered.sort_by(|a, b| {
        (&a.group, a.cell_id, &a.colony)
            .cmp(&(&b.group, b.cell_id, &b.colony))
            .then(a.allocated.total_cmp(&b.allocated))
    });

    let mut sums: BTreeMap<(&str, u32), f64> = BTreeMap::new();
    for record in ordered {
        *sums
            .entry((record.group.as_str(), record.cell_id))
            .or_default() += record.allocated;
    }

    let mut rows = Vec::with_capacity(groups.len() * grid.len());
    for group in groups {
        for cell in grid.cells() {
            let abundance = sums
                .get(&(group.as_str(), cell.id))
                .copied()
                .unwrap_or(0.0);
            rows.push(AbundanceRow {
                cell_id: cell.id,
                group: group.clone(),
                abundance,
            });
        }
    }

    AbundanceTable {
        groups: groups.iter().cloned().collect(),
        rows,
    }
}
