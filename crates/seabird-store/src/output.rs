//! CSV output tables.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use seabird_core::{GroupDistribution, SurveyCovariate};

use crate::error::{Result, StoreError};

#[derive(Serialize)]
struct OutputRow<'a> {
    box_id: u32,
    botz: f64,
    boundary: bool,
    eligible: bool,
    group: &'a str,
    abundance: f64,
    proportion: f64,
}

/// Make a group label safe to use as a file name.
pub fn file_stem(group: &str) -> String {
    let stem: String = group
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem
    }
}

/// Write one group's table to `<dir>/<group>.csv`, returning the path.
pub fn write_distribution(dir: &Path, distribution: &GroupDistribution) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
    let path = dir.join(format!("{}.csv", file_stem(&distribution.group)));

    let mut wtr = csv::Writer::from_path(&path)?;
    for row in &distribution.rows {
        wtr.serialize(OutputRow {
            box_id: row.cell_id,
            botz: row.botz,
            boundary: row.boundary,
            eligible: row.eligible,
            group: &row.group,
            abundance: row.abundance,
            proportion: row.proportion,
        })?;
    }
    wtr.flush().map_err(|e| StoreError::io(&path, e))?;
    Ok(path)
}

/// Write every group's table. Fails before writing anything if two
/// group labels map to the same file name.
pub fn write_distributions(dir: &Path, distributions: &[GroupDistribution]) -> Result<Vec<PathBuf>> {
    let mut stems: BTreeMap<String, &str> = BTreeMap::new();
    for distribution in distributions {
        let stem = file_stem(&distribution.group);
        if let Some(other) = stems.insert(stem.clone(), &distribution.group) {
            return Err(StoreError::InvalidData(format!(
                "groups '{other}' and '{}' would both be written to {stem}.csv",
                distribution.group
            )));
        }
    }
    distributions
        .iter()
        .map(|distribution| write_distribution(dir, distribution))
        .collect()
}

pub fn write_covariates(path: &Path, rows: &[SurveyCovariate]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| StoreError::io(path, e))?;
    Ok(())
}
