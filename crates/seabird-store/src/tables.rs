//! Tabular inputs: colony counts, foraging radii, species groups and
//! survey densities.
//!
//! Rows that do not parse are skipped with a warning; a bad row never
//! fails the whole table.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Canonical form used to join species labels across tables:
/// trimmed, inner whitespace collapsed, upper-cased.
pub fn normalize_label(label: &str) -> String {
    WHITESPACE.replace_all(label.trim(), " ").to_uppercase()
}

/// A raw colony row in geodetic (or planar) coordinates.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ColonyRow {
    pub survey_id: String,
    pub site_id: String,
    pub species: String,
    pub count: f64,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Clone, Debug, Deserialize)]
struct RadiusRow {
    species: String,
    radius_km: f64,
}

#[derive(Clone, Debug, Deserialize)]
struct GroupRow {
    species: String,
    group: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SurveyRow {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    pub density: f64,
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?)
}

/// Deserialize every row of `path`, skipping the ones that fail.
fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = reader(path)?;
    let mut rows = Vec::new();
    for (i, result) in rdr.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            // +2: header line, 1-based numbering
            Err(e) => tracing::warn!("{}: skipping line {}: {e}", path.display(), i + 2),
        }
    }
    Ok(rows)
}

pub fn read_colonies(path: &Path) -> Result<Vec<ColonyRow>> {
    let rows: Vec<ColonyRow> = read_rows(path)?;
    tracing::info!("read {} colony rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Foraging radius (km) per normalized species label. Non-positive
/// radii are kept; they allocate nothing. NaN or infinite radii are
/// dropped, so their species count as having no radius.
pub fn read_radii(path: &Path) -> Result<HashMap<String, f64>> {
    let rows: Vec<RadiusRow> = read_rows(path)?;
    let mut radii = HashMap::with_capacity(rows.len());
    for row in rows {
        let key = normalize_label(&row.species);
        if !row.radius_km.is_finite() {
            tracing::warn!("radius for {key} is {}; ignoring it", row.radius_km);
            continue;
        }
        if let Some(previous) = radii.insert(key.clone(), row.radius_km)
            && previous != row.radius_km
        {
            tracing::warn!("radius for {key} given twice ({previous} and {}); using the last", row.radius_km);
        }
    }
    Ok(radii)
}

/// Species → group mapping, keyed by normalized species label.
pub fn read_groups(path: &Path) -> Result<HashMap<String, String>> {
    let rows: Vec<GroupRow> = read_rows(path)?;
    Ok(rows
        .into_iter()
        .map(|row| (normalize_label(&row.species), row.group.trim().to_string()))
        .collect())
}

pub fn read_surveys(path: &Path) -> Result<Vec<SurveyRow>> {
    read_rows(path)
}
