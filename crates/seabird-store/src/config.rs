//! Run configuration (`seabird.toml`).
//!
//! Relative input and output paths resolve against the directory holding
//! the config file, so a run directory can be moved as a unit.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use seabird_core::{AllocationConfig, DEFAULT_UNITS_PER_KM, Eligibility, InputCrs};

use crate::error::{Result, StoreError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub inputs: InputPaths,
    #[serde(default)]
    pub grid: GridSettings,
    #[serde(default)]
    pub colonies: ColonySettings,
    #[serde(default)]
    pub allocation: AllocationSettings,
    #[serde(default)]
    pub eligibility: Eligibility,
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputPaths {
    pub colonies: PathBuf,
    pub radii: PathBuf,
    #[serde(default)]
    pub groups: Option<PathBuf>,
    pub grid: PathBuf,
    #[serde(default)]
    pub land: Option<PathBuf>,
}

/// Where the grid's attributes live in the GeoJSON properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub id_property: String,
    pub boundary_property: String,
    pub depth_property: String,
    pub crs: InputCrs,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            id_property: "box_id".to_string(),
            boundary_property: "boundary".to_string(),
            depth_property: "botz".to_string(),
            crs: InputCrs::Geographic,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColonySettings {
    /// Must match the grid.
    pub crs: InputCrs,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationSettings {
    pub units_per_km: f64,
    pub parallel: bool,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            units_per_km: DEFAULT_UNITS_PER_KM,
            parallel: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub archive: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("out"),
            archive: None,
        }
    }
}

impl RunConfig {
    /// Read and parse a config file, resolving relative paths.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let mut config = Self::parse(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let units = self.allocation.units_per_km;
        if !units.is_finite() || units <= 0.0 {
            return Err(StoreError::InvalidData(format!(
                "allocation.units_per_km must be positive, got {units}"
            )));
        }
        if self.grid.crs != self.colonies.crs {
            return Err(StoreError::InvalidData(format!(
                "grid.crs is {:?} but colonies.crs is {:?}; both must name the same system",
                self.grid.crs, self.colonies.crs
            )));
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.inputs.colonies);
        resolve(&mut self.inputs.radii);
        resolve(&mut self.inputs.grid);
        if let Some(p) = self.inputs.groups.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.inputs.land.as_mut() {
            resolve(p);
        }
        resolve(&mut self.output.dir);
        if let Some(p) = self.output.archive.as_mut() {
            resolve(p);
        }
    }

    pub fn allocation_config(&self) -> AllocationConfig {
        AllocationConfig {
            units_per_km: self.allocation.units_per_km,
            parallel: self.allocation.parallel,
            eligibility: self.eligibility,
        }
    }
}
