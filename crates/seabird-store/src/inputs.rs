//! Assemble a run's inputs: read every table, join radii and groups onto
//! colonies, and project everything into one planar system.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use geo::{BoundingRect, MultiPolygon, Point, Rect};

use seabird_core::{
    Colony, ColonyKey, Grid, GridCell, InputCrs, LambertAzimuthal, LandMask, Projection,
    SurveyPoint,
};

use crate::config::RunConfig;
use crate::error::Result;
use crate::geodata::{read_grid, read_land};
use crate::tables::{ColonyRow, normalize_label, read_colonies, read_groups, read_radii, read_surveys};

/// Everything a run needs, in planar coordinates.
pub struct RunInputs {
    pub colonies: Vec<Colony>,
    pub grid: Grid,
    pub land: LandMask,
    /// Projection applied to geographic inputs; reused for surveys.
    pub projection: Projection,
    /// Species with colonies but no radius entry.
    pub missing_radius: BTreeSet<String>,
}

impl RunInputs {
    pub fn load(config: &RunConfig) -> Result<Self> {
        let raw_cells = read_grid(&config.inputs.grid, &config.grid)?;
        let projection = match config.grid.crs {
            InputCrs::Planar => Projection::Identity,
            InputCrs::Geographic => match cells_bounds(&raw_cells) {
                Some(bounds) => Projection::Lambert(LambertAzimuthal::centered_on(bounds)),
                None => Projection::Identity,
            },
        };

        let cells: Vec<GridCell> = raw_cells
            .into_iter()
            .map(|cell| GridCell {
                geometry: projection.multipolygon(&cell.geometry),
                ..cell
            })
            .collect();
        let grid = Grid::new(cells)?;

        let land = match &config.inputs.land {
            Some(path) => LandMask::new(
                read_land(path)?
                    .iter()
                    .map(|p| projection.polygon(p))
                    .collect(),
            ),
            None => LandMask::empty(),
        };

        let radii = read_radii(&config.inputs.radii)?;
        let groups = match &config.inputs.groups {
            Some(path) => Some(read_groups(path)?),
            None => None,
        };
        let rows = read_colonies(&config.inputs.colonies)?;
        let (colonies, missing_radius) =
            join_colonies(rows, &radii, groups.as_ref(), &projection);

        for species in &missing_radius {
            tracing::warn!("no foraging radius for species {species}; its colonies are excluded");
        }

        Ok(Self {
            colonies,
            grid,
            land,
            projection,
            missing_radius,
        })
    }

    /// Read survey points and project them like the colonies. Surveys
    /// share the colonies' coordinate system, which config validation
    /// ties to the grid's.
    pub fn load_surveys(&self, path: &Path) -> Result<Vec<SurveyPoint>> {
        Ok(read_surveys(path)?
            .into_iter()
            .map(|row| SurveyPoint {
                id: row.id,
                location: self.projection.point(Point::new(row.lon, row.lat)),
                density: row.density,
            })
            .collect())
    }
}

fn cells_bounds(cells: &[GridCell]) -> Option<Rect<f64>> {
    let all = MultiPolygon::new(
        cells
            .iter()
            .flat_map(|cell| cell.geometry.0.iter().cloned())
            .collect(),
    );
    all.bounding_rect()
}

/// Attach radius and group to each colony row.
///
/// Colonies whose species has no radius are kept with `radius_km = None`
/// so the allocator reports them as skipped.
pub fn join_colonies(
    rows: Vec<ColonyRow>,
    radii: &HashMap<String, f64>,
    groups: Option<&HashMap<String, String>>,
    projection: &Projection,
) -> (Vec<Colony>, BTreeSet<String>) {
    let mut missing_radius = BTreeSet::new();
    let mut unmapped = BTreeSet::new();

    let colonies = rows
        .into_iter()
        .map(|row| {
            let species = normalize_label(&row.species);
            let radius_km = radii.get(&species).copied();
            if radius_km.is_none() {
                missing_radius.insert(species.clone());
            }
            let group = match groups {
                Some(map) => match map.get(&species) {
                    Some(group) => group.clone(),
                    None => {
                        unmapped.insert(species.clone());
                        species.clone()
                    }
                },
                None => species.clone(),
            };
            Colony::new(
                ColonyKey::new(row.survey_id.trim(), row.site_id.trim(), &species),
                &group,
                projection.point(Point::new(row.lon, row.lat)),
                row.count,
                radius_km,
            )
        })
        .collect();

    for species in unmapped {
        tracing::warn!("species {species} has no group mapping; using the species as its group");
    }
    (colonies, missing_radius)
}
