//! Survey-based distributions: covariates for, and evaluation of, an
//! external density model.
//!
//! Fitting the model is not done here. `DensityModel` is the seam the
//! fitted model plugs into; it is expected to be deterministic for fixed
//! inputs.

use geo::{Centroid, EuclideanDistance, Point};
use serde::Serialize;

use crate::grid::{Eligibility, Grid};
use crate::land::LandMask;

/// A transect observation, projected into planar units.
#[derive(Clone, Debug, PartialEq)]
pub struct SurveyPoint {
    pub id: String,
    pub location: Point<f64>,
    /// Observed density (birds per km²).
    pub density: f64,
}

/// One row of the table the density model is fitted on.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SurveyCovariate {
    pub id: String,
    pub x: f64,
    pub y: f64,
    /// Kilometres to the nearest land; zero on land, `None` with no land.
    pub distance_to_shore_km: Option<f64>,
    pub density: f64,
}

/// A fitted spatial model: covariates in, predicted density out, one
/// prediction per input row.
pub trait DensityModel {
    fn predict(&self, rows: &[SurveyCovariate]) -> Vec<f64>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CellPrediction {
    pub cell_id: u32,
    pub density: f64,
}

pub fn distance_to_shore_km(location: Point<f64>, land: &LandMask, units_per_km: f64) -> Option<f64> {
    if land.is_empty() {
        return None;
    }
    Some(location.euclidean_distance(land.geometry()) / units_per_km)
}

/// Attach distance-from-shore to each survey point.
pub fn covariates(points: &[SurveyPoint], land: &LandMask, units_per_km: f64) -> Vec<SurveyCovariate> {
    points
        .iter()
        .map(|p| SurveyCovariate {
            id: p.id.clone(),
            x: p.location.x(),
            y: p.location.y(),
            distance_to_shore_km: distance_to_shore_km(p.location, land, units_per_km),
            density: p.density,
        })
        .collect()
}

/// Evaluate `model` at the centroid of every eligible cell.
///
/// Predictions that come back negative or non-finite are clamped to zero.
pub fn predict_grid(
    model: &dyn DensityModel,
    grid: &Grid,
    rule: &Eligibility,
    land: &LandMask,
    units_per_km: f64,
) -> Vec<CellPrediction> {
    let (ids, rows): (Vec<u32>, Vec<SurveyCovariate>) = grid
        .cells()
        .iter()
        .filter(|cell| rule.is_eligible(cell))
        .filter_map(|cell| {
            let centroid = cell.geometry.centroid()?;
            Some((
                cell.id,
                SurveyCovariate {
                    id: cell.id.to_string(),
                    x: centroid.x(),
                    y: centroid.y(),
                    distance_to_shore_km: distance_to_shore_km(centroid, land, units_per_km),
                    density: 0.0,
                },
            ))
        })
        .unzip();

    let predicted = model.predict(&rows);
    if predicted.len() != rows.len() {
        tracing::warn!(
            "density model returned {} predictions for {} cells",
            predicted.len(),
            rows.len()
        );
    }

    ids.into_iter()
        .zip(predicted)
        .map(|(cell_id, density)| CellPrediction {
            cell_id,
            density: if density.is_finite() { density.max(0.0) } else { 0.0 },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridCell;
    use approx::assert_relative_eq;
    use geo::{MultiPolygon, polygon};

    fn land() -> LandMask {
        LandMask::new(vec![polygon![
            (x: -10_000.0, y: -10_000.0),
            (x: 0.0, y: -10_000.0),
            (x: 0.0, y: 10_000.0),
            (x: -10_000.0, y: 10_000.0),
        ]])
    }

    /// Density falls off linearly with distance from shore.
    struct Linear;

    impl DensityModel for Linear {
        fn predict(&self, rows: &[SurveyCovariate]) -> Vec<f64> {
            rows.iter()
                .map(|r| 10.0 - r.distance_to_shore_km.unwrap_or(0.0))
                .collect()
        }
    }

    #[test]
    fn test_distance_to_shore() {
        let d = distance_to_shore_km(Point::new(2_500.0, 0.0), &land(), 1000.0);
        assert_relative_eq!(d.unwrap(), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_point_on_land_is_zero() {
        let d = distance_to_shore_km(Point::new(-5_000.0, 0.0), &land(), 1000.0);
        assert_eq!(d, Some(0.0));
    }

    #[test]
    fn test_no_land_gives_none() {
        assert_eq!(
            distance_to_shore_km(Point::new(1.0, 1.0), &LandMask::empty(), 1000.0),
            None
        );
    }

    #[test]
    fn test_covariates_keep_density() {
        let rows = covariates(
            &[SurveyPoint {
                id: "t1".to_string(),
                location: Point::new(1_000.0, 0.0),
                density: 3.5,
            }],
            &land(),
            1000.0,
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].density, 3.5);
        assert_relative_eq!(rows[0].distance_to_shore_km.unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_predict_grid_uses_eligible_centroids() {
        let cell = |x0: f64| {
            MultiPolygon::new(vec![polygon![
                (x: x0, y: -1_000.0),
                (x: x0 + 2_000.0, y: -1_000.0),
                (x: x0 + 2_000.0, y: 1_000.0),
                (x: x0, y: 1_000.0),
            ]])
        };
        let grid = Grid::new(vec![
            GridCell::new(0, cell(0.0), false, -20.0),
            GridCell::new(1, cell(2_000.0), false, -20.0),
            GridCell::new(2, cell(20_000.0), true, -20.0),
        ])
        .unwrap();

        let predictions = predict_grid(&Linear, &grid, &Eligibility::default(), &land(), 1000.0);
        assert_eq!(predictions.len(), 2, "boundary cell is not predicted");
        assert_relative_eq!(predictions[0].density, 9.0, epsilon = 1e-9);
        assert_relative_eq!(predictions[1].density, 7.0, epsilon = 1e-9);
    }
}
