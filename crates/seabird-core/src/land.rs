use geo::{BoundingRect, MultiPolygon, Polygon, Rect};

use crate::geometry::{dissolve, validate_polygon};

/// All land in the region as one dissolved multipolygon.
#[derive(Clone, Debug)]
pub struct LandMask {
    geometry: MultiPolygon<f64>,
    bounds: Option<Rect<f64>>,
}

impl LandMask {
    /// Dissolve land parts into one mask. Unusable parts are dropped
    /// with a warning rather than failing the run.
    pub fn new(parts: Vec<Polygon<f64>>) -> Self {
        let valid: Vec<Polygon<f64>> = parts
            .into_iter()
            .enumerate()
            .filter_map(|(i, polygon)| match validate_polygon(&polygon) {
                Ok(()) => Some(polygon),
                Err(reason) => {
                    tracing::warn!("skipping land part {i}: {reason}");
                    None
                }
            })
            .collect();

        let geometry = dissolve(valid);
        let bounds = geometry.bounding_rect();
        Self { geometry, bounds }
    }

    pub fn empty() -> Self {
        Self {
            geometry: MultiPolygon::new(vec![]),
            bounds: None,
        }
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}
