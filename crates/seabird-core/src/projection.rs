//! Planar projection of geodetic inputs.
//!
//! Buffering and area math run in a planar system. Geodetic lon/lat is
//! taken through a spherical Lambert azimuthal equal-area projection so
//! that area ratios survive projection.

use geo::{Coord, MapCoords, MultiPolygon, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::constants::EARTH_RADIUS_M;

/// Coordinate system the inputs are expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputCrs {
    /// Longitude/latitude in degrees.
    #[default]
    Geographic,
    /// Already planar; used as-is.
    Planar,
}

/// Spherical Lambert azimuthal equal-area projection, output in metres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LambertAzimuthal {
    lon0: f64,
    sin_lat0: f64,
    cos_lat0: f64,
}

impl LambertAzimuthal {
    /// Projection centred on `origin` (degrees).
    pub fn new(origin: Point<f64>) -> Self {
        let lat0 = origin.y().to_radians();
        Self {
            lon0: origin.x().to_radians(),
            sin_lat0: lat0.sin(),
            cos_lat0: lat0.cos(),
        }
    }

    /// Centre the projection on the middle of a lon/lat bounding box.
    pub fn centered_on(bounds: Rect<f64>) -> Self {
        Self::new(bounds.center().into())
    }

    /// Project one lon/lat coordinate. The antipode of the origin maps to
    /// non-finite coordinates, which geometry validation rejects later.
    pub fn forward(&self, c: Coord<f64>) -> Coord<f64> {
        let lon = c.x.to_radians();
        let lat = c.y.to_radians();
        let dlon = lon - self.lon0;
        let (sin_lat, cos_lat) = lat.sin_cos();
        let cos_dlon = dlon.cos();

        let denom = 1.0 + self.sin_lat0 * sin_lat + self.cos_lat0 * cos_lat * cos_dlon;
        let k = (2.0 / denom).sqrt();
        Coord {
            x: EARTH_RADIUS_M * k * cos_lat * dlon.sin(),
            y: EARTH_RADIUS_M * k * (self.cos_lat0 * sin_lat - self.sin_lat0 * cos_lat * cos_dlon),
        }
    }
}

/// Maps input coordinates into the working planar system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Identity,
    Lambert(LambertAzimuthal),
}

impl Projection {
    pub fn coord(&self, c: Coord<f64>) -> Coord<f64> {
        match self {
            Projection::Identity => c,
            Projection::Lambert(p) => p.forward(c),
        }
    }

    pub fn point(&self, p: Point<f64>) -> Point<f64> {
        self.coord(p.0).into()
    }

    pub fn polygon(&self, polygon: &Polygon<f64>) -> Polygon<f64> {
        polygon.map_coords(|c| self.coord(c))
    }

    pub fn multipolygon(&self, multi: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        multi.map_coords(|c| self.coord(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{Area, polygon};

    #[test]
    fn test_origin_maps_to_zero() {
        let p = LambertAzimuthal::new(Point::new(-4.0, 57.0));
        let c = p.forward(Coord { x: -4.0, y: 57.0 });
        assert_relative_eq!(c.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(c.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_north_is_positive_y() {
        let p = LambertAzimuthal::new(Point::new(0.0, 0.0));
        let c = p.forward(Coord { x: 0.0, y: 1.0 });
        assert!(c.y > 110_000.0 && c.y < 112_000.0, "y = {}", c.y);
        assert_relative_eq!(c.x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_equal_area_one_degree_cell() {
        // A 1° x 1° cell at the equator spans ~12 364 km².
        let p = Projection::Lambert(LambertAzimuthal::new(Point::new(0.5, 0.5)));
        let cell = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let projected = p.polygon(&cell);
        let sphere = EARTH_RADIUS_M.powi(2) * 1f64.to_radians() * (1f64.to_radians().sin());
        assert_relative_eq!(projected.unsigned_area(), sphere, max_relative = 1e-3);
    }

    #[test]
    fn test_identity_leaves_coordinates() {
        let c = Coord { x: 12.5, y: -3.0 };
        assert_eq!(Projection::Identity.coord(c), c);
    }
}
