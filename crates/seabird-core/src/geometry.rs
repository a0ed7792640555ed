//! Small geometry helpers shared by the buffer builder, land mask and grid.

use std::f64::consts::TAU;

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Point, Polygon};

/// Regular `segments`-gon inscribed in the circle of `radius` about `center`.
pub fn disk(center: Point<f64>, radius: f64, segments: usize) -> Polygon<f64> {
    let segments = segments.max(3);
    let ring: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            let theta = TAU * i as f64 / segments as f64;
            Coord {
                x: center.x() + radius * theta.cos(),
                y: center.y() + radius * theta.sin(),
            }
        })
        .collect();
    // Polygon::new closes the ring.
    Polygon::new(LineString::new(ring), vec![])
}

/// Check that a polygon can go through boolean overlay.
pub fn validate_polygon(polygon: &Polygon<f64>) -> Result<(), String> {
    validate_ring(polygon.exterior(), "exterior")?;
    for (i, hole) in polygon.interiors().iter().enumerate() {
        validate_ring(hole, &format!("interior {i}"))?;
    }
    Ok(())
}

pub fn validate_multipolygon(multi: &MultiPolygon<f64>) -> Result<(), String> {
    if multi.0.is_empty() {
        return Err("no polygons".to_string());
    }
    for (i, polygon) in multi.iter().enumerate() {
        validate_polygon(polygon).map_err(|e| format!("part {i}: {e}"))?;
    }
    Ok(())
}

fn validate_ring(ring: &LineString<f64>, which: &str) -> Result<(), String> {
    if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(format!("{which} ring has non-finite coordinates"));
    }
    // A closed ring needs three distinct vertices plus the closing one.
    if ring.0.len() < 4 {
        return Err(format!("{which} ring has {} vertices", ring.0.len()));
    }
    Ok(())
}

/// Union polygons that may overlap into one valid multipolygon.
pub fn dissolve(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    polygons
        .into_iter()
        .fold(MultiPolygon::new(vec![]), |acc, polygon| {
            if acc.0.is_empty() {
                MultiPolygon::new(vec![polygon])
            } else {
                acc.union(&MultiPolygon::new(vec![polygon]))
            }
        })
}
