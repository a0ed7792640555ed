//! Foraging buffers: the sea a colony can reach within its foraging radius.

use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon, Rect};

use crate::colony::{Colony, ColonyKey};
use crate::constants::{AREA_EPSILON, BUFFER_SEGMENTS};
use crate::error::AllocError;
use crate::geometry::{disk, validate_multipolygon};
use crate::land::LandMask;

/// Disk of the foraging radius around a colony, minus land.
#[derive(Clone, Debug)]
pub struct ForagingBuffer {
    pub colony: ColonyKey,
    pub group: String,
    pub count: f64,
    pub geometry: MultiPolygon<f64>,
    pub area: f64,
}

impl ForagingBuffer {
    fn empty(colony: &Colony) -> Self {
        Self {
            colony: colony.key.clone(),
            group: colony.group.clone(),
            count: colony.count,
            geometry: MultiPolygon::new(vec![]),
            area: 0.0,
        }
    }

    /// Empty buffers allocate nothing anywhere.
    pub fn is_empty(&self) -> bool {
        self.area <= AREA_EPSILON
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }
}

/// Build the sea-accessible buffer for `colony`.
///
/// A non-positive or non-finite radius gives an empty buffer, as does a
/// colony whose disk lies entirely on land. `units_per_km` converts the
/// radius into the planar units of the colony location.
pub fn build_buffer(
    colony: &Colony,
    radius_km: f64,
    land: &LandMask,
    units_per_km: f64,
) -> Result<ForagingBuffer, AllocError> {
    colony.validate()?;

    let radius = radius_km * units_per_km;
    if !radius.is_finite() || radius <= 0.0 {
        return Ok(ForagingBuffer::empty(colony));
    }

    let circle = MultiPolygon::new(vec![disk(colony.location, radius, BUFFER_SEGMENTS)]);
    validate_multipolygon(&circle).map_err(|reason| AllocError::InvalidGeometry {
        context: format!("buffer of {}", colony.key),
        reason,
    })?;

    let touches_land = match (land.bounds(), circle.bounding_rect()) {
        (Some(land_rect), Some(circle_rect)) => land_rect.intersects(&circle_rect),
        _ => false,
    };
    let geometry = if touches_land {
        circle.difference(land.geometry())
    } else {
        circle
    };

    let area = geometry.unsigned_area();
    if area <= AREA_EPSILON {
        tracing::debug!("buffer of {} lies entirely on land", colony.key);
        return Ok(ForagingBuffer::empty(colony));
    }

    Ok(ForagingBuffer {
        colony: colony.key.clone(),
        group: colony.group.clone(),
        count: colony.count,
        geometry,
        area,
    })
}
