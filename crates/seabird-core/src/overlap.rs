use geo::{Area, BooleanOps, Intersects};
use serde::Serialize;

use crate::buffer::ForagingBuffer;
use crate::colony::ColonyKey;
use crate::constants::AREA_EPSILON;
use crate::grid::Grid;

/// Share of one colony's buffer that falls inside one grid cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverlapRecord {
    pub colony: ColonyKey,
    pub group: String,
    pub cell_id: u32,
    /// Intersection area in planar units².
    pub area: f64,
    /// `area / buffer area`.
    pub proportion: f64,
    /// `proportion * colony count`.
    pub allocated: f64,
}

/// Apportion a buffer's count across the cells it overlaps.
///
/// Cells whose bounding box misses the buffer's are skipped before any
/// overlay. Intersections with no positive area produce no record. The
/// allocated total equals the count when the grid covers the buffer and
/// falls short by the uncovered share otherwise.
pub fn allocate_buffer(buffer: &ForagingBuffer, grid: &Grid) -> Vec<OverlapRecord> {
    if buffer.is_empty() {
        return Vec::new();
    }
    let Some(buffer_rect) = buffer.bounds() else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for (cell, cell_rect) in grid.iter_with_bounds() {
        if !cell_rect.intersects(&buffer_rect) {
            continue;
        }
        let area = cell.geometry.intersection(&buffer.geometry).unsigned_area();
        if area <= AREA_EPSILON {
            continue;
        }
        let proportion = area / buffer.area;
        records.push(OverlapRecord {
            colony: buffer.colony.clone(),
            group: buffer.group.clone(),
            cell_id: cell.id,
            area,
            proportion,
            allocated: proportion * buffer.count,
        });
    }

    tracing::debug!(
        "{}: {} cells overlap buffer of area {:.1}",
        buffer.colony,
        records.len(),
        buffer.area
    );
    records
}
