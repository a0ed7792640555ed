use std::collections::HashSet;

use geo::{BoundingRect, MultiPolygon, Rect};
use serde::{Deserialize, Serialize};

use crate::error::AllocError;
use crate::geometry::validate_multipolygon;

/// One box of the model grid.
#[derive(Clone, Debug, PartialEq)]
pub struct GridCell {
    pub id: u32,
    pub geometry: MultiPolygon<f64>,
    /// Boundary boxes sit on the open edge of the model domain.
    pub boundary: bool,
    /// Bottom depth; negative below sea level.
    pub botz: f64,
    pub label: Option<String>,
}

impl GridCell {
    pub fn new(id: u32, geometry: MultiPolygon<f64>, boundary: bool, botz: f64) -> Self {
        Self {
            id,
            geometry,
            boundary,
            botz,
            label: None,
        }
    }
}

/// Which cells may receive a share of a group's abundance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Eligibility {
    pub exclude_boundary: bool,
    /// Cells need `botz` strictly below this value.
    pub max_botz: f64,
}

impl Default for Eligibility {
    fn default() -> Self {
        Self {
            exclude_boundary: true,
            max_botz: 0.0,
        }
    }
}

impl Eligibility {
    pub fn is_eligible(&self, cell: &GridCell) -> bool {
        if self.exclude_boundary && cell.boundary {
            return false;
        }
        cell.botz < self.max_botz
    }
}

/// Validated grid, cells in ascending id order with cached bounding boxes.
#[derive(Clone, Debug)]
pub struct Grid {
    cells: Vec<GridCell>,
    bounds: Vec<Rect<f64>>,
}

impl Grid {
    /// Build a grid. Cells with unusable geometry are dropped with a
    /// warning; duplicate ids are an error.
    pub fn new(mut cells: Vec<GridCell>) -> Result<Self, AllocError> {
        let mut seen = HashSet::new();
        for cell in &cells {
            if !seen.insert(cell.id) {
                return Err(AllocError::DuplicateCell { id: cell.id });
            }
        }

        cells.retain(|cell| match validate_multipolygon(&cell.geometry) {
            Ok(()) => true,
            Err(reason) => {
                let err = AllocError::InvalidGeometry {
                    context: format!("grid cell {}", cell.id),
                    reason,
                };
                tracing::warn!("skipping cell: {err}");
                false
            }
        });
        cells.sort_by_key(|cell| cell.id);

        let mut kept = Vec::with_capacity(cells.len());
        let mut bounds = Vec::with_capacity(cells.len());
        for cell in cells {
            if let Some(rect) = cell.geometry.bounding_rect() {
                bounds.push(rect);
                kept.push(cell);
            }
        }

        Ok(Self {
            cells: kept,
            bounds,
        })
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells paired with their bounding boxes.
    pub fn iter_with_bounds(&self) -> impl Iterator<Item = (&GridCell, &Rect<f64>)> {
        self.cells.iter().zip(self.bounds.iter())
    }

    pub fn get(&self, id: u32) -> Option<&GridCell> {
        self.cells
            .binary_search_by_key(&id, |cell| cell.id)
            .ok()
            .map(|i| &self.cells[i])
    }

    pub fn eligible_count(&self, rule: &Eligibility) -> usize {
        self.cells.iter().filter(|c| rule.is_eligible(c)).count()
    }
}
