//! GeoJSON inputs: the model grid and the land polygons.

use std::fs;
use std::path::Path;

use geo::{Geometry, MultiPolygon, Polygon};
use geojson::{Feature, GeoJson, JsonValue};

use seabird_core::GridCell;

use crate::config::GridSettings;
use crate::error::{Result, StoreError};

fn read_features(path: &Path) -> Result<Vec<Feature>> {
    let text = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let geojson: GeoJson = text.parse()?;
    Ok(match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![Feature {
            bbox: None,
            geometry: Some(g),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    })
}

/// Polygonal parts of a feature; other geometry kinds yield nothing.
fn polygons(feature: &Feature) -> Result<Vec<Polygon<f64>>> {
    let Some(geometry) = feature.geometry.clone() else {
        return Ok(Vec::new());
    };
    let geometry: Geometry<f64> = geometry.try_into()?;
    Ok(flatten(geometry))
}

fn flatten(geometry: Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0,
        Geometry::GeometryCollection(gc) => gc.0.into_iter().flat_map(flatten).collect(),
        _ => Vec::new(),
    }
}

fn as_u32(value: &JsonValue) -> Option<u32> {
    match value {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Boundary flags show up as booleans, 0/1 or strings depending on the
/// tool that wrote the grid.
fn as_flag(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0),
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "1" => Some(true),
            "false" | "f" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        JsonValue::Null => Some(false),
        _ => None,
    }
}

/// Read grid cells from a GeoJSON FeatureCollection.
///
/// A missing boundary property means "not boundary". Features without an
/// id or depth, or without polygonal geometry, are skipped with a warning.
pub fn read_grid(path: &Path, settings: &GridSettings) -> Result<Vec<GridCell>> {
    let features = read_features(path)?;
    let mut cells = Vec::with_capacity(features.len());

    for (i, feature) in features.iter().enumerate() {
        let Some(id) = feature.property(&settings.id_property).and_then(as_u32) else {
            tracing::warn!("grid feature {i}: missing or invalid '{}'", settings.id_property);
            continue;
        };
        let Some(botz) = feature.property(&settings.depth_property).and_then(as_f64) else {
            tracing::warn!("grid cell {id}: missing or invalid '{}'", settings.depth_property);
            continue;
        };
        let boundary = match feature.property(&settings.boundary_property) {
            None => false,
            Some(value) => match as_flag(value) {
                Some(flag) => flag,
                None => {
                    tracing::warn!("grid cell {id}: unreadable '{}'", settings.boundary_property);
                    continue;
                }
            },
        };

        let parts = match polygons(feature) {
            Ok(parts) if !parts.is_empty() => parts,
            Ok(_) => {
                tracing::warn!("grid cell {id}: no polygon geometry");
                continue;
            }
            Err(e) => {
                tracing::warn!("grid cell {id}: {e}");
                continue;
            }
        };

        let mut cell = GridCell::new(id, MultiPolygon::new(parts), boundary, botz);
        cell.label = feature
            .property("label")
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        cells.push(cell);
    }

    tracing::info!("read {} grid cells from {}", cells.len(), path.display());
    Ok(cells)
}

/// Every polygon in a land GeoJSON file, regardless of properties.
pub fn read_land(path: &Path) -> Result<Vec<Polygon<f64>>> {
    let mut parts = Vec::new();
    for (i, feature) in read_features(path)?.iter().enumerate() {
        match polygons(feature) {
            Ok(p) => parts.extend(p),
            Err(e) => tracing::warn!("land feature {i}: {e}"),
        }
    }
    tracing::info!("read {} land polygons from {}", parts.len(), path.display());
    Ok(parts)
}
