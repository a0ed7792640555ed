/// Vertex count of the regular polygon approximating a foraging disk.
pub const BUFFER_SEGMENTS: usize = 128;

/// Areas at or below this (planar units²) count as empty.
pub const AREA_EPSILON: f64 = 1e-9;

/// Mean Earth radius in metres (IUGG), used by the equal-area projection.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Planar units per kilometre when the working CRS is in metres.
pub const DEFAULT_UNITS_PER_KM: f64 = 1000.0;
