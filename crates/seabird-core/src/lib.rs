//! Seabird colony abundance allocation onto a model grid.
//!
//! Each colony's count is spread over the sea it can reach within its
//! foraging radius, split across grid cells by overlapping area, summed per
//! species group and normalized so every habitable cell holds a nonzero
//! share.
//!
//! Zero I/O: geometry and aggregation only. Reading and writing tables
//! lives in `seabird-store`.

pub mod aggregate;
pub mod buffer;
pub mod colony;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod land;
pub mod normalize;
pub mod overlap;
pub mod pipeline;
pub mod projection;
pub mod survey;

pub use aggregate::{AbundanceRow, AbundanceTable, aggregate};
pub use buffer::{ForagingBuffer, build_buffer};
pub use colony::{Colony, ColonyKey};
pub use constants::{AREA_EPSILON, BUFFER_SEGMENTS, DEFAULT_UNITS_PER_KM, EARTH_RADIUS_M};
pub use error::AllocError;
pub use grid::{Eligibility, Grid, GridCell};
pub use land::LandMask;
pub use normalize::{GroupDistribution, NormalizationOutcome, NormalizedRow, normalize, normalize_group};
pub use overlap::{OverlapRecord, allocate_buffer};
pub use pipeline::{
    AllocationConfig, AllocationRun, ColonyAllocation, SkippedColony, allocate_colony,
    run_allocation,
};
pub use projection::{InputCrs, LambertAzimuthal, Projection};
pub use survey::{
    CellPrediction, DensityModel, SurveyCovariate, SurveyPoint, covariates, distance_to_shore_km,
    predict_grid,
};
