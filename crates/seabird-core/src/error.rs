use std::fmt;

use serde::Serialize;

use crate::colony::ColonyKey;

/// Conditions raised while allocating or normalizing abundance.
///
/// None of these abort a run: colony-level errors drop that colony's
/// contribution, `NoAllocableAbundance` drops that group's output table
/// and `FloorExceedsMaximum` is carried as a warning on the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AllocError {
    /// No foraging radius is known for the colony's species.
    MissingRadius { colony: ColonyKey },
    /// Count or location is negative, NaN or infinite.
    InvalidColony { colony: ColonyKey, reason: String },
    /// A polygon could not be used for overlay operations.
    InvalidGeometry { context: String, reason: String },
    /// Two grid cells share an identifier.
    DuplicateCell { id: u32 },
    /// The group's eligible cells sum to zero abundance.
    NoAllocableAbundance { group: String },
    /// Paying for the zero floor would leave the largest cell non-positive.
    FloorExceedsMaximum {
        group: String,
        max_proportion: f64,
        compensation: f64,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::MissingRadius { colony } => {
                write!(f, "no foraging radius for species '{}' ({colony})", colony.species)
            }
            AllocError::InvalidColony { colony, reason } => {
                write!(f, "invalid colony {colony}: {reason}")
            }
            AllocError::InvalidGeometry { context, reason } => {
                write!(f, "invalid geometry for {context}: {reason}")
            }
            AllocError::DuplicateCell { id } => write!(f, "duplicate grid cell id {id}"),
            AllocError::NoAllocableAbundance { group } => {
                write!(f, "group '{group}' has no allocable abundance in eligible cells")
            }
            AllocError::FloorExceedsMaximum {
                group,
                max_proportion,
                compensation,
            } => write!(
                f,
                "group '{group}': zero-floor compensation {compensation:.6} exceeds maximum proportion {max_proportion:.6}"
            ),
        }
    }
}

impl std::error::Error for AllocError {}
