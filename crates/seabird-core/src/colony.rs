use std::fmt;

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::error::AllocError;

/// Identity of a colony count: one species at one site in one survey.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColonyKey {
    pub survey_id: String,
    pub site_id: String,
    pub species: String,
}

impl ColonyKey {
    pub fn new(survey_id: &str, site_id: &str, species: &str) -> Self {
        Self {
            survey_id: survey_id.to_string(),
            site_id: site_id.to_string(),
            species: species.to_string(),
        }
    }
}

impl fmt::Display for ColonyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.survey_id, self.site_id, self.species)
    }
}

/// A georeferenced colony count, already projected into planar units.
#[derive(Clone, Debug, PartialEq)]
pub struct Colony {
    pub key: ColonyKey,
    /// Coarser label the allocator aggregates over.
    pub group: String,
    pub location: Point<f64>,
    pub count: f64,
    /// `None` when the species has no entry in the radius lookup.
    pub radius_km: Option<f64>,
}

impl Colony {
    pub fn new(
        key: ColonyKey,
        group: &str,
        location: Point<f64>,
        count: f64,
        radius_km: Option<f64>,
    ) -> Self {
        Self {
            key,
            group: group.to_string(),
            location,
            count,
            radius_km,
        }
    }

    /// Reject counts and locations the overlay cannot use.
    pub fn validate(&self) -> Result<(), AllocError> {
        if !self.count.is_finite() || self.count < 0.0 {
            return Err(AllocError::InvalidColony {
                colony: self.key.clone(),
                reason: format!("count {} is not a nonnegative number", self.count),
            });
        }
        if !self.location.x().is_finite() || !self.location.y().is_finite() {
            return Err(AllocError::InvalidColony {
                colony: self.key.clone(),
                reason: "location is not finite".to_string(),
            });
        }
        Ok(())
    }
}
