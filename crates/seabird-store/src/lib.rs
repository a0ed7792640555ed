pub mod config;
pub mod error;
pub mod geodata;
pub mod inputs;
pub mod output;
pub mod schema;
pub mod store;
pub mod tables;

pub use config::{AllocationSettings, ColonySettings, GridSettings, InputPaths, OutputSettings, RunConfig};
pub use error::{Result, StoreError};
pub use inputs::RunInputs;
pub use output::{write_covariates, write_distribution, write_distributions};
pub use store::{ArchivedRow, RunSummary, Store};
