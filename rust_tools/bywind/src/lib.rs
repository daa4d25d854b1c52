// Library exports for testing and reuse

pub mod beacons;
pub mod building_function;
pub mod buildings;
pub mod calculator;
pub mod chunking;
pub mod citygml;
pub mod cli;
pub mod crs;
pub mod download;
pub mod error;
pub mod exclusion;
pub mod forest;
pub mod geofabrik;
pub mod io;
pub mod metalink;
pub mod scenario;
pub mod windspeed;

// Re-export commonly used types
pub use calculator::{CalculatorFactory, ExclusionCalculator, GdalCalculatorFactory};
pub use error::{BywindError, Result};
pub use exclusion::{Constraint, ValueRange};
