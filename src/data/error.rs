use std::path::PathBuf;

use thiserror::Error;

use super::time::TimeUnitsError;

/// Failure to turn a data file into a [`Dataset`](super::model::Dataset).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read NetCDF file {}: {source}", path.display())]
    NetCdf {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    #[error("no one-dimensional 'time' variable")]
    NoTimeAxis,

    #[error("bad 'time' units: {0}")]
    TimeUnits(#[from] TimeUnitsError),

    #[error("row {row}: time value {value} is not a valid timestamp")]
    BadTimestamp { row: usize, value: f64 },

    #[error("no plottable variable along the time dimension")]
    NoVariables,
}
