/// Data layer: core types, loading, and row filtering.
///
/// Architecture:
/// ```text
///   private.nc (NetCDF)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  netcdf variables → Dataset   (time units via `time`)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  timestamps, named series, spectrum names
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  day / flag predicates → visible row indices
///   └──────────┘
/// ```

pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod time;
