use std::path::Path;

use netcdf::AttributeValue;

use super::error::LoadError;
use super::model::{Dataset, Variable};
use super::time::TimeAxis;

/// Variable holding the timestamps of all rows.
const TIME_VARIABLE: &str = "time";
/// String variable naming the spectrum each row was retrieved from.
const SPECTRUM_VARIABLE: &str = "spectrum";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a NetCDF time-series file.
///
/// Every numeric variable whose single dimension is the dimension of `time`
/// becomes a [`Variable`]. Anything else (2-D fields, scalars, character
/// arrays) is skipped.
pub fn load_file(path: &Path) -> Result<Dataset, LoadError> {
    if !path.is_file() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let nc_err = |source| LoadError::NetCdf {
        path: path.to_path_buf(),
        source,
    };

    log::info!("Reading {}", path.display());
    let file = netcdf::open(path).map_err(nc_err)?;

    // ---- Time axis ----
    let time_var = file.variable(TIME_VARIABLE).ok_or(LoadError::NoTimeAxis)?;
    let time_dim = match time_var.dimensions() {
        [dim] => dim.name(),
        _ => return Err(LoadError::NoTimeAxis),
    };
    let axis = match string_attribute(&time_var, "units") {
        Some(units) => TimeAxis::parse(&units)?,
        None => TimeAxis::unix_seconds(),
    };
    let raw_times: Vec<f64> = time_var.get_values::<f64, _>(..).map_err(nc_err)?;
    let times = raw_times
        .iter()
        .enumerate()
        .map(|(row, &value)| {
            axis.to_datetime(value)
                .ok_or(LoadError::BadTimestamp { row, value })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // ---- Variables along the time dimension ----
    let mut variables = Vec::new();
    let mut spectrum_names = None;

    for var in file.variables() {
        let name = var.name();
        if name == TIME_VARIABLE {
            continue;
        }
        let along_time = matches!(var.dimensions(), [dim] if dim.name() == time_dim);
        if !along_time {
            log::debug!("Skipping '{name}': not a series along '{time_dim}'");
            continue;
        }

        if name == SPECTRUM_VARIABLE {
            spectrum_names = read_strings(&var, times.len());
            continue;
        }

        match var.get_values::<f64, _>(..) {
            Ok(raw) => variables.push(Variable {
                values: Packing::of(&var).decode(raw),
                long_name: string_attribute(&var, "long_name"),
                units: string_attribute(&var, "units"),
                name,
            }),
            Err(e) => log::debug!("Skipping non-numeric '{name}': {e}"),
        }
    }

    let dataset = Dataset::from_parts(path, times, variables, spectrum_names)?;
    log::info!(
        "{} data points, {} variables, spectrum names: {}",
        dataset.len(),
        dataset.variable_names().len(),
        dataset.has_spectrum_names()
    );
    Ok(dataset)
}

// -- NetCDF helpers --

fn string_attribute(var: &netcdf::Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

fn numeric_attribute(var: &netcdf::Variable, name: &str) -> Vec<f64> {
    let Some(value) = var.attribute(name).and_then(|a| a.value().ok()) else {
        return Vec::new();
    };
    match value {
        AttributeValue::Uchar(v) => vec![f64::from(v)],
        AttributeValue::Schar(v) => vec![f64::from(v)],
        AttributeValue::Ushort(v) => vec![f64::from(v)],
        AttributeValue::Short(v) => vec![f64::from(v)],
        AttributeValue::Uint(v) => vec![f64::from(v)],
        AttributeValue::Int(v) => vec![f64::from(v)],
        AttributeValue::Ulonglong(v) => vec![v as f64],
        AttributeValue::Longlong(v) => vec![v as f64],
        AttributeValue::Float(v) => vec![f64::from(v)],
        AttributeValue::Double(v) => vec![v],
        AttributeValue::Uchars(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Schars(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Ushorts(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Shorts(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Uints(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Ints(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Ulonglongs(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Longlongs(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Floats(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Doubles(v) => v,
        _ => Vec::new(),
    }
}

/// CF decoding of a numeric variable: fill masking, then unpacking.
#[derive(Debug, Clone, PartialEq)]
struct Packing {
    /// `_FillValue` and `missing_value` entries, in packed units.
    missing: Vec<f64>,
    scale_factor: f64,
    add_offset: f64,
}

impl Default for Packing {
    fn default() -> Self {
        Self {
            missing: Vec::new(),
            scale_factor: 1.0,
            add_offset: 0.0,
        }
    }
}

impl Packing {
    fn of(var: &netcdf::Variable) -> Self {
        let mut missing = numeric_attribute(var, "_FillValue");
        missing.extend(numeric_attribute(var, "missing_value"));
        Self {
            missing,
            scale_factor: numeric_attribute(var, "scale_factor").first().copied().unwrap_or(1.0),
            add_offset: numeric_attribute(var, "add_offset").first().copied().unwrap_or(0.0),
        }
    }

    /// Missing entries become NaN so the filter hides them.
    fn decode(&self, raw: Vec<f64>) -> Vec<f64> {
        raw.into_iter()
            .map(|v| {
                if self.missing.contains(&v) {
                    f64::NAN
                } else {
                    v * self.scale_factor + self.add_offset
                }
            })
            .collect()
    }
}

/// Read a variable-length string variable row by row. Returns `None` (with a
/// warning) if any row cannot be read, so spectrum lookup falls back to time.
fn read_strings(var: &netcdf::Variable, rows: usize) -> Option<Vec<String>> {
    let mut out = Vec::with_capacity(rows);
    for row in 0..rows {
        match var.get_string([row]) {
            Ok(s) => out.push(s.trim_end_matches('\0').trim().to_string()),
            Err(e) => {
                log::warn!("Cannot read spectrum names ({e}); matching by time only");
                return None;
            }
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{visible_indices, ViewFilter};
    use crate::data::model::tests::ts;
    use approx::assert_relative_eq;

    const FLOAT_FILL: f32 = 9.969_21e36;

    /// Four rows over two days, with one fill entry, one packed variable
    /// and two variables that are not series along `time`.
    fn write_fixture(path: &Path) -> Result<(), netcdf::Error> {
        let mut file = netcdf::create(path)?;
        file.add_dimension("time", 4)?;
        file.add_dimension("level", 2)?;

        {
            let mut time = file.add_variable::<f64>("time", &["time"])?;
            time.put_attribute("units", "hours since 2020-05-01 00:00:00")?;
            time.put_values(&[8.0, 8.5, 9.0, 33.0], ..)?;
        }
        file.add_variable::<f64>("xluft", &["time"])?
            .put_values(&[0.998, 0.999, 1.0, 1.001], ..)?;
        {
            let mut xco2 = file.add_variable::<f32>("xco2", &["time"])?;
            xco2.set_fill_value(FLOAT_FILL)?;
            xco2.put_attribute("long_name", "column-average CO2")?;
            xco2.put_attribute("units", "ppm")?;
            xco2.put_values(&[410.5, FLOAT_FILL, 411.25, 412.0], ..)?;
        }
        {
            let mut pout = file.add_variable::<i16>("pout", &["time"])?;
            pout.put_attribute("scale_factor", 0.1f64)?;
            pout.put_attribute("add_offset", 900.0f64)?;
            pout.put_attribute("missing_value", -32767i16)?;
            pout.put_values(&[500i16, 510, 520, -32767], ..)?;
        }
        file.add_variable::<f64>("ak", &["time", "level"])?
            .put_values(&[0.0; 8], ..)?;
        file.add_variable::<f64>("level", &["level"])?
            .put_values(&[1.0, 2.0], ..)?;

        let mut spectrum = file.add_string_variable("spectrum", &["time"])?;
        for (i, name) in ["sa.001", "sa.002", "sa.003", "sb.001"].iter().enumerate() {
            spectrum.put_string(name, [i])?;
        }
        Ok(())
    }

    fn loaded_fixture() -> Dataset {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.private.nc");
        write_fixture(&path).unwrap();
        load_file(&path).unwrap()
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_file(Path::new("/definitely/not/here.nc")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn garbage_file_is_a_netcdf_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.nc");
        std::fs::write(&path, b"this is not netcdf").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, LoadError::NetCdf { .. }));
    }

    #[test]
    fn loads_series_along_time_only() {
        let ds = loaded_fixture();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.file_name(), "site.private.nc");
        assert_eq!(ds.variable_names(), ["xluft", "xco2", "pout"]);
        assert!(ds.variable("ak").is_none());
        assert!(ds.variable("level").is_none());
        let xco2 = ds.variable("xco2").unwrap();
        assert_eq!(xco2.long_name.as_deref(), Some("column-average CO2"));
        assert_eq!(xco2.units.as_deref(), Some("ppm"));
    }

    #[test]
    fn time_units_come_from_the_attribute() {
        let ds = loaded_fixture();
        assert_eq!(ds.times[0], ts("2020-05-01 08:00:00"));
        assert_eq!(ds.times[1], ts("2020-05-01 08:30:00"));
        assert_eq!(ds.times[3], ts("2020-05-02 09:00:00"));
        assert_eq!(ds.days().len(), 2);
    }

    #[test]
    fn reads_spectrum_names() {
        let ds = loaded_fixture();
        assert!(ds.has_spectrum_names());
        assert_eq!(ds.spectrum_name(0), Some("sa.001"));
        assert_eq!(ds.spectrum_name(3), Some("sb.001"));
    }

    #[test]
    fn fill_values_are_masked_and_hidden() {
        let ds = loaded_fixture();
        let xco2 = &ds.variable("xco2").unwrap().values;
        assert_relative_eq!(xco2[0], 410.5);
        assert!(xco2[1].is_nan());
        assert_relative_eq!(xco2[2], 411.25);
        assert_eq!(visible_indices(&ds, "xco2", &ViewFilter::default()), [0, 2, 3]);
    }

    #[test]
    fn packed_values_are_unpacked() {
        let ds = loaded_fixture();
        let pout = &ds.variable("pout").unwrap().values;
        assert_relative_eq!(pout[0], 950.0, epsilon = 1e-9);
        assert_relative_eq!(pout[2], 952.0, epsilon = 1e-9);
        assert!(pout[3].is_nan());
    }

    #[test]
    fn file_without_time_has_no_axis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_time.nc");
        {
            let mut file = netcdf::create(&path).unwrap();
            file.add_dimension("row", 2).unwrap();
            let mut v = file.add_variable::<f64>("xluft", &["row"]).unwrap();
            v.put_values(&[1.0, 1.0], ..).unwrap();
        }
        assert!(matches!(load_file(&path).unwrap_err(), LoadError::NoTimeAxis));
    }

    #[test]
    fn decode_masks_before_unpacking() {
        let packing = Packing {
            missing: vec![-1.0],
            scale_factor: 2.0,
            add_offset: 10.0,
        };
        let out = packing.decode(vec![0.0, -1.0, 3.0]);
        assert_relative_eq!(out[0], 10.0);
        assert!(out[1].is_nan());
        assert_relative_eq!(out[2], 16.0);
        assert_eq!(Packing::default().decode(vec![4.5]), [4.5]);
    }
}
