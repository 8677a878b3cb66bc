use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};

use super::error::LoadError;

/// Name of the per-row quality flag variable (0 = good).
pub const FLAG_VARIABLE: &str = "flag";
/// Suffix of uncertainty companions, e.g. `xco2_error`.
pub const ERROR_SUFFIX: &str = "_error";

// ---------------------------------------------------------------------------
// Variable – one named time series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub long_name: Option<String>,
    pub units: Option<String>,
    /// One value per dataset row.
    pub values: Vec<f64>,
}

impl Variable {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            long_name: None,
            units: None,
            values,
        }
    }

    /// `long_name [units]`, falling back to the variable name.
    pub fn axis_label(&self) -> String {
        let title = self.long_name.as_deref().unwrap_or(&self.name);
        match self.units.as_deref() {
            Some(u) if !u.is_empty() => format!("{title} [{u}]"),
            _ => title.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the loaded file
// ---------------------------------------------------------------------------

/// The loaded data file. Immutable once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: PathBuf,
    /// UTC timestamp of each row.
    pub times: Vec<NaiveDateTime>,
    /// Plottable variable names in display order.
    names: Vec<String>,
    variables: HashMap<String, Variable>,
    /// Spectrum name per row, when the file records one.
    spectrum_names: Option<Vec<String>>,
}

impl Dataset {
    /// Assemble a dataset, dropping variables whose length does not match `times`.
    pub fn from_parts(
        source: impl Into<PathBuf>,
        times: Vec<NaiveDateTime>,
        variables: Vec<Variable>,
        spectrum_names: Option<Vec<String>>,
    ) -> Result<Self, LoadError> {
        let rows = times.len();
        let mut names = Vec::new();
        let mut by_name = HashMap::new();

        for var in variables {
            if var.values.len() != rows {
                log::warn!(
                    "Dropping '{}': {} values for {rows} timestamps",
                    var.name,
                    var.values.len()
                );
                continue;
            }
            if !var.name.ends_with(ERROR_SUFFIX) {
                names.push(var.name.clone());
            }
            by_name.insert(var.name.clone(), var);
        }

        if names.is_empty() {
            return Err(LoadError::NoVariables);
        }

        // Column-averaged mole fractions (xco2, xch4, xluft, …) go first.
        let is_column_average = |n: &String| n.starts_with('x') && !n.contains('_');
        let (mut ordered, rest): (Vec<String>, Vec<String>) =
            names.into_iter().partition(is_column_average);
        ordered.extend(rest);

        let spectrum_names = spectrum_names.filter(|s| {
            let ok = s.len() == rows;
            if !ok {
                log::warn!("Ignoring spectrum names: {} names for {rows} rows", s.len());
            }
            ok
        });

        Ok(Self {
            source: source.into(),
            times,
            names: ordered,
            variables: by_name,
            spectrum_names,
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn file_name(&self) -> String {
        file_name_of(&self.source)
    }

    /// Plottable variable names, column averages first.
    pub fn variable_names(&self) -> &[String] {
        &self.names
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// The `<name>_error` companion, if the file has one.
    pub fn error_of(&self, name: &str) -> Option<&Variable> {
        self.variables.get(&format!("{name}{ERROR_SUFFIX}"))
    }

    /// `preferred` if present, otherwise the first plottable variable.
    pub fn default_variable<'a>(&'a self, preferred: &'a str) -> &'a str {
        self.names
            .iter()
            .find(|n| *n == preferred)
            .or_else(|| self.names.first())
            .map(String::as_str)
            .unwrap_or(preferred)
    }

    /// Whether the spectrum names were present in the file.
    pub fn has_spectrum_names(&self) -> bool {
        self.spectrum_names.is_some()
    }

    pub fn spectrum_name(&self, row: usize) -> Option<&str> {
        self.spectrum_names
            .as_ref()
            .and_then(|names| names.get(row))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// A row is flagged when its `flag` value is non-zero. Files without a
    /// flag variable have no flagged rows.
    pub fn is_flagged(&self, row: usize) -> bool {
        self.variables
            .get(FLAG_VARIABLE)
            .and_then(|f| f.values.get(row))
            .is_some_and(|&v| v != 0.0 && !v.is_nan())
    }

    /// Distinct UTC dates with at least one row, ascending.
    pub fn days(&self) -> Vec<NaiveDate> {
        self.times
            .iter()
            .map(NaiveDateTime::date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    /// Three days of data: two rows on the 1st, one on the 2nd, two on the 4th.
    pub(crate) fn sample_dataset() -> Dataset {
        let times = vec![
            ts("2020-05-01 08:00:00"),
            ts("2020-05-01 12:30:00"),
            ts("2020-05-02 09:15:00"),
            ts("2020-05-04 07:45:00"),
            ts("2020-05-04 16:00:00"),
        ];
        let mut xco2 = Variable::new("xco2", vec![410.1, 410.4, f64::NAN, 409.8, 411.0]);
        xco2.long_name = Some("column-average CO2".into());
        xco2.units = Some("ppm".into());
        let variables = vec![
            Variable::new("pout", vec![1010.0, 1011.0, 1009.5, 1012.0, 1008.0]),
            xco2,
            Variable::new("xco2_error", vec![0.3, 0.3, 0.4, 0.2, 0.5]),
            Variable::new(FLAG_VARIABLE, vec![0.0, 0.0, 0.0, 3.0, 0.0]),
            Variable::new("xluft", vec![0.99, 1.0, 1.01, 0.98, 1.0]),
            Variable::new("xh2o_column", vec![1.0; 5]),
        ];
        let names = (0..5).map(|i| format!("sa2020050{i}s.{i:03}")).collect();
        Dataset::from_parts("/data/sample.private.nc", times, variables, Some(names)).unwrap()
    }

    #[test]
    fn orders_column_averages_first() {
        let ds = sample_dataset();
        assert_eq!(
            ds.variable_names(),
            ["xco2", "xluft", "pout", "flag", "xh2o_column"]
        );
    }

    #[test]
    fn error_companions_are_hidden_but_reachable() {
        let ds = sample_dataset();
        assert!(!ds.variable_names().iter().any(|n| n == "xco2_error"));
        assert_eq!(ds.error_of("xco2").map(|v| v.values[0]), Some(0.3));
        assert!(ds.error_of("xluft").is_none());
    }

    #[test]
    fn drops_variables_with_wrong_length() {
        let times = vec![ts("2020-01-01 00:00:00"), ts("2020-01-01 01:00:00")];
        let ds = Dataset::from_parts(
            "a.nc",
            times,
            vec![Variable::new("xco2", vec![1.0, 2.0]), Variable::new("bad", vec![1.0])],
            Some(vec!["only-one".into()]),
        )
        .unwrap();
        assert_eq!(ds.variable_names(), ["xco2"]);
        assert!(!ds.has_spectrum_names());
    }

    #[test]
    fn no_plottable_variables_is_a_load_error() {
        let err = Dataset::from_parts(
            "a.nc",
            vec![ts("2020-01-01 00:00:00")],
            vec![Variable::new("xco2_error", vec![1.0])],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::NoVariables));
    }

    #[test]
    fn default_variable_falls_back_to_first() {
        let ds = sample_dataset();
        assert_eq!(ds.default_variable("xluft"), "xluft");
        assert_eq!(ds.default_variable("xn2o"), "xco2");
    }

    #[test]
    fn flags_and_days() {
        let ds = sample_dataset();
        assert!(ds.is_flagged(3));
        assert!(!ds.is_flagged(0));
        assert_eq!(
            ds.days(),
            [
                NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 5, 2).unwrap(),
                NaiveDate::from_ymd_opt(2020, 5, 4).unwrap(),
            ]
        );
    }

    #[test]
    fn axis_label_uses_long_name_and_units() {
        let ds = sample_dataset();
        assert_eq!(ds.variable("xco2").unwrap().axis_label(), "column-average CO2 [ppm]");
        assert_eq!(ds.variable("pout").unwrap().axis_label(), "pout");
        assert_eq!(ds.file_name(), "sample.private.nc");
    }
}
