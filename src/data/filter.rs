use chrono::NaiveDate;

use super::model::Dataset;

// ---------------------------------------------------------------------------
// View filter: which rows of the selected variable are drawn
// ---------------------------------------------------------------------------

/// Row predicate for the time-series plot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewFilter {
    /// Restrict to a single UTC day; `None` shows every day.
    pub day: Option<NaiveDate>,
    /// Hide rows whose `flag` is non-zero.
    pub exclude_flagged: bool,
}

/// Return indices of rows of `variable` that pass `filter`.
///
/// A row passes when:
/// * its value is finite (NaN fill values cannot be drawn or picked)
/// * it lies on `filter.day`, if one is set
/// * it is unflagged, if `filter.exclude_flagged` is set
///
/// An unknown variable yields no rows.
pub fn visible_indices(dataset: &Dataset, variable: &str, filter: &ViewFilter) -> Vec<usize> {
    let Some(var) = dataset.variable(variable) else {
        return Vec::new();
    };

    var.values
        .iter()
        .zip(&dataset.times)
        .enumerate()
        .filter(|(row, (value, time))| {
            if !value.is_finite() {
                return false;
            }
            if filter.day.is_some_and(|day| time.date() != day) {
                return false;
            }
            !(filter.exclude_flagged && dataset.is_flagged(*row))
        })
        .map(|(row, _)| row)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::sample_dataset;

    #[test]
    fn all_days_skips_non_finite_values() {
        let ds = sample_dataset();
        let rows = visible_indices(&ds, "xco2", &ViewFilter::default());
        assert_eq!(rows, [0, 1, 3, 4]);
    }

    #[test]
    fn single_day() {
        let ds = sample_dataset();
        let filter = ViewFilter {
            day: NaiveDate::from_ymd_opt(2020, 5, 4),
            exclude_flagged: false,
        };
        assert_eq!(visible_indices(&ds, "xluft", &filter), [3, 4]);
    }

    #[test]
    fn exclude_flagged_rows() {
        let ds = sample_dataset();
        let filter = ViewFilter {
            day: None,
            exclude_flagged: true,
        };
        assert_eq!(visible_indices(&ds, "xluft", &filter), [0, 1, 2, 4]);
    }

    #[test]
    fn unknown_variable_shows_nothing() {
        let ds = sample_dataset();
        assert!(visible_indices(&ds, "nope", &ViewFilter::default()).is_empty());
    }
}
