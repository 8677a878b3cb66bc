use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("cannot write review file {}: {source}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

// ---------------------------------------------------------------------------
// Append-only review file
// ---------------------------------------------------------------------------

/// A newline-delimited text file that only ever grows. The file is opened,
/// appended and closed on every mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewLog {
    path: PathBuf,
}

impl ReviewLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry` as one line, creating the file if needed. Duplicates
    /// are written as-is.
    pub fn append(&self, entry: &str) -> Result<(), WriteError> {
        let err = |source| WriteError {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(err)?;
        writeln!(file, "{}", entry.trim_end_matches(['\r', '\n'])).map_err(err)?;
        log::info!("Appended '{entry}' to {}", self.path.display());
        Ok(())
    }
}

/// The two review outputs of a session.
#[derive(Debug, Clone)]
pub struct ReviewFiles {
    /// Dates marked for review, `YYYY-MM-DD`.
    pub days: ReviewLog,
    /// Spectrum identifiers flagged for removal.
    pub spectra: ReviewLog,
}

impl ReviewFiles {
    pub fn new(days: impl Into<PathBuf>, spectra: impl Into<PathBuf>) -> Self {
        Self {
            days: ReviewLog::new(days),
            spectra: ReviewLog::new(spectra),
        }
    }

    pub fn mark_day(&self, day: NaiveDate) -> Result<(), WriteError> {
        self.days.append(&day.format("%Y-%m-%d").to_string())
    }

    pub fn flag_spectrum(&self, id: &str) -> Result<(), WriteError> {
        self.spectra.append(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(dir: &Path) -> ReviewFiles {
        ReviewFiles::new(dir.join("days.dat"), dir.join("spc.dat"))
    }

    #[test]
    fn marking_the_same_day_twice_appends_two_lines() {
        let dir = tempfile::tempdir().unwrap();
        let review = files(dir.path());
        let day = NaiveDate::from_ymd_opt(2019, 8, 15).unwrap();

        review.mark_day(day).unwrap();
        review.mark_day(day).unwrap();

        let text = std::fs::read_to_string(review.days.path()).unwrap();
        assert_eq!(text, "2019-08-15\n2019-08-15\n");
        assert!(!review.spectra.path().exists());
    }

    #[test]
    fn flagging_a_spectrum_appends_exactly_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let review = files(dir.path());
        std::fs::write(review.spectra.path(), "earlier.001\n").unwrap();

        review.flag_spectrum("br20190815saaaaa.043").unwrap();

        let text = std::fs::read_to_string(review.spectra.path()).unwrap();
        assert_eq!(text, "earlier.001\nbr20190815saaaaa.043\n");
    }

    #[test]
    fn trailing_newlines_are_not_doubled() {
        let dir = tempfile::tempdir().unwrap();
        let log = ReviewLog::new(dir.path().join("x.dat"));
        log.append("abc\n").unwrap();
        assert_eq!(std::fs::read_to_string(log.path()).unwrap(), "abc\n");
    }

    #[test]
    fn unwritable_location_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = ReviewLog::new(dir.path().join("missing-dir").join("x.dat"));
        let err = log.append("abc").unwrap_err();
        assert_eq!(err.path, dir.path().join("missing-dir").join("x.dat"));
    }
}
