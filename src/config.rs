use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Settings (JSON file, overridden by CLI flags)
// ---------------------------------------------------------------------------

/// Runtime settings. Every field has a default, so a config file only needs
/// the keys it changes:
///
/// ```json
/// { "spectra_root": "/procdata/spectra", "match_tolerance_secs": 300 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spectra_root: Option<PathBuf>,
    /// Variable shown at startup when the file has it.
    pub default_variable: String,
    /// Directory receiving the review files.
    pub review_dir: PathBuf,
    /// Day review file name; `{stamp}` is replaced by the session start time.
    pub day_file: String,
    /// Spectrum removal file name; `{stamp}` as above.
    pub spectrum_file: String,
    /// Largest gap between a data point and a spectrum matched by time.
    pub match_tolerance_secs: u32,
    /// Click radius for picking a point, in screen pixels.
    pub pick_radius_px: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spectra_root: None,
            default_variable: "xluft".to_string(),
            review_dir: PathBuf::from("."),
            day_file: "days_to_review_{stamp}.dat".to_string(),
            spectrum_file: "spc_to_remove_{stamp}.dat".to_string(),
            match_tolerance_secs: 120,
            pick_radius_px: 8.0,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn match_tolerance(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.match_tolerance_secs))
    }

    pub fn day_file_path(&self, stamp: &str) -> PathBuf {
        self.review_dir.join(self.day_file.replace("{stamp}", stamp))
    }

    pub fn spectrum_file_path(&self, stamp: &str) -> PathBuf {
        self.review_dir.join(self.spectrum_file.replace("{stamp}", stamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "spectra_root": "/spc", "match_tolerance_secs": 30 }}"#).unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.spectra_root, Some(PathBuf::from("/spc")));
        assert_eq!(cfg.match_tolerance(), TimeDelta::seconds(30));
        assert_eq!(cfg.default_variable, "xluft");
    }

    #[test]
    fn review_paths_carry_the_stamp() {
        let cfg = Config {
            review_dir: PathBuf::from("/tmp/review"),
            ..Config::default()
        };
        assert_eq!(
            cfg.day_file_path("20240101120000"),
            PathBuf::from("/tmp/review/days_to_review_20240101120000.dat")
        );
        assert_eq!(
            cfg.spectrum_file_path("20240101120000"),
            PathBuf::from("/tmp/review/spc_to_remove_20240101120000.dat")
        );
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            Config::load(Path::new("/no/such/config.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}
