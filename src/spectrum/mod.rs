//! Spectrum files: locating them under the spectra root and decoding them.

pub mod locator;
pub mod opus;
pub mod reader;

use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

/// A decoded spectrum ready for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// File name, used as the plot title.
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub x_label: String,
    /// Measurement time from the file header, when it records one.
    pub measured_at: Option<NaiveDateTime>,
    /// Selected header parameters (key, value) for the info panel.
    pub header: Vec<(String, String)>,
}

#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("truncated OPUS file: need {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("OPUS file has no {0}")]
    MissingBlock(&'static str),

    #[error("OPUS header lacks parameter {0}")]
    MissingParameter(&'static str),

    #[error("line {line}: cannot parse '{content}' as numbers")]
    Text { line: usize, content: String },

    #[error("spectrum file contains no data points")]
    Empty,
}
