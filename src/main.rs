mod app;
mod config;
mod controller;
mod data;
mod review;
mod spectrum;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::Context;
use app::CheckerApp;
use clap::Parser;
use eframe::egui;

use config::Config;
use review::ReviewFiles;
use spectrum::locator::SpectrumIndex;
use state::AppState;

/// Interactive quality check of retrieval time series against their spectra.
#[derive(Debug, Parser)]
#[command(name = "nc-checker", version, about)]
struct Cli {
    /// NetCDF file with the time series to review
    data_file: PathBuf,

    /// Folder searched (recursively) for spectrum files
    spectra_root: Option<PathBuf>,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Variable shown at startup
    #[arg(long)]
    variable: Option<String>,

    /// Directory receiving the review files
    #[arg(long)]
    review_dir: Option<PathBuf>,

    /// Largest gap in seconds when matching a spectrum by time
    #[arg(long)]
    tolerance: Option<u32>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(PathBuf, Config)> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(root) = self.spectra_root {
            config.spectra_root = Some(root);
        }
        if let Some(variable) = self.variable {
            config.default_variable = variable;
        }
        if let Some(dir) = self.review_dir {
            config.review_dir = dir;
        }
        if let Some(secs) = self.tolerance {
            config.match_tolerance_secs = secs;
        }
        Ok((self.data_file, config))
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let (data_file, config) = Cli::parse().into_config()?;

    let dataset = data::loader::load_file(&data_file)
        .with_context(|| format!("cannot open {}", data_file.display()))?;

    let index = match &config.spectra_root {
        Some(root) => {
            let index = SpectrumIndex::build(root, config.match_tolerance());
            if index.is_empty() {
                log::warn!("No spectrum files under {}", root.display());
            }
            index
        }
        None => {
            log::warn!("No spectra folder given, spectra will not be shown");
            SpectrumIndex::empty(config.match_tolerance())
        }
    };

    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
    let review = ReviewFiles::new(config.day_file_path(&stamp), config.spectrum_file_path(&stamp));
    log::info!(
        "Review files: {} and {}",
        review.days.path().display(),
        review.spectra.path().display()
    );

    let title = format!("nc-checker – {}", dataset.file_name());
    let state = AppState::new(config, dataset, index, review);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(&title)
            .with_inner_size([1300.0, 900.0])
            .with_min_inner_size([700.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(|_cc| Ok(Box::new(CheckerApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("window error: {e}"))
}
