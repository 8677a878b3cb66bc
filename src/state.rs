use std::path::Path;

use chrono::NaiveDate;

use crate::config::Config;
use crate::controller::{Controller, Event};
use crate::data::filter::visible_indices;
use crate::data::loader::load_file;
use crate::data::model::{file_name_of, Dataset};
use crate::review::ReviewFiles;
use crate::spectrum::locator::{Lookup, SpectrumIndex};
use crate::spectrum::reader::read_spectrum;
use crate::spectrum::Spectrum;

/// At most this many picked points are listed in the info panel.
pub const MAX_LISTED_POINTS: usize = 10;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// What the spectrum panel shows.
#[derive(Debug, Clone, PartialEq)]
pub enum SpectrumView {
    Nothing,
    Loaded(Spectrum),
    NotFound { row: usize },
    Failed { name: String, message: String },
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: Config,
    pub dataset: Dataset,
    pub controller: Controller,
    pub index: SpectrumIndex,
    pub review: ReviewFiles,

    /// Rows of the current variable passing the view filter (cached).
    pub visible_indices: Vec<usize>,

    /// Rows under the last click, nearest first.
    pub picked: Vec<usize>,

    pub spectrum: SpectrumView,

    /// Target of the date picker.
    pub jump_date: NaiveDate,

    /// Fit plot bounds to the visible points on the next frame.
    pub reset_view: bool,

    /// Status message shown in the bottom bar.
    pub status_message: Option<String>,

    /// Error shown in a modal dialog until acknowledged.
    pub error_dialog: Option<String>,
}

impl AppState {
    pub fn new(config: Config, dataset: Dataset, index: SpectrumIndex, review: ReviewFiles) -> Self {
        let controller = Controller::new(&dataset, &config.default_variable);
        let jump_date = controller.cursor().first().unwrap_or_default();
        let mut state = Self {
            config,
            dataset,
            controller,
            index,
            review,
            visible_indices: Vec::new(),
            picked: Vec::new(),
            spectrum: SpectrumView::Nothing,
            jump_date,
            reset_view: true,
            status_message: None,
            error_dialog: None,
        };
        state.refilter();
        state
    }

    /// Feed an event to the controller and carry out its effects.
    pub fn handle(&mut self, event: Event) {
        let effects = self.controller.handle(&self.dataset, event);
        if effects.refilter {
            self.refilter();
        }
        if effects.reset_view {
            self.reset_view = true;
        }
        if let Some(day) = self.controller.filter().day {
            self.jump_date = day;
        }
        if let Some(row) = effects.locate {
            self.show_spectrum_for(row);
        }
    }

    /// A click picked `rows` (nearest first); an empty pick changes nothing.
    pub fn pick(&mut self, rows: Vec<usize>) {
        let Some(&nearest) = rows.first() else {
            return;
        };
        self.picked = rows.into_iter().take(MAX_LISTED_POINTS).collect();
        self.handle(Event::ClickPoint(nearest));
    }

    /// Recompute `visible_indices` after a variable or filter change.
    pub fn refilter(&mut self) {
        self.visible_indices = visible_indices(
            &self.dataset,
            self.controller.variable(),
            self.controller.filter(),
        );
    }

    fn show_spectrum_for(&mut self, row: usize) {
        let name = self.dataset.spectrum_name(row);
        let at = self.dataset.times[row];
        log::info!("Looking for spectrum {} at {at}", name.unwrap_or("<unnamed>"));

        self.spectrum = match self.index.locate(name, at) {
            Lookup::Found(path) => match read_spectrum(&path) {
                Ok(sp) => SpectrumView::Loaded(sp),
                Err(e) => {
                    log::error!("Failed to read spectrum: {e:#}");
                    SpectrumView::Failed {
                        name: file_name_of(&path),
                        message: e.to_string(),
                    }
                }
            },
            Lookup::Miss => {
                log::info!("No spectrum found");
                SpectrumView::NotFound { row }
            }
        };
    }

    /// Identifier written to the removal file: the spectrum name recorded
    /// in the data file, else the name of the spectrum file on display.
    pub fn current_spectrum_id(&self) -> Option<String> {
        let row = self.controller.selected_row()?;
        if let Some(name) = self.dataset.spectrum_name(row) {
            return Some(name.to_string());
        }
        match &self.spectrum {
            SpectrumView::Loaded(sp) => Some(sp.name.clone()),
            SpectrumView::Failed { name, .. } => Some(name.clone()),
            _ => None,
        }
    }

    /// Day marked for review: the day on display, else the clicked point's day.
    pub fn current_review_day(&self) -> Option<NaiveDate> {
        self.controller.filter().day.or_else(|| {
            self.controller
                .selected_row()
                .map(|row| self.dataset.times[row].date())
        })
    }

    pub fn mark_day(&mut self) {
        let Some(day) = self.current_review_day() else {
            self.status_message = Some("Select a day or a point first".to_string());
            return;
        };
        match self.review.mark_day(day) {
            Ok(()) => self.status_message = Some(format!("{day} marked for review")),
            Err(e) => self.report_write_error(e),
        }
    }

    pub fn delete_spectrum(&mut self) {
        let Some(id) = self.current_spectrum_id() else {
            self.status_message = Some("Click a point first".to_string());
            return;
        };
        match self.review.flag_spectrum(&id) {
            Ok(()) => self.status_message = Some(format!("{id} marked for deletion")),
            Err(e) => self.report_write_error(e),
        }
    }

    fn report_write_error(&mut self, e: crate::review::WriteError) {
        log::error!("{e:#}");
        self.error_dialog = Some(e.to_string());
    }

    /// Replace the dataset. Failure leaves the current one in place.
    pub fn open_dataset(&mut self, path: &Path) {
        match load_file(path) {
            Ok(dataset) => {
                self.controller = Controller::new(&dataset, &self.config.default_variable);
                self.jump_date = self.controller.cursor().first().unwrap_or_default();
                self.dataset = dataset;
                self.picked.clear();
                self.spectrum = SpectrumView::Nothing;
                self.reset_view = true;
                self.status_message = Some(format!("Loaded {}", self.dataset.file_name()));
                self.refilter();
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    pub fn set_spectra_root(&mut self, root: &Path) {
        self.index = SpectrumIndex::build(root, self.config.match_tolerance());
        self.config.spectra_root = Some(root.to_path_buf());
        self.status_message = Some(format!(
            "{} spectra indexed under {}",
            self.index.len(),
            root.display()
        ));
    }
}
