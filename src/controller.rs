use chrono::NaiveDate;

use crate::data::filter::ViewFilter;
use crate::data::model::Dataset;

// ---------------------------------------------------------------------------
// Day cursor
// ---------------------------------------------------------------------------

/// Position in the ascending list of days that have data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCursor {
    days: Vec<NaiveDate>,
    pos: usize,
}

impl DayCursor {
    /// `days` must be ascending and distinct, as returned by [`Dataset::days`].
    pub fn new(days: Vec<NaiveDate>) -> Self {
        Self { days, pos: 0 }
    }

    pub fn current(&self) -> Option<NaiveDate> {
        self.days.get(self.pos).copied()
    }

    /// Move to the next day with data. Returns `false` on the last day.
    pub fn advance(&mut self) -> bool {
        if self.pos + 1 < self.days.len() {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Move to the previous day with data. Returns `false` on the first day.
    pub fn retreat(&mut self) -> bool {
        if self.pos > 0 {
            self.pos -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to the first day on or after `day`, or the last day if none.
    pub fn seek(&mut self, day: NaiveDate) -> bool {
        if self.days.is_empty() {
            return false;
        }
        let target = self.days.partition_point(|d| *d < day).min(self.days.len() - 1);
        let moved = target != self.pos;
        self.pos = target;
        moved
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }
}

// ---------------------------------------------------------------------------
// Selection state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Default variable shown, nothing chosen yet.
    Idle,
    VariableSelected,
    PointClicked { row: usize },
    DayStepping { day: NaiveDate },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SelectVariable(String),
    ClickPoint(usize),
    NextDay,
    PreviousDay,
    JumpToDay(NaiveDate),
    ShowAll,
    ExcludeFlagged(bool),
    ShowErrorBars(bool),
}

/// What the shell must do after an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
    /// Visible rows changed; recompute and redraw the time series.
    pub refilter: bool,
    /// Plot bounds should be fitted to the new view.
    pub reset_view: bool,
    /// Look up and render the spectrum of this row.
    pub locate: Option<usize>,
}

/// Variable selection, day stepping and view toggles.
#[derive(Debug, Clone)]
pub struct Controller {
    state: State,
    variable: String,
    cursor: DayCursor,
    filter: ViewFilter,
    error_bars: bool,
    selected_row: Option<usize>,
}

impl Controller {
    pub fn new(dataset: &Dataset, preferred_variable: &str) -> Self {
        Self {
            state: State::Idle,
            variable: dataset.default_variable(preferred_variable).to_string(),
            cursor: DayCursor::new(dataset.days()),
            filter: ViewFilter::default(),
            error_bars: false,
            selected_row: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn filter(&self) -> &ViewFilter {
        &self.filter
    }

    pub fn cursor(&self) -> &DayCursor {
        &self.cursor
    }

    pub fn error_bars(&self) -> bool {
        self.error_bars
    }

    pub fn selected_row(&self) -> Option<usize> {
        self.selected_row
    }

    pub fn handle(&mut self, dataset: &Dataset, event: Event) -> Effects {
        let before = self.state;
        let effects = match event {
            Event::SelectVariable(name) => {
                if dataset.variable(&name).is_none() {
                    log::warn!("Unknown variable '{name}'");
                    return Effects::default();
                }
                self.variable = name;
                self.state = State::VariableSelected;
                Effects {
                    refilter: true,
                    reset_view: true,
                    locate: None,
                }
            }
            Event::ClickPoint(row) => {
                if row >= dataset.len() {
                    return Effects::default();
                }
                self.selected_row = Some(row);
                self.state = State::PointClicked { row };
                Effects {
                    locate: Some(row),
                    ..Effects::default()
                }
            }
            Event::NextDay => {
                // Entering day view shows the cursor's day; stepping moves on.
                let moved = self.filter.day.is_some() && self.cursor.advance();
                self.show_cursor_day(moved)
            }
            Event::PreviousDay => {
                let moved = self.filter.day.is_some() && self.cursor.retreat();
                self.show_cursor_day(moved)
            }
            Event::JumpToDay(day) => {
                let moved = self.cursor.seek(day);
                self.show_cursor_day(moved)
            }
            Event::ShowAll => {
                let changed = self.filter.day.take().is_some();
                self.state = State::VariableSelected;
                Effects {
                    refilter: changed,
                    reset_view: true,
                    locate: None,
                }
            }
            Event::ExcludeFlagged(on) => {
                let changed = self.filter.exclude_flagged != on;
                self.filter.exclude_flagged = on;
                Effects {
                    refilter: changed,
                    ..Effects::default()
                }
            }
            Event::ShowErrorBars(on) => {
                self.error_bars = on;
                Effects::default()
            }
        };
        if self.state != before {
            log::debug!("Selection {before:?} -> {:?}", self.state);
        }
        effects
    }

    fn show_cursor_day(&mut self, moved: bool) -> Effects {
        let Some(day) = self.cursor.current() else {
            return Effects::default();
        };
        let entered = self.filter.day != Some(day);
        self.filter.day = Some(day);
        self.state = State::DayStepping { day };
        Effects {
            refilter: moved || entered,
            reset_view: moved || entered,
            locate: None,
        }
    }
}
