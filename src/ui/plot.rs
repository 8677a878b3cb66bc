use std::ops::RangeInclusive;

use chrono::TimeDelta;
use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{GridMark, Line, MarkerShape, Plot, PlotBounds, PlotPoint, PlotPoints, Points};

use crate::data::time::{day_start_x, from_plot_x, to_plot_x};
use crate::state::{AppState, SpectrumView};
use crate::ui::pick::rows_near;

const GOOD_COLOR: Color32 = Color32::BLACK;
const FLAGGED_COLOR: Color32 = Color32::RED;
const SELECTED_COLOR: Color32 = Color32::from_rgb(30, 144, 255);

/// Margin around a day in the day view, in seconds (2 h before, 2 h after).
const DAY_MARGIN_SECS: f64 = 2.0 * 3600.0;

// ---------------------------------------------------------------------------
// Time-series plot (central panel)
// ---------------------------------------------------------------------------

/// Render the selected variable against time and handle point picking.
pub fn time_series_plot(ui: &mut Ui, state: &mut AppState) {
    let dataset = &state.dataset;
    if dataset.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No data points in this file");
        });
        return;
    }
    let variable_name = state.controller.variable().to_string();
    let Some(variable) = dataset.variable(&variable_name) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(format!("Variable '{variable_name}' not found"));
        });
        return;
    };

    // (row, [x, y]) for every drawn marker; picking only considers these.
    let drawn: Vec<(usize, [f64; 2])> = state
        .visible_indices
        .iter()
        .map(|&row| (row, [to_plot_x(&dataset.times[row]), variable.values[row]]))
        .collect();
    let (flagged, good): (Vec<_>, Vec<_>) = drawn.iter().partition(|(row, _)| dataset.is_flagged(*row));

    let error_bars: Vec<[[f64; 2]; 2]> = match dataset.error_of(&variable_name) {
        Some(err) if state.controller.error_bars() => drawn
            .iter()
            .filter_map(|&(row, [x, y])| {
                let e = err.values[row];
                e.is_finite().then_some([[x, y - e], [x, y + e]])
            })
            .collect(),
        _ => Vec::new(),
    };

    let bounds = if state.reset_view {
        fit_bounds(&drawn, state.controller.filter().day)
    } else {
        None
    };
    let selected = state
        .controller
        .selected_row()
        .and_then(|row| drawn.iter().find(|(r, _)| *r == row))
        .map(|&(_, p)| p);

    let response = Plot::new("time_series_plot")
        .legend(egui_plot::Legend::default())
        .x_axis_label("Time (UTC)")
        .y_axis_label(variable.axis_label())
        .x_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| format_time_tick(mark.value))
        .label_formatter(|name, value: &PlotPoint| {
            let t = from_plot_x(value.x)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            if name.is_empty() {
                format!("{t}\n{:.6}", value.y)
            } else {
                format!("{name}\n{t}\n{:.6}", value.y)
            }
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            if let Some(b) = bounds {
                plot_ui.set_plot_bounds(b);
            }

            for [lo, hi] in &error_bars {
                plot_ui.line(Line::new(PlotPoints::from(vec![*lo, *hi])).color(Color32::GRAY).width(1.0));
            }

            let as_points = |pts: &[&(usize, [f64; 2])]| {
                PlotPoints::from(pts.iter().map(|(_, p)| *p).collect::<Vec<[f64; 2]>>())
            };
            plot_ui.points(
                Points::new(as_points(&good))
                    .name(format!("{variable_name} (flag = 0)"))
                    .color(GOOD_COLOR)
                    .shape(MarkerShape::Circle)
                    .filled(true)
                    .radius(2.0),
            );
            if !flagged.is_empty() {
                plot_ui.points(
                    Points::new(as_points(&flagged))
                        .name(format!("{variable_name} (flagged)"))
                        .color(FLAGGED_COLOR)
                        .shape(MarkerShape::Circle)
                        .filled(true)
                        .radius(2.0),
                );
            }
            if let Some(p) = selected {
                plot_ui.points(
                    Points::new(PlotPoints::from(vec![p]))
                        .color(SELECTED_COLOR)
                        .shape(MarkerShape::Circle)
                        .filled(false)
                        .radius(6.0),
                );
            }
        });

    if bounds.is_some() {
        state.reset_view = false;
    }

    if response.response.clicked() {
        if let Some(click) = response.response.interact_pointer_pos() {
            let transform = response.transform;
            let rows = rows_near(
                &drawn,
                |[x, y]| transform.position_from_point(&PlotPoint::new(x, y)),
                click,
                state.config.pick_radius_px,
            );
            state.pick(rows);
        }
    }
}

/// Bounds covering the drawn points: one day (with margins) in the day view,
/// otherwise whole days from the first to the last point.
fn fit_bounds(drawn: &[(usize, [f64; 2])], day: Option<chrono::NaiveDate>) -> Option<PlotBounds> {
    if drawn.is_empty() {
        return None;
    }
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, [x, y]) in drawn {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    let (first_day, last_day) = match day {
        Some(d) => (d, d),
        None => (
            from_plot_x(x_min)?.date(),
            from_plot_x(x_max)?.date(),
        ),
    };
    let one_day = TimeDelta::days(1).num_seconds() as f64;
    let x0 = day_start_x(first_day) - DAY_MARGIN_SECS;
    let x1 = day_start_x(last_day) + one_day + DAY_MARGIN_SECS;

    let pad = if (y_max - y_min).abs() < f64::EPSILON {
        y_max.abs().max(1.0) * 0.01
    } else {
        (y_max - y_min) * 0.05
    };
    Some(PlotBounds::from_min_max([x0, y_min - pad], [x1, y_max + pad]))
}

fn format_time_tick(x: f64) -> String {
    from_plot_x(x)
        .map(|t| t.format("%Y-%m-%d\n%H:%M").to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Spectrum plot (bottom panel)
// ---------------------------------------------------------------------------

/// Render the spectrum of the last clicked point.
pub fn spectrum_plot(ui: &mut Ui, state: &AppState) {
    let sp = match &state.spectrum {
        SpectrumView::Loaded(sp) => sp,
        SpectrumView::Nothing => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.label("Click a data point to view its spectrum");
            });
            return;
        }
        SpectrumView::NotFound { row } => {
            let name = state.dataset.spectrum_name(*row).unwrap_or("this point");
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.label(format!("No spectrum found for {name}"));
            });
            return;
        }
        SpectrumView::Failed { name, message } => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.label(RichText::new(format!("{name}: {message}")).color(Color32::RED));
            });
            return;
        }
    };

    match sp.measured_at {
        Some(t) => ui.strong(format!("{}   measured {} UTC", sp.name, t.format("%Y-%m-%d %H:%M:%S"))),
        None => ui.strong(&sp.name),
    };
    let points: PlotPoints = sp.x.iter().zip(&sp.y).map(|(&x, &y)| [x, y]).collect();

    // Keyed by name so a new spectrum starts with fitted bounds.
    Plot::new(("spectrum_plot", &sp.name))
        .x_axis_label(&sp.x_label)
        .y_axis_label("Intensity")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(points).name(&sp.name).color(Color32::LIGHT_BLUE).width(1.0));
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::ts;
    use approx::assert_relative_eq;

    #[test]
    fn day_view_spans_the_day_with_margins() {
        let day = chrono::NaiveDate::from_ymd_opt(2020, 5, 4).unwrap();
        let drawn = [
            (3, [to_plot_x(&ts("2020-05-04 07:45:00")), 1.0]),
            (4, [to_plot_x(&ts("2020-05-04 16:00:00")), 2.0]),
        ];
        let b = fit_bounds(&drawn, Some(day)).unwrap();
        assert_relative_eq!(b.min()[0], day_start_x(day) - 7200.0);
        assert_relative_eq!(b.max()[0], day_start_x(day) + 86_400.0 + 7200.0);
        assert_relative_eq!(b.min()[1], 0.95, epsilon = 1e-9);
        assert_relative_eq!(b.max()[1], 2.05, epsilon = 1e-9);
    }

    #[test]
    fn all_days_view_covers_first_to_last_day() {
        let drawn = [
            (0, [to_plot_x(&ts("2020-05-01 08:00:00")), 5.0]),
            (1, [to_plot_x(&ts("2020-05-04 16:00:00")), 5.0]),
        ];
        let b = fit_bounds(&drawn, None).unwrap();
        let first = chrono::NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        let last = chrono::NaiveDate::from_ymd_opt(2020, 5, 4).unwrap();
        assert_relative_eq!(b.min()[0], day_start_x(first) - 7200.0);
        assert_relative_eq!(b.max()[0], day_start_x(last) + 86_400.0 + 7200.0);
        // Flat series still gets a visible y range.
        assert!(b.max()[1] > b.min()[1]);
    }

    #[test]
    fn no_points_no_bounds() {
        assert!(fit_bounds(&[], None).is_none());
    }

    #[test]
    fn tick_labels_show_date_and_time() {
        let x = to_plot_x(&ts("2019-08-15 10:15:30"));
        assert_eq!(format_time_tick(x), "2019-08-15\n10:15");
    }
}
