use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::controller::{Event, State};
use crate::data::model::file_name_of;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open data file…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Choose spectra folder…").clicked() {
                choose_spectra_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Quit").clicked() {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.separator();
        ui.label(RichText::new(state.dataset.file_name()).strong());
        ui.separator();
        ui.label(format!(
            "{} data points, {} visible",
            state.dataset.len(),
            state.visible_indices.len()
        ));
        ui.separator();
        match state.index.root() {
            Some(root) => ui.label(format!("{} spectra in {}", state.index.len(), root.display())),
            None => ui.label(RichText::new("no spectra folder").color(Color32::GRAY)),
        };
        if let (Some(first), Some(last)) = (state.controller.cursor().first(), state.controller.cursor().last()) {
            ui.separator();
            ui.label(format!("{first} to {last}"));
        }
    });
}

// ---------------------------------------------------------------------------
// Controls row
// ---------------------------------------------------------------------------

/// Variable selector, day stepping, view toggles and review actions.
pub fn controls(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        let current = state.controller.variable().to_string();
        let mut choice = None;
        egui::ComboBox::from_id_salt("variable")
            .selected_text(&current)
            .show_ui(ui, |ui: &mut Ui| {
                for name in state.dataset.variable_names() {
                    if ui.selectable_label(current == *name, name).clicked() {
                        choice = Some(name.clone());
                    }
                }
            });
        if let Some(name) = choice {
            state.handle(Event::SelectVariable(name));
        }

        ui.separator();

        if ui.button("Show all").clicked() {
            state.handle(Event::ShowAll);
        }
        if ui.button("◀ Previous day").clicked() {
            state.handle(Event::PreviousDay);
        }
        if ui.button("Next day ▶").clicked() {
            state.handle(Event::NextDay);
        }
        if ui
            .add(DatePickerButton::new(&mut state.jump_date).id_salt("jump_to_day"))
            .changed()
        {
            let day = state.jump_date;
            state.handle(Event::JumpToDay(day));
        }
        match state.controller.filter().day {
            Some(day) => ui.strong(day.format("%Y-%m-%d").to_string()),
            None => ui.label("all days"),
        };

        ui.separator();

        let mut exclude = state.controller.filter().exclude_flagged;
        if ui.checkbox(&mut exclude, "exclude flagged").changed() {
            state.handle(Event::ExcludeFlagged(exclude));
        }
        let has_errors = state.dataset.error_of(state.controller.variable()).is_some();
        let mut bars = state.controller.error_bars();
        if ui
            .add_enabled(has_errors, egui::Checkbox::new(&mut bars, "show error bars"))
            .changed()
        {
            state.handle(Event::ShowErrorBars(bars));
        }

        ui.separator();

        if ui
            .button("Mark day")
            .on_hover_text("Append the day on display to the review list")
            .clicked()
        {
            state.mark_day();
        }
        if ui
            .button("Delete spectrum")
            .on_hover_text("Put the selected spectrum on the list to filter out")
            .clicked()
        {
            state.delete_spectrum();
        }
    });
}

// ---------------------------------------------------------------------------
// Picked points
// ---------------------------------------------------------------------------

/// List the points under the last click: time, spectrum, value, pressure.
pub fn point_list(ui: &mut Ui, state: &AppState) {
    ui.strong("Picked points");
    ui.separator();
    if state.picked.is_empty() {
        ui.label("Nothing picked.");
        return;
    }

    let ds = &state.dataset;
    let variable = state.controller.variable();
    let values = ds.variable(variable).map(|v| &v.values);
    let pressure = ds.variable("pout").map(|v| &v.values);

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for &row in &state.picked {
                let mut line = ds.times[row].format("%Y-%m-%d %H:%M:%S").to_string();
                line.push_str("   ");
                line.push_str(ds.spectrum_name(row).unwrap_or("-"));
                if let Some(v) = values.and_then(|v| v.get(row)) {
                    line.push_str(&format!("   {variable} = {v:.6}"));
                }
                if let Some(p) = pressure.and_then(|p| p.get(row)) {
                    line.push_str(&format!("   {p} hPa"));
                }
                let mut text = RichText::new(line).monospace();
                if Some(row) == state.controller.selected_row() {
                    text = text.strong();
                }
                if ds.is_flagged(row) {
                    text = text.color(Color32::RED);
                }
                ui.label(text);
            }
        });

    if let crate::state::SpectrumView::Loaded(sp) = &state.spectrum {
        ui.separator();
        egui::CollapsingHeader::new("Spectrum header")
            .default_open(false)
            .show(ui, |ui: &mut Ui| {
                for (key, value) in &sp.header {
                    ui.label(RichText::new(format!("{key}  {value}")).monospace());
                }
            });
    }
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open data file")
        .add_filter("NetCDF", &["nc", "nc4", "cdf"])
        .add_filter("All files", &["*"])
        .pick_file();

    if let Some(path) = file {
        state.open_dataset(&path);
    }
}

pub fn choose_spectra_dialog(state: &mut AppState) {
    let mut dialog = rfd::FileDialog::new().set_title("Choose spectra folder");
    if let Some(root) = state.index.root() {
        dialog = dialog.set_directory(root);
    }
    if let Some(dir) = dialog.pick_folder() {
        state.set_spectra_root(&dir);
    }
}

// ---------------------------------------------------------------------------
// Status bar and error dialog
// ---------------------------------------------------------------------------

pub fn status_bar(ui: &mut Ui, state: &AppState) {
    ui.horizontal(|ui: &mut Ui| {
        match &state.status_message {
            Some(msg) if msg.starts_with("Error") => {
                ui.label(RichText::new(msg).color(Color32::RED));
            }
            Some(msg) => {
                ui.label(msg);
            }
            None => {
                ui.label(RichText::new(hint(state.controller.state())).color(Color32::GRAY));
            }
        }
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui: &mut Ui| {
            ui.label(format!(
                "review: {}  |  remove: {}",
                file_name_of(state.review.days.path()),
                file_name_of(state.review.spectra.path())
            ));
        });
    });
}

/// What the user can do next, shown while there is no status message.
fn hint(current: State) -> &'static str {
    match current {
        State::Idle => "Pick a variable or click a point to view its spectrum",
        State::VariableSelected => "Click a point to view its spectrum",
        State::PointClicked { .. } => "Delete spectrum adds the selected spectrum to the removal list",
        State::DayStepping { .. } => "Mark day adds the day on display to the review list",
    }
}

/// Modal-style window for write failures; stays until acknowledged.
pub fn error_dialog(ctx: &egui::Context, state: &mut AppState) {
    let Some(message) = state.error_dialog.clone() else {
        return;
    };
    let mut dismissed = false;
    egui::Window::new("Error")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui: &mut Ui| {
            ui.label(RichText::new(message).color(Color32::RED));
            ui.add_space(8.0);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });
    if dismissed {
        state.error_dialog = None;
    }
}
