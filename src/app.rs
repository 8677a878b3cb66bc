use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct CheckerApp {
    pub state: AppState,
}

impl CheckerApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for CheckerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar and controls ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
            ui.separator();
            panels::controls(ui, &mut self.state);
        });

        // ---- Status bar ----
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            panels::status_bar(ui, &self.state);
        });

        // ---- Bottom panel: picked points and spectrum ----
        egui::TopBottomPanel::bottom("spectrum_panel")
            .resizable(true)
            .default_height(280.0)
            .min_height(120.0)
            .show(ctx, |ui| {
                egui::SidePanel::left("point_list")
                    .resizable(true)
                    .default_width(420.0)
                    .show_inside(ui, |ui| {
                        panels::point_list(ui, &self.state);
                    });
                egui::CentralPanel::default().show_inside(ui, |ui| {
                    plot::spectrum_plot(ui, &self.state);
                });
            });

        // ---- Central panel: time series ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::time_series_plot(ui, &mut self.state);
        });

        panels::error_dialog(ctx, &mut self.state);
    }
}
