use eframe::egui;

use histoviz::graph_utils::seed::seed_graph;
use histoviz::gui::frontend::VisualizerApp;
use histoviz::persistence::persist;
use histoviz::persistence::settings::AppSettings;

fn main() -> eframe::Result {
    env_logger::init();
    let settings = AppSettings::load().unwrap_or_else(|e| {
        log::warn!("settings unreadable, using defaults: {:#}", e);
        AppSettings::default()
    });
    persist::set_settings_override(settings.clone());
    let loaded_state = match persist::load_active() {
        Ok(state) => state,
        Err(e) => {
            log::warn!("ignoring unreadable autosave: {:#}", e);
            None
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 710.0])
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "HistoViz",
        options,
        Box::new(move |_cc| {
            if let Some(state) = loaded_state {
                Ok(Box::new(VisualizerApp::from_state(state, settings)) as Box<dyn eframe::App>)
            } else {
                // First run: the built-in sample graph
                Ok(Box::new(VisualizerApp::new(seed_graph(), settings)) as Box<dyn eframe::App>)
            }
        }),
    )
}
