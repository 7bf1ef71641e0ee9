use codraw::app::CoDrawApp;
use codraw::settings::AppSettings;
use codraw::{cli, i18n, logger};
use codraw::log_info;
use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        logger::init();
        i18n::init();
        let args = cli::CliArgs::parse();
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS {
            0
        } else {
            1
        });
    }

    // -- GUI mode -----------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let settings = AppSettings::load();

    i18n::init();
    let language = if settings.language.is_empty() {
        i18n::detect_system_language()
    } else {
        settings.language.clone()
    };
    i18n::set_language(&language);
    log_info!("UI language: {}", i18n::current_language());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("CoDraw"),
        ..Default::default()
    };

    eframe::run_native(
        "CoDraw",
        options,
        Box::new(move |cc| Box::new(CoDrawApp::new(cc, settings))),
    )
}
