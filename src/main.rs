use eframe::egui;
use redactfe::app::RedactApp;
use redactfe::cli;
use redactfe::logger;
use redactfe::settings::RedactSettings;

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        logger::init_cli(args.verbose);
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

    let settings = RedactSettings::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("RedactFE")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "RedactFE",
        options,
        Box::new(move |cc| Box::new(RedactApp::new(cc, settings))),
    )
}
