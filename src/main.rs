mod app;
mod core;
mod events;
mod models;
mod ui;
mod utils;

use eframe::NativeOptions;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    // Setup file-based logging
    let file_appender = tracing_appender::rolling::never(".", "parlance.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(non_blocking)
        .init();

    let runtime = Runtime::new().expect("Failed to create Tokio runtime");
    // Background tasks are spawned from the UI thread; entering the runtime
    // makes tokio::spawn work there while the workers run the tasks.
    let _enter = runtime.enter();

    let native_options = NativeOptions::default();
    eframe::run_native(
        "Parlance",
        native_options,
        Box::new(move |cc| {
            let app = ui::app_layout::App::new(cc);
            Ok(Box::new(app))
        }),
    )
}
