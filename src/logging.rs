use log::LevelFilter;
use simplelog::{Config, WriteLogger};
use std::fs::File;

pub fn init_logging() {
    // If the log file cannot be created, run without logging rather than
    // failing startup.
    if let Ok(file) = File::create("basalt.log") {
        let _ = WriteLogger::init(LevelFilter::Info, Config::default(), file);
        log::info!("logger initialized");
    }
}
