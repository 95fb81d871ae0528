//! `log` backend for the browser console
//!
//! Off wasm there is no console to import, so records go to stderr instead.

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Routes `log` records to `console.error` / `warn` / `info` / `log` / `debug`
pub struct ConsoleLogger {
    level: LevelFilter,
}

impl ConsoleLogger {
    pub const fn new(level: LevelFilter) -> Self {
        Self { level }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        emit(record.level(), &format!("[{}] {}", record.target(), record.args()));
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
fn emit(level: Level, line: &str) {
    let line = wasm_bindgen::JsValue::from_str(line);
    match level {
        Level::Error => web_sys::console::error_1(&line),
        Level::Warn => web_sys::console::warn_1(&line),
        Level::Info => web_sys::console::info_1(&line),
        Level::Debug => web_sys::console::log_1(&line),
        Level::Trace => web_sys::console::debug_1(&line),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn emit(level: Level, line: &str) {
    eprintln!("{:<5} {}", level, line);
}

static LOGGER: ConsoleLogger = ConsoleLogger::new(LevelFilter::Trace);

/// Install the console logger once; later calls only change the level
pub fn init_logging(level: LevelFilter) {
    // Already installed on a second call
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// Parse a level name as accepted by `SeasonEngine::set_log_level`
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}
