//! Panic hook, console logger and clock

use log::{Level, LevelFilter, Log, Metadata, Record};

pub fn set_panic_hook() {
    // When the `console_error_panic_hook` feature is enabled, we can call the
    // `set_panic_hook` function at least once during initialization, and then
    // we will get better error messages if our code ever panics.
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[cfg(target_arch = "wasm32")]
mod console {
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_namespace = console, js_name = log)]
        pub fn console_log(s: &str);

        #[wasm_bindgen(js_namespace = console, js_name = warn)]
        pub fn console_warn(s: &str);

        #[wasm_bindgen(js_namespace = console, js_name = error)]
        pub fn console_error(s: &str);
    }
}

/// Forwards `log` records to the browser console
struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[WASM] {} {}: {}", record.level(), record.target(), record.args());
        write_line(record.level(), &line);
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
fn write_line(level: Level, line: &str) {
    match level {
        Level::Error => console::console_error(line),
        Level::Warn => console::console_warn(line),
        _ => console::console_log(line),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn write_line(level: Level, line: &str) {
    if level <= Level::Warn {
        eprintln!("{line}");
    }
}

/// Install the console logger (once) and set the level.
///
/// Safe to call repeatedly; later calls only adjust the level.
pub fn init_logger(level: LevelFilter) {
    // Err means a logger is already installed, possibly ours
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// Milliseconds for calculation timing
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}
