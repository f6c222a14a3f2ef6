//! Logger setup for native and browser builds.

use log::LevelFilter;

/// Install the global logger.
///
/// Native builds use env_logger with `level` as the default filter; `RUST_LOG`
/// still overrides it. Browser builds log to the developer console. Calling
/// this twice keeps the first logger.
#[cfg(not(target_arch = "wasm32"))]
pub fn init(level: LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();

    if result.is_err() {
        log::debug!("Logger already initialized");
    }
}

#[cfg(target_arch = "wasm32")]
pub fn init(level: LevelFilter) {
    console_error_panic_hook::set_once();
    let level = level.to_level().unwrap_or(log::Level::Error);
    if console_log::init_with_level(level).is_err() {
        log::debug!("Logger already initialized");
    }
}
