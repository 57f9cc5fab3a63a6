//! Logging helpers.
//!
//! The `log_*` macros forward to the `log` crate only when the calling module
//! defines `const ENABLE_LOGS: bool = true;`. Polling code logs on every tick,
//! so each module can be silenced on its own without touching `RUST_LOG`.

use log::LevelFilter;

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Installs `env_logger`. Without `RUST_LOG` only Info and above is shown
/// until [`set_debug`] is called.
pub fn init() {
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .format_target(false)
        .try_init();

    if !explicit_filter() {
        log::set_max_level(LevelFilter::Info);
    }
}

/// Raises verbosity to Debug unless `RUST_LOG` already decided it.
pub fn set_debug(enabled: bool) {
    if enabled && !explicit_filter() {
        log::set_max_level(LevelFilter::Debug);
    }
}

fn explicit_filter() -> bool {
    std::env::var_os("RUST_LOG").is_some()
}
