//! Logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! Chatty modules (the wizard, the recorder) can be silenced without touching
//! `RUST_LOG` by flipping their flag:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn};
//!
//! log_info!("participant {} reached {:?}", session_id, page);
//! ```

/// Forwards to the matching `log` macro when the calling module's
/// `ENABLE_LOGS` const is `true`.
#[macro_export]
macro_rules! log_if_enabled {
    ($level:ident, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::$level!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::log_if_enabled!(debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::log_if_enabled!(info, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::log_if_enabled!(warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::log_if_enabled!(error, $($arg)*)
    };
}
