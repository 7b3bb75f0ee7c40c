//! Library-level tracing macros.
//!
//! With the `logging` feature these forward to `tracing`; without it they
//! expand to nothing, so the store carries no logging dependency.
//!
//! ```rust,ignore
//! use crate::logging::{debug, info};
//!
//! info!(path = %path.display(), "store opened");
//! debug!(pattern = pattern, count = keys.len(), "listed keys");
//! ```

#[cfg(feature = "logging")]
mod imp {
    macro_rules! log_trace {
        ($($arg:tt)*) => { ::tracing::trace!($($arg)*) };
    }

    macro_rules! log_debug {
        ($($arg:tt)*) => { ::tracing::debug!($($arg)*) };
    }

    macro_rules! log_info {
        ($($arg:tt)*) => { ::tracing::info!($($arg)*) };
    }

    macro_rules! log_warn {
        ($($arg:tt)*) => { ::tracing::warn!($($arg)*) };
    }

    macro_rules! log_error {
        ($($arg:tt)*) => { ::tracing::error!($($arg)*) };
    }

    pub(crate) use log_debug;
    pub(crate) use log_error;
    pub(crate) use log_info;
    pub(crate) use log_trace;
    pub(crate) use log_warn;
}

#[cfg(not(feature = "logging"))]
mod imp {
    macro_rules! log_trace {
        ($($arg:tt)*) => {};
    }

    macro_rules! log_debug {
        ($($arg:tt)*) => {};
    }

    macro_rules! log_info {
        ($($arg:tt)*) => {};
    }

    macro_rules! log_warn {
        ($($arg:tt)*) => {};
    }

    macro_rules! log_error {
        ($($arg:tt)*) => {};
    }

    pub(crate) use log_debug;
    pub(crate) use log_error;
    pub(crate) use log_info;
    pub(crate) use log_trace;
    pub(crate) use log_warn;
}

pub(crate) use imp::log_debug as debug;
pub(crate) use imp::log_error as error;
pub(crate) use imp::log_info as info;
pub(crate) use imp::log_trace as trace;
pub(crate) use imp::log_warn as warn;
