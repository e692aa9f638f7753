//! Logging shorthands over the [`log`] facade.
//!
//! `ok!` and `info!` report setup steps, `debug!` per-thread detail, `trace!`
//! per-tick noise and `error!` contract violations. The sink is whatever logger the
//! host installed.
pub use mac::*;

pub mod mac {
    macro_rules! ok {
        ($($arg:tt)*) => {
            ::log::info!($($arg)*)
        };
    }
    pub(crate) use ok;
    macro_rules! info {
        ($($arg:tt)*) => {
            ::log::info!($($arg)*)
        };
    }
    pub(crate) use info;
    macro_rules! debug {
        ($($arg:tt)*) => {
            ::log::debug!($($arg)*)
        };
    }
    pub(crate) use debug;
    macro_rules! trace {
        ($($arg:tt)*) => {
            ::log::trace!($($arg)*)
        };
    }
    pub(crate) use trace;
    macro_rules! error {
        ($($arg:tt)*) => {
            ::log::error!($($arg)*)
        };
    }
    pub(crate) use error;
}
