/*!

A thin logging shim over `tracing`.

The public surface is deliberately tiny: a global verbosity threshold and the level macros
`error!`, `warning!`, `info!`, `debug!`, and `trace!`. Each macro takes a channel number as its
first argument followed by `format!`-style arguments. Messages on channels above the global
threshold are suppressed before they reach the backend, so hot paths can log on high channels
without paying for formatting.

The backing implementation is `tracing`; swap this module's internals to change backends without
touching call sites.

*/

use std::sync::atomic::{AtomicU8, Ordering};

static GLOBAL_LOGGING_THRESHOLD: AtomicU8 = AtomicU8::new(1);

/// Messages on channels strictly greater than the threshold are suppressed.
pub fn set_global_logging_threshold(threshold: u8) {
  GLOBAL_LOGGING_THRESHOLD.store(threshold, Ordering::Relaxed);
}

pub fn get_global_logging_threshold() -> u8 {
  GLOBAL_LOGGING_THRESHOLD.load(Ordering::Relaxed)
}

/// Installs a `tracing` subscriber that prints to stderr. Intended for binaries and tests;
/// library code never calls this.
pub fn init_logging() {
  use tracing_subscriber::EnvFilter;

  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .try_init();
}

#[macro_export]
macro_rules! error {
  ($channel:expr, $($arg:tt)+) => {
    if ($channel as u8) <= $crate::log::get_global_logging_threshold() {
      $crate::tracing::error!($($arg)+);
    }
  };
}

#[macro_export]
macro_rules! warning {
  ($channel:expr, $($arg:tt)+) => {
    if ($channel as u8) <= $crate::log::get_global_logging_threshold() {
      $crate::tracing::warn!($($arg)+);
    }
  };
}

#[macro_export]
macro_rules! info {
  ($channel:expr, $($arg:tt)+) => {
    if ($channel as u8) <= $crate::log::get_global_logging_threshold() {
      $crate::tracing::info!($($arg)+);
    }
  };
}

#[macro_export]
macro_rules! debug {
  ($channel:expr, $($arg:tt)+) => {
    if ($channel as u8) <= $crate::log::get_global_logging_threshold() {
      $crate::tracing::debug!($($arg)+);
    }
  };
}

#[macro_export]
macro_rules! trace {
  ($channel:expr, $($arg:tt)+) => {
    if ($channel as u8) <= $crate::log::get_global_logging_threshold() {
      $crate::tracing::trace!($($arg)+);
    }
  };
}
