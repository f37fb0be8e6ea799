/*!

A circuit breaker guarding one LM rule's model calls.

Closed is the normal state. Consecutive failures up to the threshold trip the breaker open;
while open, calls are refused without touching the model. After the reset timeout one probe is
allowed through (half-open): success closes the breaker, failure re-opens it and restarts the
clock. State is per rule and lives on the single pipeline thread, so a plain mutex suffices.

*/

use std::{
  sync::Mutex,
  time::{Duration, Instant},
};

use nonax_abs::debug;

use crate::core::config::CircuitBreakerConfig;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BreakerState {
  Closed,
  Open,
  HalfOpen,
}

struct BreakerInner {
  state:                BreakerState,
  consecutive_failures: u32,
  opened_at:            Option<Instant>,
}

pub struct CircuitBreaker {
  config: CircuitBreakerConfig,
  inner:  Mutex<BreakerInner>,
}

impl CircuitBreaker {
  pub fn new(config: CircuitBreakerConfig) -> CircuitBreaker {
    CircuitBreaker {
      config,
      inner: Mutex::new(BreakerInner {
        state: BreakerState::Closed,
        consecutive_failures: 0,
        opened_at: None,
      }),
    }
  }

  pub fn state(&self) -> BreakerState {
    self.inner.lock().unwrap_or_else(|e| e.into_inner()).state
  }

  pub fn consecutive_failures(&self) -> u32 {
    self.inner.lock().unwrap_or_else(|e| e.into_inner()).consecutive_failures
  }

  /// Whether a call may proceed right now. Transitions open → half-open when the reset
  /// timeout has elapsed.
  pub fn allow(&self) -> bool {
    let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
    match inner.state {
      BreakerState::Closed | BreakerState::HalfOpen => true,
      BreakerState::Open => {
        let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or(Duration::ZERO);
        if elapsed >= Duration::from_millis(self.config.reset_timeout_ms) {
          inner.state = BreakerState::HalfOpen;
          debug!(2, "circuit breaker half-open after {:?}", elapsed);
          true
        } else {
          false
        }
      }
    }
  }

  pub fn record_success(&self) {
    let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
    inner.state = BreakerState::Closed;
    inner.consecutive_failures = 0;
    inner.opened_at = None;
  }

  /// Opens the breaker immediately, bypassing the failure count. Used for permanent faults
  /// such as a model with no compatible entry point.
  pub fn trip(&self) {
    let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
    inner.consecutive_failures = inner.consecutive_failures.max(self.config.failure_threshold);
    inner.state = BreakerState::Open;
    inner.opened_at = Some(Instant::now());
  }

  pub fn record_failure(&self) {
    let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
    inner.consecutive_failures += 1;
    // A half-open probe failing re-opens immediately.
    if inner.state == BreakerState::HalfOpen
      || inner.consecutive_failures >= self.config.failure_threshold
    {
      inner.state = BreakerState::Open;
      inner.opened_at = Some(Instant::now());
    }
  }
}
