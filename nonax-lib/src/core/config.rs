/*!

Engine configuration.

A plain struct of recognized options with sensible defaults; there is no file format or loader in
the core. Every knob named here is honored by exactly one component, noted per field.

*/

/// Weighted mix of the premise-sampling dimensions. Weights are normalized to sum to 1 when the
/// source consumes them, so callers may set raw proportions.
#[derive(Copy, Clone, Debug)]
pub struct SamplingWeights {
  pub priority:    f32,
  pub recency:     f32,
  pub punctuation: f32,
  pub novelty:     f32,
}

impl Default for SamplingWeights {
  fn default() -> Self {
    SamplingWeights {
      priority:    0.4,
      recency:     0.2,
      punctuation: 0.2,
      novelty:     0.2,
    }
  }
}

impl SamplingWeights {
  pub fn normalized(&self) -> SamplingWeights {
    let sum = self.priority + self.recency + self.punctuation + self.novelty;
    if sum <= f32::EPSILON {
      return SamplingWeights::default();
    }
    SamplingWeights {
      priority:    self.priority / sum,
      recency:     self.recency / sum,
      punctuation: self.punctuation / sum,
      novelty:     self.novelty / sum,
    }
  }
}

/// Gating for one LM rule's circuit breaker.
#[derive(Copy, Clone, Debug)]
pub struct CircuitBreakerConfig {
  /// Consecutive failures that open the breaker.
  pub failure_threshold: u32,
  /// How long the breaker stays open before a half-open probe is allowed, in milliseconds.
  pub reset_timeout_ms:  u64,
}

impl Default for CircuitBreakerConfig {
  fn default() -> Self {
    CircuitBreakerConfig {
      failure_threshold: 5,
      reset_timeout_ms:  60_000,
    }
  }
}

/// Options forwarded verbatim to the language model on each call.
#[derive(Copy, Clone, Debug)]
pub struct LmOptions {
  pub temperature: f32,
  pub max_tokens:  u32,
}

impl Default for LmOptions {
  fn default() -> Self {
    LmOptions {
      temperature: 0.7,
      max_tokens:  512,
    }
  }
}

#[derive(Clone, Debug)]
pub struct ReasonerConfig {
  /// Derivations whose stamp depth exceeds this are silently dropped. (RuleNet, RuleProcessor)
  pub max_derivation_depth: u32,
  /// Cap on secondary premises formed per primary. (PremiseFormation)
  pub max_secondary_premises: usize,
  /// Capacity of the per-primary candidate bag. (PremiseFormation)
  pub candidate_bag_size: usize,
  /// Post-derivation sleep in milliseconds; zero disables throttling. (PipelineRunner)
  pub cpu_throttle_interval_ms: u64,
  /// Async-results queue length above which the processor sleeps. (RuleProcessor)
  pub backpressure_threshold: usize,
  /// Sleep per backpressure event, in milliseconds. (RuleProcessor)
  pub backpressure_interval_ms: u64,
  /// Shutdown-drain passes after the pair stream ends. (RuleProcessor)
  pub max_checks: u32,
  /// Sleep between shutdown-drain passes, in milliseconds. (RuleProcessor)
  pub async_wait_interval_ms: u64,
  /// Overall processing budget in milliseconds; zero means unbounded. (RuleProcessor)
  pub timeout_ms: u64,
  /// Capacity of the term-interning LRU. (TermFactory)
  pub max_cache_size: usize,
  /// Capacity of the async-results queue. (RuleProcessor)
  pub async_queue_size: usize,
  /// Default circuit-breaker gating for LM rules that don't carry their own.
  pub circuit_breaker: CircuitBreakerConfig,
  /// Premise-sampling mix. (PremiseSource)
  pub weights: SamplingWeights,
  /// Similar-concept fan-out for the semantic strategy.
  pub semantic_k: usize,
  /// Similarity threshold for the semantic strategy.
  pub semantic_threshold: f32,
  /// Backward-chaining solution cap for the Prolog strategy.
  pub max_solutions: usize,
  /// Backward-chaining depth bound for the Prolog strategy.
  pub prolog_max_depth: u32,
}

impl Default for ReasonerConfig {
  fn default() -> Self {
    ReasonerConfig {
      max_derivation_depth:     10,
      max_secondary_premises:   5,
      candidate_bag_size:       50,
      cpu_throttle_interval_ms: 0,
      backpressure_threshold:   50,
      backpressure_interval_ms: 10,
      max_checks:               10,
      async_wait_interval_ms:   50,
      timeout_ms:               0,
      max_cache_size:           5000,
      async_queue_size:         100,
      circuit_breaker:          CircuitBreakerConfig::default(),
      weights:                  SamplingWeights::default(),
      semantic_k:               8,
      semantic_threshold:       0.6,
      max_solutions:            8,
      prolog_max_depth:         6,
    }
  }
}
