/*!

The pipeline runner: owns the abort signal and the reasoner's output stream.

Composition is `premise source → premise formation → rule processor`; the runner adds CPU
throttling after every yielded derivation, an adaptive-rate checkpoint every fifty derivations
that nudges the throttle according to the observed backpressure level, metrics, and a consumer
feedback channel that trades throughput for backlog relief.

`stop()` cancels the token shared by every stage; the premise source quits pulling, in-flight
synchronous rules finish naturally, and pending LM results are drained best-effort by the
processor's shutdown passes. Stopping twice is harmless.

*/

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  },
  time::{Duration, Instant},
};

use async_stream::stream;
use futures::{Stream, StreamExt};
use nonax_abs::debug;
use tokio_util::sync::CancellationToken;

use crate::core::{
  config::ReasonerConfig,
  premise_source::PremiseSource,
  rule_processor::RuleProcessor,
  strategy::PremiseFormation,
  task::Task,
};

/// Derivations between adaptive-rate checkpoints.
const ADAPTIVE_WINDOW: u64 = 50;

/// Smoothing for the adaptive throttle: `new = 0.9·old + 0.1·candidate`.
const THROTTLE_EMA: f64 = 0.9;

#[derive(Copy, Clone, Debug, Default)]
pub struct ConsumerFeedback {
  /// Derivations per second the consumer is keeping up with.
  pub processing_speed: Option<f64>,
  /// How many derivations the consumer has queued unprocessed.
  pub backlog_size: Option<usize>,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct PipelineMetrics {
  pub total_derivations:     u64,
  pub total_processing_ms:   f64,
  pub average_processing_ms: f64,
  /// Derivations per second since the run started.
  pub throughput:            f64,
  /// Async-mailbox fill level in `[0, 1]`.
  pub backpressure_level:    f32,
  /// Memory-usage proxy: live entries in the term-interning cache.
  pub term_cache_entries:    usize,
  /// EMA of the consumer-reported processing speed.
  pub consumer_speed:        f64,
  /// The live throttle value, for observability.
  pub cpu_throttle_ms:       f64,
}

pub struct PipelineRunner {
  source:      Arc<PremiseSource>,
  formation:   Arc<PremiseFormation>,
  processor:   Arc<RuleProcessor>,
  config:      ReasonerConfig,
  token:       CancellationToken,
  throttle_ms: Arc<Mutex<f64>>,
  metrics:     Arc<Mutex<PipelineMetrics>>,
  queue_depth: Arc<AtomicUsize>,
}

impl PipelineRunner {
  pub fn new(
    source: Arc<PremiseSource>,
    formation: Arc<PremiseFormation>,
    processor: Arc<RuleProcessor>,
    config: ReasonerConfig,
  ) -> PipelineRunner {
    let queue_depth = processor.queue_depth();
    let throttle_ms = Arc::new(Mutex::new(config.cpu_throttle_interval_ms as f64));
    PipelineRunner {
      source,
      formation,
      processor,
      config,
      token: CancellationToken::new(),
      throttle_ms,
      metrics: Arc::new(Mutex::new(PipelineMetrics::default())),
      queue_depth,
    }
  }

  /// Idempotent shutdown: cancels every stage's signal.
  pub fn stop(&self) {
    self.token.cancel();
  }

  pub fn cancellation_token(&self) -> CancellationToken {
    self.token.clone()
  }

  pub fn metrics(&self) -> PipelineMetrics {
    let mut snapshot = *self.metrics.lock().unwrap_or_else(|e| e.into_inner());
    snapshot.backpressure_level = self.backpressure_level();
    snapshot.term_cache_entries = self.processor.factory().cache_len();
    snapshot.cpu_throttle_ms = *self.throttle_ms.lock().unwrap_or_else(|e| e.into_inner());
    snapshot
  }

  /// The consumer feedback channel. A backlog past the threshold slows the pipeline down
  /// (×1.5, or +5 ms from a standing start); a healthy backlog speeds it back up (×0.9,
  /// stepping down to zero).
  pub fn receive_consumer_feedback(&self, feedback: ConsumerFeedback) {
    let mut throttle = self.throttle_ms.lock().unwrap_or_else(|e| e.into_inner());

    if let Some(backlog) = feedback.backlog_size {
      if backlog > self.config.backpressure_threshold {
        *throttle = if *throttle <= f64::EPSILON { 5.0 } else { *throttle * 1.5 };
      } else {
        *throttle = if *throttle <= 1.0 { 0.0 } else { (*throttle * 0.9).max(*throttle - 1.0) };
      }
    }

    if let Some(speed) = feedback.processing_speed {
      let mut metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
      metrics.consumer_speed = if metrics.consumer_speed <= f64::EPSILON {
        speed
      } else {
        0.9 * metrics.consumer_speed + 0.1 * speed
      };
    }
  }

  fn backpressure_level(&self) -> f32 {
    let depth = self.queue_depth.load(Ordering::Relaxed) as f32;
    (depth / self.config.async_queue_size.max(1) as f32).clamp(0.0, 1.0)
  }

  /// The reasoner's output stream. Composes the stages under the runner's cancellation token.
  pub fn run(&self) -> impl Stream<Item = Task> {
    let token = self.token.clone();
    let formation = self.formation.clone();
    let throttle_ms = self.throttle_ms.clone();
    let metrics = self.metrics.clone();
    let queue_depth = self.queue_depth.clone();
    let async_queue_size = self.config.async_queue_size.max(1);

    let primaries = self.source.clone().stream(token.clone());
    let pairs = primaries.flat_map(move |primary| {
      futures::stream::iter(formation.pairs(primary))
    });
    let derivations = self.processor.clone().process(pairs, token.clone());

    stream! {
      let started = Instant::now();
      let mut last_yield = Instant::now();

      futures::pin_mut!(derivations);

      while let Some(derived) = derivations.next().await {
        let processing_ms = last_yield.elapsed().as_secs_f64() * 1000.0;
        last_yield = Instant::now();

        let total = {
          let mut metrics = metrics.lock().unwrap_or_else(|e| e.into_inner());
          metrics.total_derivations += 1;
          metrics.total_processing_ms += processing_ms;
          metrics.average_processing_ms =
            metrics.total_processing_ms / metrics.total_derivations as f64;
          let elapsed = started.elapsed().as_secs_f64();
          if elapsed > 0.0 {
            metrics.throughput = metrics.total_derivations as f64 / elapsed;
          }
          metrics.total_derivations
        };

        yield derived;

        if token.is_cancelled() {
          break;
        }

        // CPU throttle.
        let throttle = *throttle_ms.lock().unwrap_or_else(|e| e.into_inner());
        if throttle > 0.0 {
          tokio::time::sleep(Duration::from_micros((throttle * 1000.0) as u64)).await;
        }

        // Adaptive rate checkpoint.
        if total % ADAPTIVE_WINDOW == 0 {
          let level = (queue_depth.load(Ordering::Relaxed) as f32
            / async_queue_size as f32)
            .clamp(0.0, 1.0);
          let factor = adaptive_factor(level);
          let mut throttle = throttle_ms.lock().unwrap_or_else(|e| e.into_inner());
          let current = *throttle;
          // A throttle of zero can only grow from a nonzero candidate.
          let candidate = if current <= f64::EPSILON && factor > 1.0 {
            1.0
          } else {
            current * factor as f64
          };
          *throttle = THROTTLE_EMA * current + (1.0 - THROTTLE_EMA) * candidate;
          debug!(3, "adaptive rate: level {level:.2}, throttle {:.2}ms", *throttle);
        }
      }
    }
  }
}

/// The multiplicative adjustment for one adaptive checkpoint, by backpressure level.
fn adaptive_factor(level: f32) -> f32 {
  if level > 0.75 {
    1.2
  } else if level > 0.5 {
    1.0
  } else if level > 0.25 {
    0.8
  } else {
    0.5
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

  use async_trait::async_trait;

  use super::*;
  use crate::{
    api::{
      events::EventBus,
      language_model::LanguageModel,
      memory::SimpleMemory,
      operator::Operator,
      term::TermPtr,
      TermFactory,
    },
    core::{
      config::{CircuitBreakerConfig, LmOptions, SamplingWeights},
      error::ReasonerError,
      rule::{
        lm_rule::{LmRule, LmRuleBody},
        nal_rules, Rule,
      },
      stamp::Stamp,
      strategy::{task_match::TaskMatchStrategy, FormationStrategy},
      truth::Truth,
    },
  };

  fn inh(f: &TermFactory, s: &str, p: &str) -> TermPtr {
    f.compound(Operator::Inheritance, vec![f.atom(s), f.atom(p)]).unwrap()
  }

  fn sim(f: &TermFactory, a: &str, b: &str) -> TermPtr {
    f.compound(Operator::Similarity, vec![f.atom(a), f.atom(b)]).unwrap()
  }

  struct Reasoner {
    runner: PipelineRunner,
  }

  fn reasoner(
    beliefs: Vec<(TermPtr, Truth)>,
    questions: Vec<TermPtr>,
    lm_rules: Vec<Arc<LmRule>>,
    model: Option<Arc<dyn LanguageModel>>,
    factory: Arc<TermFactory>,
  ) -> Reasoner {
    let memory = Arc::new(SimpleMemory::new());
    for (term, truth) in beliefs {
      memory.add_task(Task::belief(term, truth, Stamp::input()));
    }
    for term in questions {
      memory.add_task(Task::question(term, Stamp::input()));
    }

    let config = ReasonerConfig::default();
    let source = Arc::new(PremiseSource::with_seed(
      memory.clone(),
      SamplingWeights::default(),
      17,
    ));
    let mut rules = nal_rules::standard_rule_set(&factory);
    rules.extend(lm_rules.into_iter().map(Rule::Lm));
    let processor = Arc::new(RuleProcessor::new(
      rules,
      model,
      factory.clone(),
      config.clone(),
      EventBus::new(),
    ));
    let strategies: Vec<Arc<dyn FormationStrategy>> = vec![Arc::new(TaskMatchStrategy::new())];
    let formation = Arc::new(PremiseFormation::new(
      strategies,
      memory,
      factory.clone(),
      config.clone(),
      None,
      processor.has_single_premise_rules(),
    ));
    let runner = PipelineRunner::new(source, formation, processor, config);
    Reasoner { runner }
  }

  /// Drives the pipeline until `predicate` accepts a derivation or the timeout lapses.
  async fn find_derivation<F>(runner: &PipelineRunner, predicate: F) -> Option<Task>
  where
    F: Fn(&Task) -> bool,
  {
    let output = runner.run();
    futures::pin_mut!(output);
    let found = tokio::time::timeout(Duration::from_secs(10), async {
      while let Some(derived) = output.next().await {
        if predicate(&derived) {
          return Some(derived);
        }
      }
      None
    })
    .await
    .ok()
    .flatten();
    runner.stop();
    found
  }

  #[tokio::test]
  async fn syllogistic_deduction_end_to_end() {
    let f = TermFactory::new_default();
    let r = reasoner(
      vec![
        (inh(&f, "robin", "bird"), Truth::new(1.0, 0.9)),
        (inh(&f, "bird", "animal"), Truth::new(1.0, 0.9)),
      ],
      Vec::new(),
      Vec::new(),
      None,
      f.clone(),
    );

    let derived = find_derivation(&r.runner, |t| {
      t.term().name().as_str() == "(--> robin animal)"
    })
    .await
    .expect("deduction conclusion");

    let truth = derived.truth().unwrap();
    assert!(truth.f > 0.99);
    assert!(truth.c < 0.9);
    assert_eq!(derived.stamp().depth(), 1);
  }

  #[tokio::test]
  async fn analogy_end_to_end() {
    let f = TermFactory::new_default();
    let r = reasoner(
      vec![
        (sim(&f, "robin", "swan"), Truth::new(0.9, 0.9)),
        (inh(&f, "robin", "bird"), Truth::new(1.0, 0.9)),
      ],
      Vec::new(),
      Vec::new(),
      None,
      f.clone(),
    );

    assert!(find_derivation(&r.runner, |t| {
      t.term().name().as_str() == "(--> swan bird)"
    })
    .await
    .is_some());
  }

  #[tokio::test]
  async fn abduction_direction_end_to_end() {
    let f = TermFactory::new_default();
    let r = reasoner(
      vec![
        (inh(&f, "bird", "animal"), Truth::new(1.0, 0.9)),
        (inh(&f, "robin", "animal"), Truth::new(1.0, 0.9)),
      ],
      Vec::new(),
      Vec::new(),
      None,
      f.clone(),
    );

    let derived = find_derivation(&r.runner, |t| {
      t.term().name().as_str() == "(--> robin bird)"
    })
    .await
    .expect("abduction conclusion");
    assert!(derived.truth().unwrap().c < 0.9);
  }

  #[tokio::test]
  async fn question_answering_end_to_end() {
    let f = TermFactory::new_default();
    let r = reasoner(
      vec![
        (inh(&f, "robin", "bird"), Truth::new(1.0, 0.9)),
        (inh(&f, "bird", "animal"), Truth::new(1.0, 0.9)),
      ],
      vec![f
        .compound(Operator::Inheritance, vec![f.atom("robin"), f.variable("x")])
        .unwrap()],
      Vec::new(),
      None,
      f.clone(),
    );

    // A belief matching the question's answer shows up in the derivation stream.
    let derived = find_derivation(&r.runner, |t| {
      t.is_judgment() && t.term().name().as_str() == "(--> robin animal)"
    })
    .await;
    assert!(derived.is_some());
  }

  struct AlwaysBody;

  #[async_trait]
  impl LmRuleBody for AlwaysBody {
    async fn prompt(&self, primary: &Task, _secondary: Option<&Task>)
      -> Result<String, ReasonerError>
    {
      Ok(primary.term().to_string())
    }

    async fn generate(
      &self,
      _processed: &str,
      primary: &Task,
      _secondary: Option<&Task>,
    ) -> Result<Vec<Task>, ReasonerError> {
      Ok(vec![primary.clone()])
    }
  }

  struct ThrowingModel {
    calls: Arc<AtomicUsize>,
  }

  #[async_trait]
  impl LanguageModel for ThrowingModel {
    async fn generate_text(
      &self,
      _prompt: &str,
      _options: &LmOptions,
    ) -> Result<String, ReasonerError> {
      self.calls.fetch_add(1, AtomicOrdering::SeqCst);
      Err(ReasonerError::LmCall("always down".into()))
    }
  }

  #[tokio::test]
  async fn circuit_breaker_gates_the_model_end_to_end() {
    let f = TermFactory::new_default();
    let calls = Arc::new(AtomicUsize::new(0));
    let lm = Arc::new(LmRule::new(
      "flaky",
      Arc::new(AlwaysBody),
      LmOptions::default(),
      false,
      CircuitBreakerConfig { failure_threshold: 5, reset_timeout_ms: 60_000 },
      EventBus::new(),
    ));
    let model: Arc<dyn LanguageModel> = Arc::new(ThrowingModel { calls: calls.clone() });

    let r = reasoner(
      vec![
        (inh(&f, "robin", "bird"), Truth::new(1.0, 0.9)),
        (inh(&f, "bird", "animal"), Truth::new(1.0, 0.9)),
      ],
      Vec::new(),
      vec![lm],
      Some(model),
      f.clone(),
    );

    // Drive enough derivations that well over six pairs flow through.
    let output = r.runner.run();
    futures::pin_mut!(output);
    let _ = tokio::time::timeout(Duration::from_secs(2), async {
      let mut seen = 0;
      while let Some(_) = output.next().await {
        seen += 1;
        if seen >= 40 && calls.load(AtomicOrdering::SeqCst) >= 5 {
          break;
        }
      }
    })
    .await;
    r.runner.stop();
    // Give in-flight detached calls a moment to settle.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Exactly the threshold number of calls reached the model; the open breaker blocked the rest.
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 5);
  }

  #[tokio::test]
  async fn stop_terminates_the_stream_promptly() {
    let f = TermFactory::new_default();
    let r = reasoner(
      vec![
        (inh(&f, "robin", "bird"), Truth::new(1.0, 0.9)),
        (inh(&f, "bird", "animal"), Truth::new(1.0, 0.9)),
      ],
      Vec::new(),
      Vec::new(),
      None,
      f.clone(),
    );

    let output = r.runner.run();
    futures::pin_mut!(output);
    assert!(output.next().await.is_some());

    r.runner.stop();
    r.runner.stop(); // idempotent

    let drained = tokio::time::timeout(Duration::from_secs(2), async {
      while output.next().await.is_some() {}
    })
    .await;
    assert!(drained.is_ok(), "stream failed to terminate after stop()");
  }

  #[tokio::test]
  async fn metrics_track_derivations() {
    let f = TermFactory::new_default();
    let r = reasoner(
      vec![
        (inh(&f, "robin", "bird"), Truth::new(1.0, 0.9)),
        (inh(&f, "bird", "animal"), Truth::new(1.0, 0.9)),
      ],
      Vec::new(),
      Vec::new(),
      None,
      f.clone(),
    );

    let output = r.runner.run();
    futures::pin_mut!(output);
    for _ in 0..5 {
      if output.next().await.is_none() {
        break;
      }
    }
    r.runner.stop();

    let metrics = r.runner.metrics();
    assert!(metrics.total_derivations >= 5);
    assert!(metrics.throughput > 0.0);
  }

  #[test]
  fn consumer_feedback_moves_the_throttle_both_ways() {
    let f = TermFactory::new_default();
    let r = reasoner(Vec::new(), Vec::new(), Vec::new(), None, f);

    // Large backlog: slow down from a standing start.
    r.runner.receive_consumer_feedback(ConsumerFeedback {
      processing_speed: None,
      backlog_size: Some(10_000),
    });
    let slowed = r.runner.metrics().cpu_throttle_ms;
    assert!((slowed - 5.0).abs() < 1e-9);

    // Again: multiplicative growth.
    r.runner.receive_consumer_feedback(ConsumerFeedback {
      processing_speed: None,
      backlog_size: Some(10_000),
    });
    assert!((r.runner.metrics().cpu_throttle_ms - 7.5).abs() < 1e-9);

    // Healthy backlog: ease off again.
    r.runner.receive_consumer_feedback(ConsumerFeedback {
      processing_speed: Some(100.0),
      backlog_size: Some(0),
    });
    assert!(r.runner.metrics().cpu_throttle_ms < 7.5);
    assert!((r.runner.metrics().consumer_speed - 100.0).abs() < 1e-9);
  }

  #[test]
  fn adaptive_factors_follow_the_backpressure_level() {
    assert_eq!(adaptive_factor(0.9), 1.2);
    assert_eq!(adaptive_factor(0.6), 1.0);
    assert_eq!(adaptive_factor(0.3), 0.8);
    assert_eq!(adaptive_factor(0.1), 0.5);
  }
}
