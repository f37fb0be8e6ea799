/*!

The rule processor: consumes the premise-pair stream and multiplexes rule execution.

Synchronous pattern rules run inline through the discrimination net, so their derivations come
out strictly in pair order. LM rules are dispatched as detached tasks whose results funnel into
a bounded mailbox; the processor drains the mailbox opportunistically between pairs and keeps
draining for a bounded number of passes after the pair stream ends. When the mailbox backs up
past the configured threshold the processor sleeps instead of pulling the next pair — that is
the backpressure the rest of the pipeline observes.

Async results that arrive while the mailbox is full are dropped with a debug log; the
backpressure sleeps bound how often that can happen.

*/

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  time::{Duration, Instant},
};

use async_stream::stream;
use futures::{Stream, StreamExt};
use nonax_abs::{debug, IString};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
  api::{
    events::{Event, EventBus},
    language_model::LanguageModel,
    term_factory::TermFactory,
  },
  core::{
    config::ReasonerConfig,
    rule::{lm_rule::LmRule, rule_net::RuleNet, Rule},
    stamp::StampSource,
    task::Task,
  },
};

/// One unit of work for the processor: a primary premise and an optional secondary.
#[derive(Clone, Debug)]
pub struct PremisePair {
  pub primary:   Task,
  pub secondary: Option<Task>,
}

/// A batch of async-rule results, tagged with the rule that produced them.
struct AsyncBatch {
  rule_id: IString,
  tasks:   Vec<Task>,
}

pub struct RuleProcessor {
  net:         RuleNet,
  lm_rules:    Vec<Arc<LmRule>>,
  model:       Option<Arc<dyn LanguageModel>>,
  factory:     Arc<TermFactory>,
  config:      ReasonerConfig,
  events:      EventBus,
  /// Live length of the async-results mailbox; shared with the pipeline for metrics.
  queue_depth: Arc<AtomicUsize>,
  single_premise_rules: bool,
}

impl RuleProcessor {
  pub fn new(
    rules: Vec<Rule>,
    model: Option<Arc<dyn LanguageModel>>,
    factory: Arc<TermFactory>,
    config: ReasonerConfig,
    events: EventBus,
  ) -> RuleProcessor {
    let single_premise_rules = rules.iter().any(Rule::is_single_premise);

    let mut pattern_rules = Vec::new();
    let mut lm_rules = Vec::new();
    for rule in rules {
      match rule {
        Rule::Pattern(rule) => pattern_rules.push(rule),
        Rule::Lm(rule) => lm_rules.push(rule),
      }
    }

    RuleProcessor {
      net: RuleNet::compile(&pattern_rules),
      lm_rules,
      model,
      factory,
      config,
      events,
      queue_depth: Arc::new(AtomicUsize::new(0)),
      single_premise_rules,
    }
  }

  /// The term factory every derivation goes through; shared for metrics.
  pub fn factory(&self) -> &Arc<TermFactory> {
    &self.factory
  }

  /// Whether any registered rule fires on a lone primary; premise formation consults this to
  /// decide whether candidate-less primaries are worth emitting.
  pub fn has_single_premise_rules(&self) -> bool {
    self.single_premise_rules
  }

  /// Shared gauge of the async mailbox length.
  pub fn queue_depth(&self) -> Arc<AtomicUsize> {
    self.queue_depth.clone()
  }

  /// The derivation stream for a pair stream. Terminates when the pairs end and the async
  /// drain completes, or on cancellation/timeout.
  pub fn process<S>(
    self: Arc<Self>,
    pairs: S,
    signal: CancellationToken,
  ) -> impl Stream<Item = Task>
  where
    S: Stream<Item = PremisePair>,
  {
    stream! {
      let (tx, mut rx) = mpsc::channel::<AsyncBatch>(self.config.async_queue_size);
      let outstanding = Arc::new(AtomicUsize::new(0));
      let started = Instant::now();
      let timeout = self.timeout();

      futures::pin_mut!(pairs);

      'pairs: while let Some(pair) = pairs.next().await {
        if signal.is_cancelled() || timed_out(started, timeout) {
          break;
        }

        // Backpressure: when the mailbox is backed up, sleep before this pair. The drain at
        // the bottom of the loop is what actually shrinks the mailbox, so this must stay a
        // bounded pause rather than a wait-until-empty.
        let queue_length = self.queue_depth.load(Ordering::Relaxed);
        if queue_length > self.config.backpressure_threshold {
          self.events.emit(Event::Backpressure {
            queue_length,
            level: queue_length as f32 / self.config.async_queue_size.max(1) as f32,
          });
          tokio::select! {
            _ = signal.cancelled() => break 'pairs,
            _ = tokio::time::sleep(Duration::from_millis(self.config.backpressure_interval_ms)) => {}
          }
          if timed_out(started, timeout) {
            break 'pairs;
          }
        }

        // Synchronous side: pattern rules inline, derivations in pair order.
        let derivations = self.net.execute(
          &pair.primary,
          pair.secondary.as_ref(),
          &self.factory,
          self.config.max_derivation_depth,
        );
        for derived in derivations {
          yield derived;
        }

        // Asynchronous side: detached dispatch per applicable LM rule.
        self.dispatch_lm_rules(&pair, &tx, &outstanding).await;

        // Opportunistic drain so primaries are never starved by a long mailbox.
        for task in self.drain_mailbox(&mut rx) {
          yield task;
        }
      }

      // The pair stream has ended; drain stragglers for a bounded number of passes.
      for _ in 0..self.config.max_checks {
        for task in self.drain_mailbox(&mut rx) {
          yield task;
        }
        if outstanding.load(Ordering::SeqCst) == 0 {
          break;
        }
        if signal.is_cancelled() || timed_out(started, timeout) {
          break;
        }
        tokio::time::sleep(Duration::from_millis(self.config.async_wait_interval_ms)).await;
      }
      for task in self.drain_mailbox(&mut rx) {
        yield task;
      }
    }
  }

  fn timeout(&self) -> Option<Duration> {
    if self.config.timeout_ms == 0 {
      None
    } else {
      Some(Duration::from_millis(self.config.timeout_ms))
    }
  }

  async fn dispatch_lm_rules(
    &self,
    pair: &PremisePair,
    tx: &mpsc::Sender<AsyncBatch>,
    outstanding: &Arc<AtomicUsize>,
  ) {
    let Some(model) = &self.model else { return };

    for rule in &self.lm_rules {
      let secondary = if rule.is_single_premise() {
        None
      } else {
        pair.secondary.clone()
      };
      if !rule.applies(&pair.primary, secondary.as_ref()).await {
        continue;
      }

      let rule = rule.clone();
      let model = model.clone();
      let primary = pair.primary.clone();
      let tx = tx.clone();
      let outstanding = outstanding.clone();
      let queue_depth = self.queue_depth.clone();

      outstanding.fetch_add(1, Ordering::SeqCst);
      tokio::spawn(async move {
        let tasks = rule.apply(&model, &primary, secondary.as_ref()).await;
        if !tasks.is_empty() {
          let batch = AsyncBatch { rule_id: rule.id(), tasks };
          // The gauge rises before the batch becomes visible to the receiver, so the
          // receiver's decrement can never underflow it.
          queue_depth.fetch_add(1, Ordering::Relaxed);
          if tx.try_send(batch).is_err() {
            queue_depth.fetch_sub(1, Ordering::Relaxed);
            debug!(1, "async mailbox full; dropping results of `{}`", rule.id());
          }
        }
        outstanding.fetch_sub(1, Ordering::SeqCst);
      });
    }
  }

  /// Pulls whatever is on the mailbox right now, enriching each task's stamp with the id of
  /// the rule that produced it.
  fn drain_mailbox(&self, rx: &mut mpsc::Receiver<AsyncBatch>) -> Vec<Task> {
    let mut drained = Vec::new();
    while let Ok(batch) = rx.try_recv() {
      self.queue_depth.fetch_sub(1, Ordering::Relaxed);
      for task in batch.tasks {
        if task.stamp().depth() > self.config.max_derivation_depth {
          continue;
        }
        let enriched = task
          .stamp()
          .retagged(StampSource::Derived(batch.rule_id));
        drained.push(task.with_stamp(enriched));
      }
    }
    drained
  }
}

fn timed_out(started: Instant, timeout: Option<Duration>) -> bool {
  timeout.is_some_and(|t| started.elapsed() >= t)
}
