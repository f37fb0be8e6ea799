/*!

The premise source: a stream of primary premises sampled from memory.

Each draw scores every visible task along four dimensions — budget priority, stamp recency, a
rotating punctuation preference, and novelty (how rarely the term has been served) — mixes the
scores under the configured weights, and roulette-selects one task. The mix can be nudged online
through `record_method_effectiveness`, an EMA step toward dimensions that have been paying off.

The stream never ends on its own: when memory is empty it idles briefly and retries, and it
terminates promptly when the cancellation token fires. A concept whose task read faults is
logged and skipped; the stream continues.

*/

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use async_stream::stream;
use futures::Stream;
use nonax_abs::{debug, warning, IString};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::{
  api::memory::MemoryView,
  core::{config::SamplingWeights, task::Task},
};

/// How long to idle when memory has nothing to offer, in milliseconds.
const EMPTY_MEMORY_IDLE_MS: u64 = 5;

/// Relative share of judgments, goals, and questions in the punctuation rotation.
const PUNCTUATION_MIX: [f32; 3] = [0.6, 0.2, 0.2];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SamplingDimension {
  Priority,
  Recency,
  Punctuation,
  Novelty,
}

struct SourceState {
  weights:      SamplingWeights,
  /// Serving counts per canonical term name, for the novelty bias.
  usage:        HashMap<IString, u32>,
  /// How many tasks of each punctuation class have been served.
  served:       [u64; 3],
  total_served: u64,
  rng:          StdRng,
}

pub struct PremiseSource {
  memory: Arc<dyn MemoryView>,
  state:  Mutex<SourceState>,
}

impl PremiseSource {
  pub fn new(memory: Arc<dyn MemoryView>, weights: SamplingWeights) -> PremiseSource {
    Self::with_rng(memory, weights, StdRng::from_entropy())
  }

  /// Seeded variant for reproducible runs.
  pub fn with_seed(memory: Arc<dyn MemoryView>, weights: SamplingWeights, seed: u64) -> PremiseSource {
    Self::with_rng(memory, weights, StdRng::seed_from_u64(seed))
  }

  fn with_rng(memory: Arc<dyn MemoryView>, weights: SamplingWeights, rng: StdRng) -> PremiseSource {
    PremiseSource {
      memory,
      state: Mutex::new(SourceState {
        weights,
        usage: HashMap::new(),
        served: [0; 3],
        total_served: 0,
        rng,
      }),
    }
  }

  /// Nudges the weight of one sampling dimension toward an observed effectiveness score in
  /// `[0, 1]`. The mix is re-normalized when consumed, so only the relative shift matters.
  pub fn record_method_effectiveness(&self, dimension: SamplingDimension, score: f32) {
    let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
    let score = score.clamp(0.0, 1.0);
    let weight = match dimension {
      SamplingDimension::Priority => &mut state.weights.priority,
      SamplingDimension::Recency => &mut state.weights.recency,
      SamplingDimension::Punctuation => &mut state.weights.punctuation,
      SamplingDimension::Novelty => &mut state.weights.novelty,
    };
    *weight = 0.9 * *weight + 0.1 * score;
  }

  pub fn weights(&self) -> SamplingWeights {
    self.state.lock().unwrap_or_else(|e| e.into_inner()).weights
  }

  /// The primary-premise stream. Runs until `signal` is cancelled.
  pub fn stream(self: Arc<Self>, signal: CancellationToken) -> impl Stream<Item = Task> {
    stream! {
      loop {
        if signal.is_cancelled() {
          break;
        }
        match self.sample_one() {
          Some(task) => {
            yield task;
            // Stay cooperative between draws.
            tokio::task::yield_now().await;
          }
          None => {
            tokio::select! {
              _ = signal.cancelled() => break,
              _ = tokio::time::sleep(std::time::Duration::from_millis(EMPTY_MEMORY_IDLE_MS)) => {}
            }
          }
        }
      }
      debug!(2, "premise source stream terminated");
    }
  }

  /// One weighted draw over every task currently visible in memory.
  pub fn sample_one(&self) -> Option<Task> {
    let mut candidates: Vec<Task> = Vec::new();
    for concept in self.memory.concepts() {
      match concept.try_tasks(None) {
        Ok(tasks) => candidates.extend(tasks),
        Err(error) => {
          warning!(1, "skipping concept `{}`: {error}", concept.term());
        }
      }
    }
    candidates.extend(self.memory.focus_tasks(usize::MAX));

    if candidates.is_empty() {
      return None;
    }

    let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
    let weights = state.weights.normalized();

    let (min_time, max_time) = candidates.iter().fold((u64::MAX, 0u64), |(lo, hi), t| {
      let ct = t.stamp().creation_time();
      (lo.min(ct), hi.max(ct))
    });
    let time_span = (max_time - min_time).max(1) as f32;

    let favored = favored_punctuation(&state.served, state.total_served);

    let scores: Vec<f32> = candidates
      .iter()
      .map(|task| {
        let priority = task.budget().priority;
        let recency = (task.stamp().creation_time() - min_time) as f32 / time_span;
        let punctuation = if punctuation_index(task) == favored { 1.0 } else { 0.0 };
        let uses = state.usage.get(&task.term().name()).copied().unwrap_or(0);
        let novelty = 1.0 / (1.0 + uses as f32);

        weights.priority * priority
          + weights.recency * recency
          + weights.punctuation * punctuation
          + weights.novelty * novelty
      })
      .collect();

    let total: f32 = scores.iter().sum();
    let chosen = if total <= f32::EPSILON {
      state.rng.gen_range(0..candidates.len())
    } else {
      let mut threshold = state.rng.gen_range(0.0..total);
      let mut chosen = candidates.len() - 1;
      for (i, score) in scores.iter().enumerate() {
        threshold -= score;
        if threshold <= 0.0 {
          chosen = i;
          break;
        }
      }
      chosen
    };

    let task = candidates.swap_remove(chosen);
    *state.usage.entry(task.term().name()).or_insert(0) += 1;
    state.served[punctuation_index(&task)] += 1;
    state.total_served += 1;

    Some(task)
  }
}

fn punctuation_index(task: &Task) -> usize {
  match task.punctuation() {
    crate::core::task::Punctuation::Judgment => 0,
    crate::core::task::Punctuation::Goal     => 1,
    crate::core::task::Punctuation::Question => 2,
  }
}

/// Weighted round-robin: favor the punctuation class furthest below its configured share.
fn favored_punctuation(served: &[u64; 3], total: u64) -> usize {
  let mut favored = 0;
  let mut best_deficit = f32::MIN;
  for (i, mix) in PUNCTUATION_MIX.iter().enumerate() {
    let share = served[i] as f32 / (total + 1) as f32;
    let deficit = mix - share;
    if deficit > best_deficit {
      best_deficit = deficit;
      favored = i;
    }
  }
  favored
}
