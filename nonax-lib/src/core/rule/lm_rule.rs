/*!

Asynchronous language-model rules.

An LM rule wraps user-provided callbacks around a model call: `condition` gates applicability,
`prompt` renders the premise pair into text, `process` normalizes the raw response, and
`generate` turns the normalized response into derived tasks. The harness awaits every callback
uniformly, so implementations may be as synchronous or as asynchronous as they like.

The model contract exposes up to three entry points; the harness probes `generate_text`,
`process`, and `query` in that order and uses the first that answers. A model with none of them
is a permanent failure that trips the rule's circuit breaker. Transient call failures count
toward the breaker threshold; while the breaker is open, `apply` returns empty without touching
the model, observable only through the rule's statistics.

*/

use std::{
  sync::{Arc, Mutex},
  time::Instant,
};

use async_trait::async_trait;
use nonax_abs::{debug, warning, IString};

use crate::{
  api::{
    events::{timestamp_millis, Event, EventBus},
    language_model::LanguageModel,
  },
  core::{
    config::{CircuitBreakerConfig, LmOptions},
    error::ReasonerError,
    rule::circuit_breaker::CircuitBreaker,
    task::Task,
  },
};

/// Rough character-per-token ratio used for the token statistic.
const CHARS_PER_TOKEN: u64 = 4;

/// The user-provided body of an LM rule. Defaults make `condition` always pass and `process`
/// the identity, so the minimal rule implements `prompt` and `generate` only.
#[async_trait]
pub trait LmRuleBody: Send + Sync {
  async fn condition(&self, _primary: &Task, _secondary: Option<&Task>) -> bool {
    true
  }

  /// Renders the premise pair into the model prompt. Always a string.
  async fn prompt(&self, primary: &Task, secondary: Option<&Task>)
    -> Result<String, ReasonerError>;

  /// Normalizes the raw model response before generation.
  async fn process(&self, raw: &str, _primary: &Task) -> Result<String, ReasonerError> {
    Ok(raw.to_string())
  }

  /// Turns the processed response into derived tasks.
  async fn generate(
    &self,
    processed: &str,
    primary: &Task,
    secondary: Option<&Task>,
  ) -> Result<Vec<Task>, ReasonerError>;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct LmRuleStats {
  pub calls:            u64,
  pub refusals:         u64,
  pub tokens:           u64,
  pub total_latency_ms: u64,
  pub successes:        u64,
}

impl LmRuleStats {
  pub fn average_latency_ms(&self) -> f64 {
    if self.calls == 0 {
      0.0
    } else {
      self.total_latency_ms as f64 / self.calls as f64
    }
  }

  pub fn success_rate(&self) -> f64 {
    if self.calls == 0 {
      0.0
    } else {
      self.successes as f64 / self.calls as f64
    }
  }
}

pub struct LmRule {
  id:             IString,
  body:           Arc<dyn LmRuleBody>,
  options:        LmOptions,
  single_premise: bool,
  breaker:        CircuitBreaker,
  stats:          Mutex<LmRuleStats>,
  events:         EventBus,
}

impl LmRule {
  pub fn new(
    id: &str,
    body: Arc<dyn LmRuleBody>,
    options: LmOptions,
    single_premise: bool,
    breaker_config: CircuitBreakerConfig,
    events: EventBus,
  ) -> LmRule {
    LmRule {
      id: IString::from(id),
      body,
      options,
      single_premise,
      breaker: CircuitBreaker::new(breaker_config),
      stats: Mutex::new(LmRuleStats::default()),
      events,
    }
  }

  #[inline(always)]
  pub fn id(&self) -> IString {
    self.id
  }

  #[inline(always)]
  pub fn is_single_premise(&self) -> bool {
    self.single_premise
  }

  pub fn breaker(&self) -> &CircuitBreaker {
    &self.breaker
  }

  pub fn stats(&self) -> LmRuleStats {
    *self.stats.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// The applicability gate. Checked before dispatch so inapplicable pairs never cost a task.
  pub async fn applies(&self, primary: &Task, secondary: Option<&Task>) -> bool {
    if self.single_premise && secondary.is_some() {
      return false;
    }
    if !self.single_premise && secondary.is_none() {
      return false;
    }
    self.body.condition(primary, secondary).await
  }

  /// Runs the rule end to end. Failures are contained: the result is simply empty.
  pub async fn apply(
    &self,
    model: &Arc<dyn LanguageModel>,
    primary: &Task,
    secondary: Option<&Task>,
  ) -> Vec<Task> {
    if !self.breaker.allow() {
      self.stats.lock().unwrap_or_else(|e| e.into_inner()).refusals += 1;
      return Vec::new();
    }

    let prompt = match self.body.prompt(primary, secondary).await {
      Ok(prompt) => prompt,
      Err(error) => {
        debug!(1, "lm rule `{}` prompt failed: {error}", self.id);
        return Vec::new();
      }
    };

    self.events.emit(Event::LmPrompt {
      rule_id:   self.id,
      prompt:    prompt.clone(),
      timestamp: timestamp_millis(),
    });

    let started = Instant::now();
    let outcome = self.call_model(model, &prompt).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    {
      let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
      stats.calls += 1;
      stats.total_latency_ms += duration_ms;
    }

    let response = match outcome {
      Ok(response) => {
        self.breaker.record_success();
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        stats.successes += 1;
        stats.tokens += (prompt.len() as u64 + response.len() as u64) / CHARS_PER_TOKEN;
        drop(stats);

        self.events.emit(Event::LmResponse {
          rule_id: self.id,
          prompt,
          response: response.clone(),
          duration_ms,
          timestamp: timestamp_millis(),
        });
        response
      }
      Err(error) => {
        match error {
          // No compatible entry point is permanent: trip the breaker outright.
          ReasonerError::LmUnavailable => {
            warning!(1, "lm rule `{}`: {error}", self.id);
            self.breaker.trip();
          }
          _ => {
            debug!(1, "lm rule `{}` call failed: {error}", self.id);
            self.breaker.record_failure();
          }
        }
        self.events.emit(Event::LmFailure {
          rule_id: self.id,
          error: error.to_string(),
          duration_ms,
          timestamp: timestamp_millis(),
        });
        return Vec::new();
      }
    };

    let processed = match self.body.process(&response, primary).await {
      Ok(processed) => processed,
      Err(error) => {
        debug!(1, "lm rule `{}` process failed: {error}", self.id);
        return Vec::new();
      }
    };

    match self.body.generate(&processed, primary, secondary).await {
      Ok(tasks) => tasks,
      Err(error) => {
        debug!(1, "lm rule `{}` generate failed: {error}", self.id);
        Vec::new()
      }
    }
  }

  /// Probes the model's entry points in the contract order.
  async fn call_model(
    &self,
    model: &Arc<dyn LanguageModel>,
    prompt: &str,
  ) -> Result<String, ReasonerError> {
    match model.generate_text(prompt, &self.options).await {
      Err(ReasonerError::LmUnavailable) => {}
      other => return other,
    }
    match model.process(prompt, &self.options).await {
      Err(ReasonerError::LmUnavailable) => {}
      other => return other,
    }
    model.query(prompt, &self.options).await
  }
}
