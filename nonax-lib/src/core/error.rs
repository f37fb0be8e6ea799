/*!

The error taxonomy of the engine.

Most of these never cross a stream boundary: strategy faults, rule faults, and per-candidate
faults are recovered where they occur and logged. Only `StreamProcessing` is meant to surface to
the consumer of the derivation stream.

*/

use nonax_abs::IString;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ReasonerError {
  /// Constructing a task (or a term inside one) that violates the model invariants.
  #[error("invalid task: {0}")]
  InvalidTask(String),

  /// A synchronous rule body failed. Logged with the rule id; the rule contributes zero
  /// derivations for the offending pair.
  #[error("rule `{rule_id}` failed: {message}")]
  RuleExecution { rule_id: IString, message: String },

  /// A fault reading from memory. The offending primary is skipped; the stream continues.
  #[error("premise source fault: {0}")]
  PremiseSource(String),

  /// Irrecoverable fault in the pipeline driver; propagated to the output-stream consumer.
  #[error("stream processing fault: {0}")]
  StreamProcessing(String),

  /// The LM harness found no compatible entry point on the model. The owning rule treats this
  /// as a permanent failure and trips its circuit breaker.
  #[error("language model exposes no compatible entry point")]
  LmUnavailable,

  /// A language-model call failed.
  #[error("language model call failed: {0}")]
  LmCall(String),

  /// The rule's circuit breaker is open; `apply` returns empty without calling the model.
  #[error("circuit breaker open")]
  CircuitOpen,
}
