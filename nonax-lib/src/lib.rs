/*!

A streaming non-axiomatic reasoner.

The engine ingests typed logical assertions ("tasks" — beliefs, goals, and questions over a
compound-term algebra) and produces derived tasks by pairing primary premises with secondary
premises and firing matching inference rules. Reasoning is open-ended: there is no fixed query
and no terminal state; the reasoner runs as a cooperative pipeline under backpressure.

The crate is split the usual way:

  - [`api`] is the public surface: the term algebra and factory, the external contracts
    (`MemoryView`, `LanguageModel`, `EmbeddingLayer`), and the introspection event bus.
  - `core` holds the engine internals: truth values and stamps, the task model, the unifier,
    premise formation, the rule system, and the pipeline runner. The useful types are re-exported
    from the crate root.

*/

pub mod api;
mod core;

pub use crate::core::{
  bag::Bag,
  config::{CircuitBreakerConfig, LmOptions, ReasonerConfig, SamplingWeights},
  error::ReasonerError,
  pipeline::{ConsumerFeedback, PipelineMetrics, PipelineRunner},
  premise_source::{PremiseSource, SamplingDimension},
  rule::{
    circuit_breaker::{BreakerState, CircuitBreaker},
    lm_rule::{LmRule, LmRuleBody, LmRuleStats},
    nal_rules,
    pattern_rule::{PatternRule, TruthFunction},
    rule_net::RuleNet,
    Rule,
  },
  rule_processor::{PremisePair, RuleProcessor},
  stamp::{Stamp, StampPtr, StampSource},
  strategy::{
    analogical::AnalogicalStrategy,
    decomposition::DecompositionStrategy,
    prolog::PrologStrategy,
    semantic::SemanticStrategy,
    task_match::TaskMatchStrategy,
    Candidate,
    CandidateKind,
    DecompositionKind,
    FormationStrategy,
    PremiseFormation,
    StrategyContext,
  },
  substitution::Substitution,
  task::{Budget, Punctuation, Task},
  truth::{self, Truth},
  unifier,
};
