/*!

The rule system.

Rules come in exactly two shapes, and the distinction is a closed discriminant rather than
anything structural: synchronous *pattern rules* (declarative premise/conclusion templates
executed inline through the discrimination net) and asynchronous *LM rules* (user-provided
callbacks around a language-model call, dispatched as detached tasks and gated by a circuit
breaker).

*/

pub mod circuit_breaker;
pub mod lm_rule;
pub mod nal_rules;
pub mod pattern_rule;
pub mod rule_net;

use std::sync::Arc;

use nonax_abs::IString;

use self::{lm_rule::LmRule, pattern_rule::PatternRule};

#[derive(Clone)]
pub enum Rule {
  /// Synchronous declarative rule; never suspends.
  Pattern(Arc<PatternRule>),
  /// Asynchronous language-model rule; applied off the pair loop.
  Lm(Arc<LmRule>),
}

impl Rule {
  pub fn id(&self) -> IString {
    match self {
      Rule::Pattern(rule) => rule.id(),
      Rule::Lm(rule) => rule.id(),
    }
  }

  pub fn is_single_premise(&self) -> bool {
    match self {
      Rule::Pattern(rule) => rule.is_single_premise(),
      Rule::Lm(rule) => rule.is_single_premise(),
    }
  }
}
