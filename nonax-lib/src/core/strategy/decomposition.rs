/*!

Structural decomposition: a compound primary proposes its own components as secondary premises.

Only operators flagged `Decomposable` participate (statements, conjunctions, products,
extensional sets). Statement sides carry a higher role priority than inner components of the
variadic operators.

*/

use crate::core::{
  error::ReasonerError,
  strategy::{Candidate, CandidateKind, DecompositionKind, FormationStrategy, StrategyContext},
  task::Task,
};

pub struct DecompositionStrategy {
  enabled:            bool,
  base_priority:      f32,
  /// Role priority for statement subjects and predicates.
  statement_priority: f32,
  /// Role priority for components of variadic compounds.
  component_priority: f32,
}

impl Default for DecompositionStrategy {
  fn default() -> Self {
    DecompositionStrategy {
      enabled:            true,
      base_priority:      1.0,
      statement_priority: 0.85,
      component_priority: 0.7,
    }
  }
}

impl DecompositionStrategy {
  pub fn new() -> DecompositionStrategy {
    DecompositionStrategy::default()
  }

  pub fn with_priorities(base: f32, statement: f32, component: f32) -> DecompositionStrategy {
    DecompositionStrategy {
      enabled:            true,
      base_priority:      base,
      statement_priority: statement,
      component_priority: component,
    }
  }

  pub fn disabled() -> DecompositionStrategy {
    DecompositionStrategy { enabled: false, ..DecompositionStrategy::default() }
  }
}

impl FormationStrategy for DecompositionStrategy {
  fn name(&self) -> &'static str {
    "decomposition"
  }

  fn enabled(&self) -> bool {
    self.enabled
  }

  fn base_priority(&self) -> f32 {
    self.base_priority
  }

  fn candidates(
    &self,
    primary: &Task,
    _ctx: &StrategyContext,
  ) -> Result<Vec<Candidate>, ReasonerError> {
    let term = primary.term();
    let Some(op) = term.operator() else { return Ok(Vec::new()) };
    if !op.is_decomposable() {
      return Ok(Vec::new());
    }

    let statement = term.is_statement();
    let candidates = term
      .components()
      .iter()
      .enumerate()
      .filter(|(_, component)| !component.is_variable())
      .map(|(index, component)| {
        let (role, decomposition) = if statement {
          let kind = if index == 0 {
            DecompositionKind::Subject
          } else {
            DecompositionKind::Predicate
          };
          (self.statement_priority, kind)
        } else {
          (self.component_priority, DecompositionKind::Component)
        };

        let mut candidate = Candidate::from_term(
          component.clone(),
          role * self.base_priority,
          CandidateKind::Decomposed,
        );
        candidate.decomposition = Some(decomposition);
        candidate.operator = Some(op);
        candidate.component_index = Some(index as u32);
        candidate
      })
      .collect();

    Ok(candidates)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::{
    api::{memory::SimpleMemory, operator::Operator, MemoryView, TermFactory},
    core::{config::ReasonerConfig, stamp::Stamp, truth::Truth},
  };

  fn context<'a>(
    memory: &'a Arc<dyn MemoryView>,
    factory: &'a Arc<TermFactory>,
    config: &'a ReasonerConfig,
  ) -> StrategyContext<'a> {
    StrategyContext { memory, factory, config, embeddings: None }
  }

  #[test]
  fn statements_decompose_into_subject_and_predicate() {
    let f = TermFactory::new_default();
    let memory: Arc<dyn MemoryView> = Arc::new(SimpleMemory::new());
    let config = ReasonerConfig::default();

    let term = f
      .compound(Operator::Inheritance, vec![f.atom("robin"), f.atom("bird")])
      .unwrap();
    let primary = Task::belief(term, Truth::new(1.0, 0.9), Stamp::input());

    let strategy = DecompositionStrategy::new();
    let candidates = strategy.candidates(&primary, &context(&memory, &f, &config)).unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].decomposition, Some(DecompositionKind::Subject));
    assert_eq!(candidates[1].decomposition, Some(DecompositionKind::Predicate));
    assert_eq!(candidates[0].operator, Some(Operator::Inheritance));
    assert_eq!(candidates[1].component_index, Some(1));
    assert!((candidates[0].priority - 0.85).abs() < 1e-6);
  }

  #[test]
  fn conjunction_components_use_the_component_priority() {
    let f = TermFactory::new_default();
    let memory: Arc<dyn MemoryView> = Arc::new(SimpleMemory::new());
    let config = ReasonerConfig::default();

    let term = f
      .compound(
        Operator::Conjunction,
        vec![f.atom("wet"), f.atom("cold"), f.atom("dark")],
      )
      .unwrap();
    let primary = Task::belief(term, Truth::new(1.0, 0.9), Stamp::input());

    let candidates = DecompositionStrategy::new()
      .candidates(&primary, &context(&memory, &f, &config))
      .unwrap();
    assert_eq!(candidates.len(), 3);
    assert!(candidates.iter().all(|c| (c.priority - 0.7).abs() < 1e-6));
    assert!(candidates.iter().all(|c| c.decomposition == Some(DecompositionKind::Component)));
  }

  #[test]
  fn atoms_and_non_decomposable_compounds_yield_nothing() {
    let f = TermFactory::new_default();
    let memory: Arc<dyn MemoryView> = Arc::new(SimpleMemory::new());
    let config = ReasonerConfig::default();

    let atom_primary = Task::belief(f.atom("bird"), Truth::new(1.0, 0.9), Stamp::input());
    let image = f
      .compound(Operator::ImageExt, vec![f.atom("rel"), f.atom("a")])
      .unwrap();
    let image_primary = Task::belief(image, Truth::new(1.0, 0.9), Stamp::input());

    let strategy = DecompositionStrategy::new();
    let ctx = context(&memory, &f, &config);
    assert!(strategy.candidates(&atom_primary, &ctx).unwrap().is_empty());
    assert!(strategy.candidates(&image_primary, &ctx).unwrap().is_empty());
  }
}
