/*!

Task matching: pair the primary with existing truth-bearing tasks from memory, ranked by how
much structure they share.

Compatibility tiers: a syllogistic chain (the primary's predicate is the other task's subject,
or vice versa) ranks *highly compatible*; any shared term ranks *compatible*; everything else is
*less compatible* but still offered at low priority, since a bounded bag downstream keeps the
tail from crowding out the head.

*/

use nonax_abs::IString;

use crate::{
  api::term::TermPtr,
  core::{
    error::ReasonerError,
    strategy::{Candidate, CandidateKind, FormationStrategy, StrategyContext},
    task::Task,
  },
};

const HIGHLY_COMPATIBLE: f32 = 0.9;
const COMPATIBLE:        f32 = 0.6;
const LESS_COMPATIBLE:   f32 = 0.2;

pub struct TaskMatchStrategy {
  enabled:       bool,
  base_priority: f32,
}

impl Default for TaskMatchStrategy {
  fn default() -> Self {
    TaskMatchStrategy { enabled: true, base_priority: 1.0 }
  }
}

impl TaskMatchStrategy {
  pub fn new() -> TaskMatchStrategy {
    TaskMatchStrategy::default()
  }
}

/// All atom/compound names occurring at the top level of a term: the term itself plus its
/// direct components. This is the vocabulary the shared-term test runs over.
fn surface_names(term: &TermPtr) -> Vec<IString> {
  let mut names = vec![term.name()];
  for component in term.components() {
    names.push(component.name());
  }
  names
}

fn compatibility(primary: &TermPtr, other: &TermPtr) -> f32 {
  // Syllogistic chain: shared middle term across statement ends.
  if primary.is_statement() && other.is_statement() {
    let (ps, pp) = (primary.components()[0].name(), primary.components()[1].name());
    let (os, op_) = (other.components()[0].name(), other.components()[1].name());
    if pp == os || ps == op_ {
      return HIGHLY_COMPATIBLE;
    }
  }

  let primary_names = surface_names(primary);
  if surface_names(other).iter().any(|n| primary_names.contains(n)) {
    COMPATIBLE
  } else {
    LESS_COMPATIBLE
  }
}

impl FormationStrategy for TaskMatchStrategy {
  fn name(&self) -> &'static str {
    "task-match"
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
    ctx: &StrategyContext,
  ) -> Result<Vec<Candidate>, ReasonerError> {
    let mut candidates = Vec::new();

    for concept in ctx.memory.concepts() {
      let tasks = concept
        .try_tasks(None)
        .map_err(|e| ReasonerError::PremiseSource(e.to_string()))?;

      for task in tasks {
        // Secondaries feed binary truth functions, so they must carry truth.
        if task.truth().is_none() {
          continue;
        }
        // Not the primary itself.
        if task.stamp().serial() == primary.stamp().serial() {
          continue;
        }
        let score = compatibility(primary.term(), task.term());
        candidates.push(Candidate::from_task(
          task,
          score * self.base_priority,
          CandidateKind::TaskMatch,
        ));
      }
    }

    // Highly compatible candidates sort first; the bag would order them anyway, but callers
    // draining lazily should see the best ones up front.
    candidates.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));
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

  fn inh(f: &TermFactory, s: &str, p: &str) -> TermPtr {
    f.compound(Operator::Inheritance, vec![f.atom(s), f.atom(p)]).unwrap()
  }

  #[test]
  fn syllogistic_chains_rank_highest() {
    let f = TermFactory::new_default();
    let memory = Arc::new(SimpleMemory::new());

    memory.add_task(Task::belief(inh(&f, "bird", "animal"), Truth::new(1.0, 0.9), Stamp::input()));
    memory.add_task(Task::belief(inh(&f, "bird", "flyer"), Truth::new(1.0, 0.9), Stamp::input()));
    memory.add_task(Task::belief(inh(&f, "fish", "swimmer"), Truth::new(1.0, 0.9), Stamp::input()));

    let primary = Task::belief(inh(&f, "robin", "bird"), Truth::new(1.0, 0.9), Stamp::input());
    let memory_view: Arc<dyn MemoryView> = memory;
    let config = ReasonerConfig::default();
    let ctx = StrategyContext { memory: &memory_view, factory: &f, config: &config, embeddings: None };

    let candidates = TaskMatchStrategy::new().candidates(&primary, &ctx).unwrap();
    assert_eq!(candidates.len(), 3);

    // Both bird-headed statements chain on the middle term; the fish statement shares nothing.
    assert!((candidates[0].priority - HIGHLY_COMPATIBLE).abs() < 1e-6);
    assert!((candidates[1].priority - HIGHLY_COMPATIBLE).abs() < 1e-6);
    assert!((candidates[2].priority - LESS_COMPATIBLE).abs() < 1e-6);
  }

  #[test]
  fn shared_terms_without_a_chain_are_merely_compatible() {
    let f = TermFactory::new_default();
    let memory = Arc::new(SimpleMemory::new());
    // Shares the subject, not a chainable middle.
    memory.add_task(Task::belief(inh(&f, "robin", "flyer"), Truth::new(1.0, 0.9), Stamp::input()));

    let primary = Task::belief(inh(&f, "robin", "bird"), Truth::new(1.0, 0.9), Stamp::input());
    let memory_view: Arc<dyn MemoryView> = memory;
    let config = ReasonerConfig::default();
    let ctx = StrategyContext { memory: &memory_view, factory: &f, config: &config, embeddings: None };

    let candidates = TaskMatchStrategy::new().candidates(&primary, &ctx).unwrap();
    assert_eq!(candidates.len(), 1);
    assert!((candidates[0].priority - COMPATIBLE).abs() < 1e-6);
  }

  #[test]
  fn questions_and_the_primary_itself_are_excluded() {
    let f = TermFactory::new_default();
    let memory = Arc::new(SimpleMemory::new());

    let primary = Task::belief(inh(&f, "robin", "bird"), Truth::new(1.0, 0.9), Stamp::input());
    memory.add_task(primary.clone());
    memory.add_task(Task::question(inh(&f, "robin", "animal"), Stamp::input()));

    let memory_view: Arc<dyn MemoryView> = memory;
    let config = ReasonerConfig::default();
    let ctx = StrategyContext { memory: &memory_view, factory: &f, config: &config, embeddings: None };

    let candidates = TaskMatchStrategy::new().candidates(&primary, &ctx).unwrap();
    assert!(candidates.is_empty());
  }
}
