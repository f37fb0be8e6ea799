/*!

Premise formation: strategies that propose candidate secondary premises for a primary, and the
orchestrator that funnels their proposals through a priority bag into `(primary, secondary)`
pairs.

A strategy looks at the primary from one angle — structural decomposition, shared middle terms,
embedding similarity, analogical mappings, backward chaining — and yields candidate records. The
orchestrator drains every enabled strategy into a bounded bag, takes the strongest candidates in
priority order, materializes them as tasks, and deduplicates by canonical term name. Per-strategy
faults are logged and contained; one broken strategy never costs the primary its other pairings.

*/

pub mod analogical;
pub mod decomposition;
pub mod prolog;
pub mod semantic;
pub mod task_match;

use std::sync::{Arc, Mutex};

use nonax_abs::{debug, IString};

use crate::{
  api::{
    language_model::EmbeddingLayer,
    memory::MemoryView,
    term::TermPtr,
    term_factory::TermFactory,
  },
  core::{
    bag::Bag,
    config::ReasonerConfig,
    error::ReasonerError,
    rule_processor::PremisePair,
    stamp::{Stamp, StampSource},
    task::{Budget, Punctuation, Task},
    truth::{weak, Truth},
  },
};

/// What kind of proposal a candidate is; carried through for tracing and tests.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CandidateKind {
  Decomposed,
  TaskMatch,
  Semantic,
  Analogical,
  PrologDerived,
}

/// Which role a decomposed component played in its parent compound.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecompositionKind {
  Subject,
  Predicate,
  Component,
}

/// A proposed secondary premise: either an existing task from memory (`source_task`) or a bare
/// term to synthesize a belief from. Decomposition candidates additionally record the operator
/// they were broken out of and their component index.
#[derive(Clone, Debug)]
pub struct Candidate {
  pub term:            Option<TermPtr>,
  pub source_task:     Option<Task>,
  pub priority:        f32,
  pub kind:            CandidateKind,
  pub decomposition:   Option<DecompositionKind>,
  pub operator:        Option<crate::api::operator::Operator>,
  pub component_index: Option<u32>,
}

impl Candidate {
  pub fn from_term(term: TermPtr, priority: f32, kind: CandidateKind) -> Candidate {
    Candidate {
      term: Some(term),
      source_task: None,
      priority,
      kind,
      decomposition: None,
      operator: None,
      component_index: None,
    }
  }

  pub fn from_task(task: Task, priority: f32, kind: CandidateKind) -> Candidate {
    Candidate {
      term: None,
      source_task: Some(task),
      priority,
      kind,
      decomposition: None,
      operator: None,
      component_index: None,
    }
  }

  /// Identity for bag dedup: the canonical name of whatever term the candidate stands for.
  pub fn key(&self) -> IString {
    if let Some(task) = &self.source_task {
      task.term().name()
    } else if let Some(term) = &self.term {
      term.name()
    } else {
      IString::from("")
    }
  }
}

/// Everything a strategy may consult while generating candidates.
pub struct StrategyContext<'a> {
  pub memory:     &'a Arc<dyn MemoryView>,
  pub factory:    &'a Arc<TermFactory>,
  pub config:     &'a ReasonerConfig,
  pub embeddings: Option<&'a Arc<dyn EmbeddingLayer>>,
}

pub trait FormationStrategy: Send + Sync {
  fn name(&self) -> &'static str;

  fn enabled(&self) -> bool {
    true
  }

  /// Multiplier applied on top of the per-candidate priorities this strategy assigns.
  fn base_priority(&self) -> f32 {
    1.0
  }

  fn candidates(
    &self,
    primary: &Task,
    ctx: &StrategyContext,
  ) -> Result<Vec<Candidate>, ReasonerError>;
}

struct FormationState {
  bag: Bag<Candidate>,
}

/// The orchestrator. One instance serves the whole pipeline; its candidate bag is cleared per
/// primary.
pub struct PremiseFormation {
  strategies:     Vec<Arc<dyn FormationStrategy>>,
  memory:         Arc<dyn MemoryView>,
  factory:        Arc<TermFactory>,
  config:         ReasonerConfig,
  embeddings:     Option<Arc<dyn EmbeddingLayer>>,
  /// Whether a single-premise rule is registered, i.e. whether a primary with no candidates is
  /// still worth emitting with a null secondary.
  emit_singletons: bool,
  state:          Mutex<FormationState>,
}

impl PremiseFormation {
  pub fn new(
    strategies: Vec<Arc<dyn FormationStrategy>>,
    memory: Arc<dyn MemoryView>,
    factory: Arc<TermFactory>,
    config: ReasonerConfig,
    embeddings: Option<Arc<dyn EmbeddingLayer>>,
    emit_singletons: bool,
  ) -> PremiseFormation {
    let bag = Bag::new(config.candidate_bag_size);
    PremiseFormation {
      strategies,
      memory,
      factory,
      config,
      embeddings,
      emit_singletons,
      state: Mutex::new(FormationState { bag }),
    }
  }

  /// Forms the premise pairs for one primary.
  pub fn pairs(&self, primary: Task) -> Vec<PremisePair> {
    let ctx = StrategyContext {
      memory:     &self.memory,
      factory:    &self.factory,
      config:     &self.config,
      embeddings: self.embeddings.as_ref(),
    };

    let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
    state.bag.clear();

    for strategy in &self.strategies {
      if !strategy.enabled() {
        continue;
      }
      match strategy.candidates(&primary, &ctx) {
        Ok(candidates) => {
          for candidate in candidates {
            let key = candidate.key();
            let priority = candidate.priority;
            state.bag.insert(key, candidate, priority);
          }
        }
        Err(error) => {
          debug!(1, "strategy `{}` failed for `{}`: {error}", strategy.name(), primary.term());
        }
      }
    }

    let picked = state.bag.take_ordered(self.config.max_secondary_premises);
    drop(state);

    let mut seen: Vec<IString> = Vec::with_capacity(picked.len());
    let mut pairs: Vec<PremisePair> = Vec::with_capacity(picked.len());

    for candidate in picked {
      let Some(secondary) = self.materialize(&primary, candidate) else { continue };
      let name = secondary.term().name();
      if seen.contains(&name) {
        continue;
      }
      seen.push(name);
      pairs.push(PremisePair {
        primary:   primary.clone(),
        secondary: Some(secondary),
      });
      if pairs.len() >= self.config.max_secondary_premises {
        break;
      }
    }

    if pairs.is_empty() {
      if self.emit_singletons {
        return vec![PremisePair { primary, secondary: None }];
      }
      return Vec::new();
    }
    pairs
  }

  /// Turns a candidate into a secondary-premise task. An existing task is used verbatim; a bare
  /// term becomes a belief inheriting a weakened version of the primary's truth.
  fn materialize(&self, primary: &Task, candidate: Candidate) -> Option<Task> {
    if let Some(task) = candidate.source_task {
      return Some(task);
    }
    let term = candidate.term?;

    let truth = match primary.truth() {
      Some(truth) => Truth::new(truth.f, weak(truth.c)),
      // A truthless (question) primary lends no evidence; synthesize from the default.
      None => Truth::new(1.0, weak(0.9)),
    };
    let stamp = Stamp::derive(
      std::slice::from_ref(primary.stamp()),
      StampSource::derived("premise-formation"),
      primary.stamp().depth(),
    );

    Task::new(
      term,
      Punctuation::Judgment,
      Some(truth),
      Budget::with_priority(candidate.priority),
      stamp,
    )
    .ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    api::{memory::SimpleMemory, operator::Operator},
    core::stamp::Stamp,
  };

  struct FixedStrategy {
    produced: Vec<Candidate>,
  }

  impl FormationStrategy for FixedStrategy {
    fn name(&self) -> &'static str {
      "fixed"
    }

    fn candidates(
      &self,
      _primary: &Task,
      _ctx: &StrategyContext,
    ) -> Result<Vec<Candidate>, ReasonerError> {
      Ok(self.produced.clone())
    }
  }

  struct FailingStrategy;

  impl FormationStrategy for FailingStrategy {
    fn name(&self) -> &'static str {
      "failing"
    }

    fn candidates(
      &self,
      _primary: &Task,
      _ctx: &StrategyContext,
    ) -> Result<Vec<Candidate>, ReasonerError> {
      Err(ReasonerError::PremiseSource("backing store offline".into()))
    }
  }

  fn formation(
    strategies: Vec<Arc<dyn FormationStrategy>>,
    factory: Arc<TermFactory>,
    emit_singletons: bool,
  ) -> PremiseFormation {
    PremiseFormation::new(
      strategies,
      Arc::new(SimpleMemory::new()),
      factory,
      ReasonerConfig::default(),
      None,
      emit_singletons,
    )
  }

  fn primary(factory: &TermFactory) -> Task {
    let term = factory
      .compound(
        Operator::Inheritance,
        vec![factory.atom("robin"), factory.atom("bird")],
      )
      .unwrap();
    Task::belief(term, Truth::new(1.0, 0.9), Stamp::input())
  }

  #[test]
  fn candidates_become_pairs_in_priority_order() {
    let f = TermFactory::new_default();
    let strategy = FixedStrategy {
      produced: vec![
        Candidate::from_term(f.atom("weak"), 0.2, CandidateKind::Decomposed),
        Candidate::from_term(f.atom("strong"), 0.9, CandidateKind::Decomposed),
      ],
    };
    let formation = formation(vec![Arc::new(strategy)], f.clone(), false);

    let pairs = formation.pairs(primary(&f));
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].secondary.as_ref().unwrap().term().name().as_str(), "strong");
    assert_eq!(pairs[1].secondary.as_ref().unwrap().term().name().as_str(), "weak");
  }

  #[test]
  fn synthesized_secondaries_inherit_weakened_truth() {
    let f = TermFactory::new_default();
    let strategy = FixedStrategy {
      produced: vec![Candidate::from_term(f.atom("bird"), 0.8, CandidateKind::Decomposed)],
    };
    let formation = formation(vec![Arc::new(strategy)], f.clone(), false);

    let primary = primary(&f);
    let pairs = formation.pairs(primary.clone());
    let secondary = pairs[0].secondary.as_ref().unwrap();
    let truth = secondary.truth().unwrap();
    assert!((truth.f - 1.0).abs() < 1e-6);
    assert!((truth.c - 0.72).abs() < 1e-6);
    // The synthesized stamp descends from the primary's, so the two share evidence.
    assert!(secondary.stamp().overlaps(primary.stamp()));
  }

  #[test]
  fn duplicate_terms_collapse_to_one_pair() {
    let f = TermFactory::new_default();
    let strategy = FixedStrategy {
      produced: vec![
        Candidate::from_term(f.atom("same"), 0.9, CandidateKind::Decomposed),
        Candidate::from_term(f.atom("same"), 0.5, CandidateKind::Semantic),
      ],
    };
    let formation = formation(vec![Arc::new(strategy)], f.clone(), false);
    assert_eq!(formation.pairs(primary(&f)).len(), 1);
  }

  #[test]
  fn failing_strategies_are_contained() {
    let f = TermFactory::new_default();
    let good = FixedStrategy {
      produced: vec![Candidate::from_term(f.atom("ok"), 0.7, CandidateKind::Decomposed)],
    };
    let formation = formation(
      vec![Arc::new(FailingStrategy), Arc::new(good)],
      f.clone(),
      false,
    );
    let pairs = formation.pairs(primary(&f));
    assert_eq!(pairs.len(), 1);
  }

  #[test]
  fn empty_candidates_emit_singleton_when_configured() {
    let f = TermFactory::new_default();
    let none = FixedStrategy { produced: Vec::new() };

    let with_singletons = formation(vec![Arc::new(none)], f.clone(), true);
    let pairs = with_singletons.pairs(primary(&f));
    assert_eq!(pairs.len(), 1);
    assert!(pairs[0].secondary.is_none());

    let without = formation(vec![Arc::new(FixedStrategy { produced: Vec::new() })], f.clone(), false);
    assert!(without.pairs(primary(&f)).is_empty());
  }

  #[test]
  fn pair_count_respects_the_configured_cap() {
    let f = TermFactory::new_default();
    let produced: Vec<Candidate> = (0..20)
      .map(|i| {
        Candidate::from_term(
          f.atom(&format!("c{i}")),
          0.5 + (i as f32) * 0.01,
          CandidateKind::Decomposed,
        )
      })
      .collect();
    let formation = formation(vec![Arc::new(FixedStrategy { produced })], f.clone(), false);
    let pairs = formation.pairs(primary(&f));
    assert_eq!(pairs.len(), ReasonerConfig::default().max_secondary_premises);
  }
}
