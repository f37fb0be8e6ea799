/*!

Analogical mapping: cross similarity beliefs with inheritance/implication beliefs over a shared
middle term.

When the primary is a statement, the strategy scans memory for similarity beliefs one of whose
sides unifies with a side of the primary — exactly the shape the analogy rule consumes. When the
primary is itself a similarity, the roles flip and the statements are proposed instead. The
unification check matters once variables appear in beliefs; for ground terms it degenerates to a
name comparison.

*/

use crate::{
  api::{operator::Operator, term::TermPtr},
  core::{
    error::ReasonerError,
    strategy::{Candidate, CandidateKind, FormationStrategy, StrategyContext},
    substitution::Substitution,
    task::Task,
    unifier,
  },
};

const MAPPING_PRIORITY: f32 = 0.8;

pub struct AnalogicalStrategy {
  enabled:       bool,
  base_priority: f32,
}

impl Default for AnalogicalStrategy {
  fn default() -> Self {
    AnalogicalStrategy { enabled: true, base_priority: 1.0 }
  }
}

impl AnalogicalStrategy {
  pub fn new() -> AnalogicalStrategy {
    AnalogicalStrategy::default()
  }
}

/// Whether any side of `a` unifies with any side of `b`.
fn sides_share_a_middle(a: &TermPtr, b: &TermPtr) -> bool {
  let mut subst = Substitution::new();
  for a_side in a.components() {
    for b_side in b.components() {
      if unifier::unify(a_side, b_side, &mut subst) {
        return true;
      }
      subst.clear();
    }
  }
  false
}

fn is_directed_statement(term: &TermPtr) -> bool {
  matches!(
    term.operator(),
    Some(Operator::Inheritance) | Some(Operator::Implication)
  )
}

fn is_similarity(term: &TermPtr) -> bool {
  matches!(
    term.operator(),
    Some(Operator::Similarity) | Some(Operator::Equivalence)
  )
}

impl FormationStrategy for AnalogicalStrategy {
  fn name(&self) -> &'static str {
    "analogical"
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
    let primary_term = primary.term();

    // Which belief shape completes the analogy for this primary?
    let wants_similarity = if is_directed_statement(primary_term) {
      true
    } else if is_similarity(primary_term) {
      false
    } else {
      return Ok(Vec::new());
    };

    let mut candidates = Vec::new();

    for concept in ctx.memory.concepts() {
      let tasks = concept
        .try_tasks(None)
        .map_err(|e| ReasonerError::PremiseSource(e.to_string()))?;

      for task in tasks {
        if task.truth().is_none() {
          continue;
        }
        if task.stamp().serial() == primary.stamp().serial() {
          continue;
        }
        let shape_fits = if wants_similarity {
          is_similarity(task.term())
        } else {
          is_directed_statement(task.term())
        };
        if !shape_fits {
          continue;
        }
        if sides_share_a_middle(primary_term, task.term()) {
          candidates.push(Candidate::from_task(
            task,
            MAPPING_PRIORITY * self.base_priority,
            CandidateKind::Analogical,
          ));
        }
      }
    }

    Ok(candidates)
  }
}
