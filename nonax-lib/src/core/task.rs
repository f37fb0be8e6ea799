/*!

The task model: an immutable bundle of a term, a punctuation, an optional truth, a budget, and
a stamp.

`Task::new` is the only entry point and enforces the model invariants: questions carry no truth,
judgments and goals must carry one, and a task whose top-level term is a negation is unwrapped —
the term loses the negation and the truth's frequency inverts. Tasks are cheap to clone; all the
heavy parts are shared handles.

*/

use std::fmt::{Display, Formatter};

use crate::{
  api::{operator::Operator, term::TermPtr},
  core::{
    error::ReasonerError,
    stamp::StampPtr,
    truth::Truth,
  },
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Punctuation {
  Judgment,
  Goal,
  Question,
}

impl Punctuation {
  pub fn glyph(self) -> char {
    match self {
      Punctuation::Judgment => '.',
      Punctuation::Goal     => '!',
      Punctuation::Question => '?',
    }
  }
}

/// Attention-allocation triple, each component in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Budget {
  pub priority:   f32,
  pub durability: f32,
  pub quality:    f32,
}

impl Budget {
  pub fn new(priority: f32, durability: f32, quality: f32) -> Budget {
    Budget {
      priority:   priority.clamp(0.0, 1.0),
      durability: durability.clamp(0.0, 1.0),
      quality:    quality.clamp(0.0, 1.0),
    }
  }

  pub fn with_priority(priority: f32) -> Budget {
    Budget::new(priority, 0.5, 0.5)
  }
}

impl Default for Budget {
  fn default() -> Self {
    Budget::new(0.8, 0.5, 0.5)
  }
}

#[derive(Clone, Debug)]
pub struct Task {
  term:        TermPtr,
  punctuation: Punctuation,
  truth:       Option<Truth>,
  budget:      Budget,
  stamp:       StampPtr,
}

impl Task {
  pub fn new(
    term: TermPtr,
    punctuation: Punctuation,
    truth: Option<Truth>,
    budget: Budget,
    stamp: StampPtr,
  ) -> Result<Task, ReasonerError> {
    match punctuation {
      Punctuation::Question => {
        if truth.is_some() {
          return Err(ReasonerError::InvalidTask(format!(
            "question `{term}` must not carry a truth value"
          )));
        }
      }
      Punctuation::Judgment | Punctuation::Goal => {
        if truth.is_none() {
          return Err(ReasonerError::InvalidTask(format!(
            "{punctuation:?} `{term}` requires a truth value"
          )));
        }
      }
    }

    // A top-level negation unwraps: `(-- T)` with truth `(f, c)` becomes `T` with `(1−f, c)`.
    let (term, truth) = if term.operator() == Some(Operator::Negation) {
      let inner = term.components()[0].clone();
      (inner, truth.map(Truth::negated))
    } else {
      (term, truth)
    };

    Ok(Task { term, punctuation, truth, budget, stamp })
  }

  /// A belief with default budget and the given truth.
  pub fn belief(term: TermPtr, truth: Truth, stamp: StampPtr) -> Task {
    // A judgment with a truth value cannot violate the constructor invariants.
    Task::new(term, Punctuation::Judgment, Some(truth), Budget::default(), stamp)
      .expect("belief construction is infallible")
  }

  /// A question with default budget.
  pub fn question(term: TermPtr, stamp: StampPtr) -> Task {
    Task::new(term, Punctuation::Question, None, Budget::default(), stamp)
      .expect("question construction is infallible")
  }

  #[inline(always)]
  pub fn term(&self) -> &TermPtr {
    &self.term
  }

  #[inline(always)]
  pub fn punctuation(&self) -> Punctuation {
    self.punctuation
  }

  #[inline(always)]
  pub fn truth(&self) -> Option<Truth> {
    self.truth
  }

  #[inline(always)]
  pub fn budget(&self) -> Budget {
    self.budget
  }

  #[inline(always)]
  pub fn stamp(&self) -> &StampPtr {
    &self.stamp
  }

  #[inline(always)]
  pub fn is_question(&self) -> bool {
    self.punctuation == Punctuation::Question
  }

  #[inline(always)]
  pub fn is_judgment(&self) -> bool {
    self.punctuation == Punctuation::Judgment
  }

  /// Same task, different stamp. Used by the processor when enriching derivations.
  pub fn with_stamp(&self, stamp: StampPtr) -> Task {
    let mut task = self.clone();
    task.stamp = stamp;
    task
  }
}

impl Display for Task {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}{}", self.term, self.punctuation.glyph())?;
    if let Some(truth) = self.truth {
      write!(f, " {truth}")?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{api::TermFactory, core::stamp::Stamp};

  #[test]
  fn questions_reject_truth_values() {
    let f = TermFactory::new_default();
    let result = Task::new(
      f.atom("bird"),
      Punctuation::Question,
      Some(Truth::new(1.0, 0.9)),
      Budget::default(),
      Stamp::input(),
    );
    assert!(matches!(result, Err(ReasonerError::InvalidTask(_))));
  }

  #[test]
  fn judgments_require_truth_values() {
    let f = TermFactory::new_default();
    let result = Task::new(
      f.atom("bird"),
      Punctuation::Judgment,
      None,
      Budget::default(),
      Stamp::input(),
    );
    assert!(matches!(result, Err(ReasonerError::InvalidTask(_))));
  }

  #[test]
  fn top_level_negation_unwraps_and_inverts() {
    let f = TermFactory::new_default();
    let bird_animal = f
      .compound(
        Operator::Inheritance,
        vec![f.atom("bird"), f.atom("animal")],
      )
      .unwrap();
    let negated = f
      .compound(Operator::Negation, vec![bird_animal.clone()])
      .unwrap();

    let task = Task::new(
      negated,
      Punctuation::Judgment,
      Some(Truth::new(0.2, 0.9)),
      Budget::default(),
      Stamp::input(),
    )
    .unwrap();

    assert_eq!(task.term().name(), bird_animal.name());
    let truth = task.truth().unwrap();
    assert!((truth.f - 0.8).abs() < 1e-6);
    assert!((truth.c - 0.9).abs() < 1e-6);
  }

  #[test]
  fn budget_components_clamp() {
    let b = Budget::new(1.5, -0.1, 0.5);
    assert_eq!(b.priority, 1.0);
    assert_eq!(b.durability, 0.0);
  }

  #[test]
  fn display_includes_punctuation_and_truth() {
    let f = TermFactory::new_default();
    let task = Task::belief(f.atom("bird"), Truth::new(1.0, 0.9), Stamp::input());
    let shown = task.to_string();
    assert!(shown.starts_with("bird."));
    assert!(shown.contains("0.9"));
  }
}
