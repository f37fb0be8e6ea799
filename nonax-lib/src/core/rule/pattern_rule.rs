/*!

Declarative pattern rules.

A `PatternRule` is a record of premise templates, a conclusion template, and the name of the
truth function that combines the premise truths. Templates are ordinary terms containing
variables; execution unifies each template with its instance — both premises under one shared
substitution — applies the bindings to the conclusion, and stamps the result with the union of
the premise provenance.

A rule contributes nothing for a pair whose stamps share evidence, whose premises lack truth
values, or whose conclusion comes out non-ground or collapses to the `True` atom.

*/

use nonax_abs::IString;

use crate::{
  api::{
    operator::Operator,
    term::TermPtr,
    term_factory::TermFactory,
  },
  core::{
    stamp::{Stamp, StampSource},
    substitution::Substitution,
    task::{Budget, Punctuation, Task},
    truth::{self, Truth},
    unifier,
  },
};

/// The NAL truth function a rule names. `compute` is a pure function of the premise truths.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TruthFunction {
  Deduction,
  Abduction,
  Induction,
  Exemplification,
  Analogy,
  /// `Analogy` with the premise roles swapped.
  AnalogyExchanged,
  Resemblance,
  Comparison,
  Conversion,
  Intersection,
  Union,
}

impl TruthFunction {
  /// `None` when the function needs a second premise truth and there is none.
  pub fn compute(self, primary: Truth, secondary: Option<Truth>) -> Option<Truth> {
    match self {
      TruthFunction::Conversion => Some(truth::conversion(primary)),
      _ => {
        let secondary = secondary?;
        let computed = match self {
          TruthFunction::Deduction        => truth::deduction(primary, secondary),
          TruthFunction::Abduction        => truth::abduction(primary, secondary),
          TruthFunction::Induction        => truth::induction(primary, secondary),
          TruthFunction::Exemplification  => truth::exemplification(primary, secondary),
          TruthFunction::Analogy          => truth::analogy(primary, secondary),
          TruthFunction::AnalogyExchanged => truth::analogy(secondary, primary),
          TruthFunction::Resemblance      => truth::resemblance(primary, secondary),
          TruthFunction::Comparison       => truth::comparison(primary, secondary),
          TruthFunction::Intersection     => truth::intersection(primary, secondary),
          TruthFunction::Union            => truth::union(primary, secondary),
          TruthFunction::Conversion       => unreachable!(),
        };
        Some(computed)
      }
    }
  }
}

/// One discriminator value a pattern exposes for tree indexing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Discriminator {
  Op(Operator),
  Arity(usize),
  /// Accepts any instance value at this position.
  Wildcard,
}

pub struct PatternRule {
  id:         IString,
  premises:   Vec<TermPtr>,
  conclusion: TermPtr,
  truth_fn:   TruthFunction,
}

impl PatternRule {
  pub fn new(
    id: &str,
    premises: Vec<TermPtr>,
    conclusion: TermPtr,
    truth_fn: TruthFunction,
  ) -> PatternRule {
    debug_assert!(
      !premises.is_empty() && premises.len() <= 2,
      "pattern rules take one or two premises"
    );
    PatternRule {
      id: IString::from(id),
      premises,
      conclusion,
      truth_fn,
    }
  }

  #[inline(always)]
  pub fn id(&self) -> IString {
    self.id
  }

  #[inline(always)]
  pub fn is_single_premise(&self) -> bool {
    self.premises.len() == 1
  }

  #[inline(always)]
  pub fn premises(&self) -> &[TermPtr] {
    &self.premises
  }

  #[inline(always)]
  pub fn conclusion(&self) -> &TermPtr {
    &self.conclusion
  }

  #[inline(always)]
  pub fn truth_fn(&self) -> TruthFunction {
    self.truth_fn
  }

  /// The fixed discriminator list: primary operator, secondary operator, primary arity,
  /// secondary arity. A missing second premise wildcards its positions.
  pub fn discriminators(&self) -> [Discriminator; 4] {
    let primary = &self.premises[0];
    let secondary = self.premises.get(1);

    [
      pattern_op(primary),
      secondary.map_or(Discriminator::Wildcard, pattern_op),
      pattern_arity(primary),
      secondary.map_or(Discriminator::Wildcard, pattern_arity),
    ]
  }

  /// Attempts the rule on a premise pair. `None` means the rule doesn't apply: failed
  /// unification, missing truth, overlapping stamps, or a degenerate conclusion.
  pub fn try_apply(
    &self,
    primary: &Task,
    secondary: Option<&Task>,
    factory: &TermFactory,
  ) -> Option<Task> {
    let primary_truth = primary.truth()?;

    let mut subst = Substitution::new();
    if !unifier::match_pattern(&self.premises[0], primary.term(), &mut subst) {
      return None;
    }

    let (conclusion_truth, stamp) = if self.is_single_premise() {
      let conclusion_truth = self.truth_fn.compute(primary_truth, None)?;
      let stamp = Stamp::derive(
        std::slice::from_ref(primary.stamp()),
        StampSource::Derived(self.id),
        primary.stamp().depth() + 1,
      );
      (conclusion_truth, stamp)
    } else {
      let secondary = secondary?;
      let secondary_truth = secondary.truth()?;

      // Premises resting on shared evidence must not recombine.
      if primary.stamp().overlaps(secondary.stamp()) {
        return None;
      }
      if !unifier::match_pattern(&self.premises[1], secondary.term(), &mut subst) {
        return None;
      }

      let conclusion_truth = self.truth_fn.compute(primary_truth, Some(secondary_truth))?;
      let depth = primary.stamp().depth().max(secondary.stamp().depth()) + 1;
      let stamp = Stamp::derive(
        &[primary.stamp().clone(), secondary.stamp().clone()],
        StampSource::Derived(self.id),
        depth,
      );
      (conclusion_truth, stamp)
    };

    let conclusion_term = unifier::apply(&self.conclusion, &subst, factory);

    // A conclusion with residual variables or one that collapsed to the trivial atom carries
    // no information.
    if !conclusion_term.is_ground() || conclusion_term.name() == factory.truth_atom().name() {
      return None;
    }

    Task::new(
      conclusion_term,
      Punctuation::Judgment,
      Some(conclusion_truth),
      Budget::with_priority(primary.budget().priority),
      stamp,
    )
    .ok()
  }
}

fn pattern_op(pattern: &TermPtr) -> Discriminator {
  match pattern.operator() {
    Some(op) => Discriminator::Op(op),
    None => Discriminator::Wildcard,
  }
}

fn pattern_arity(pattern: &TermPtr) -> Discriminator {
  if pattern.is_compound() {
    Discriminator::Arity(pattern.arity())
  } else {
    Discriminator::Wildcard
  }
}
