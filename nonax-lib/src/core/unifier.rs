/*!

Unification and one-way pattern matching over terms.

`unify` is symmetric: variables on either side may bind. `match_pattern` is the one-way variant
used by rule execution: only variables of the pattern bind, and variables occurring in the
instance are treated as opaque constants. Both walk the structure recursively, dispatching on
operator and arity, with an occurs-check on every new binding. On failure the substitution is
rolled back to its entry state, so callers never observe bindings from a failed attempt.

Commutative operators need more than positional descent: their canonical component order need
not line up with the pattern's, so for small arities every pairing permutation is tried with
backtracking before giving up.

*/

use nonax_abs::IString;

use crate::{
  api::{
    term::{TermData, TermPtr},
    term_factory::TermFactory,
  },
  core::substitution::Substitution,
};

/// Commutative compounds up to this arity get full permutation search; beyond it, matching
/// falls back to positional descent against the canonical order.
const MAX_PERMUTATION_ARITY: usize = 6;

#[derive(Copy, Clone, PartialEq, Eq)]
enum Mode {
  /// Variables on both sides bind.
  TwoWay,
  /// Only pattern-side (left) variables bind; instance variables are constants.
  OneWay,
}

/// Two-way unification. On success the bindings extend `subst`; on failure `subst` is restored.
pub fn unify(t1: &TermPtr, t2: &TermPtr, subst: &mut Substitution) -> bool {
  let mark = subst.mark();
  if descend(t1, t2, subst, Mode::TwoWay) {
    true
  } else {
    subst.undo_to(mark);
    false
  }
}

/// One-way match of `pattern` against `instance`. Only pattern variables bind.
pub fn match_pattern(pattern: &TermPtr, instance: &TermPtr, subst: &mut Substitution) -> bool {
  let mark = subst.mark();
  if descend(pattern, instance, subst, Mode::OneWay) {
    true
  } else {
    subst.undo_to(mark);
    false
  }
}

/// Applies `subst` to `term`, re-interning through the factory. Unbound variables stay.
pub fn apply(term: &TermPtr, subst: &Substitution, factory: &TermFactory) -> TermPtr {
  match term.data() {
    TermData::Atom => term.clone(),
    TermData::Variable => match subst.lookup(term.name()) {
      // Bindings may chain through intermediate variables.
      Some(bound) => apply(bound, subst, factory),
      None => term.clone(),
    },
    TermData::Compound { op, components } => {
      let substituted: Vec<TermPtr> =
        components.iter().map(|c| apply(c, subst, factory)).collect();
      // Substitution cannot change arity, so canonical reconstruction is infallible here;
      // it may still collapse (e.g. a statement whose sides became equal).
      factory
        .compound(*op, substituted)
        .unwrap_or_else(|_| term.clone())
    }
  }
}

fn descend(left: &TermPtr, right: &TermPtr, subst: &mut Substitution, mode: Mode) -> bool {
  // Chase existing bindings on the left so repeated variables stay consistent.
  if left.is_variable() {
    if let Some(bound) = subst.lookup(left.name()).cloned() {
      return descend(&bound, right, subst, mode);
    }
    return bind(left.name(), right, subst);
  }

  if right.is_variable() {
    match mode {
      Mode::TwoWay => {
        if let Some(bound) = subst.lookup(right.name()).cloned() {
          return descend(left, &bound, subst, mode);
        }
        return bind(right.name(), left, subst);
      }
      // An instance-side variable is a constant; only an identical variable on the pattern
      // side could have matched it, and that case was handled above.
      Mode::OneWay => return false,
    }
  }

  match (left.data(), right.data()) {
    (TermData::Atom, TermData::Atom) => left.name() == right.name(),

    (
      TermData::Compound { op: left_op, components: left_components },
      TermData::Compound { op: right_op, components: right_components },
    ) => {
      if left_op != right_op || left_components.len() != right_components.len() {
        return false;
      }
      if left_op.is_commutative() && left_components.len() <= MAX_PERMUTATION_ARITY {
        permute(left_components, right_components, &mut vec![false; right_components.len()], 0, subst, mode)
      } else {
        pairwise(left_components, right_components, subst, mode)
      }
    }

    _ => false,
  }
}

fn pairwise(
  left: &[TermPtr],
  right: &[TermPtr],
  subst: &mut Substitution,
  mode: Mode,
) -> bool {
  left
    .iter()
    .zip(right.iter())
    .all(|(l, r)| descend(l, r, subst, mode))
}

/// Backtracking search over pairings of commutative components.
fn permute(
  left: &[TermPtr],
  right: &[TermPtr],
  used: &mut Vec<bool>,
  index: usize,
  subst: &mut Substitution,
  mode: Mode,
) -> bool {
  if index == left.len() {
    return true;
  }
  for j in 0..right.len() {
    if used[j] {
      continue;
    }
    let mark = subst.mark();
    if descend(&left[index], &right[j], subst, mode) {
      used[j] = true;
      if permute(left, right, used, index + 1, subst, mode) {
        return true;
      }
      used[j] = false;
    }
    subst.undo_to(mark);
  }
  false
}

fn bind(name: IString, value: &TermPtr, subst: &mut Substitution) -> bool {
  // Binding a variable to itself is vacuous.
  if value.is_variable() && value.name() == name {
    return true;
  }
  // Occurs check.
  if value.contains_variable(name) {
    return false;
  }
  subst.bind(name, value.clone());
  true
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::api::{operator::Operator, TermFactory};

  fn setup() -> Arc<TermFactory> {
    TermFactory::new_default()
  }

  fn inh(f: &TermFactory, s: &TermPtr, p: &TermPtr) -> TermPtr {
    f.compound(Operator::Inheritance, vec![s.clone(), p.clone()]).unwrap()
  }

  #[test]
  fn atoms_unify_only_with_themselves() {
    let f = setup();
    let mut subst = Substitution::new();
    assert!(unify(&f.atom("a"), &f.atom("a"), &mut subst));
    assert!(!unify(&f.atom("a"), &f.atom("b"), &mut subst));
    assert!(subst.is_empty());
  }

  #[test]
  fn variables_bind_and_round_trip() {
    let f = setup();
    let x = f.variable("x");
    let pattern = inh(&f, &x, &f.atom("bird"));
    let instance = inh(&f, &f.atom("robin"), &f.atom("bird"));

    let mut subst = Substitution::new();
    assert!(unify(&pattern, &instance, &mut subst));

    let applied_pattern = apply(&pattern, &subst, &f);
    let applied_instance = apply(&instance, &subst, &f);
    assert_eq!(applied_pattern.name(), applied_instance.name());
  }

  #[test]
  fn repeated_variables_must_agree() {
    let f = setup();
    let x = f.variable("x");
    let pattern = inh(&f, &x, &x);
    // A reflexive instance collapses to True at construction, so build a near miss instead.
    let instance = inh(&f, &f.atom("robin"), &f.atom("bird"));
    let mut subst = Substitution::new();
    assert!(!unify(&pattern, &instance, &mut subst));
    assert!(subst.is_empty());
  }

  #[test]
  fn occurs_check_rejects_cyclic_bindings() {
    let f = setup();
    let x = f.variable("x");
    let fx = f.compound(Operator::Product, vec![f.atom("f"), x.clone()]).unwrap();
    let mut subst = Substitution::new();
    assert!(!unify(&x, &fx, &mut subst));
    assert!(subst.is_empty());
  }

  #[test]
  fn operator_and_arity_mismatches_fail() {
    let f = setup();
    let ab_inh = inh(&f, &f.atom("a"), &f.atom("b"));
    let ab_sim = f
      .compound(Operator::Similarity, vec![f.atom("a"), f.atom("b")])
      .unwrap();
    let abc = f
      .compound(Operator::Product, vec![f.atom("a"), f.atom("b"), f.atom("c")])
      .unwrap();
    let ab = f
      .compound(Operator::Product, vec![f.atom("a"), f.atom("b")])
      .unwrap();

    let mut subst = Substitution::new();
    assert!(!unify(&ab_inh, &ab_sim, &mut subst));
    assert!(!unify(&abc, &ab, &mut subst));
  }

  #[test]
  fn one_way_match_keeps_instance_variables_constant() {
    let f = setup();
    let pattern = inh(&f, &f.atom("robin"), &f.atom("bird"));
    let instance = inh(&f, &f.variable("q"), &f.atom("bird"));

    // The instance variable does not bind in one-way mode.
    let mut subst = Substitution::new();
    assert!(!match_pattern(&pattern, &instance, &mut subst));

    // Two-way unification of the same pair succeeds.
    assert!(unify(&pattern, &instance, &mut subst));
  }

  #[test]
  fn one_way_match_binds_pattern_variables_to_instance_variables() {
    let f = setup();
    let x = f.variable("x");
    let q = f.variable("q");
    let pattern = inh(&f, &f.atom("robin"), &x);
    let instance = inh(&f, &f.atom("robin"), &q);

    let mut subst = Substitution::new();
    assert!(match_pattern(&pattern, &instance, &mut subst));
    assert_eq!(subst.lookup(x.name()).unwrap().name(), q.name());
  }

  #[test]
  fn commutative_components_unify_across_positions() {
    let f = setup();
    let x = f.variable("x");
    // Canonical order sorts components by name, so the variable may land on either side.
    let pattern = f
      .compound(Operator::Similarity, vec![f.atom("robin"), x.clone()])
      .unwrap();
    let instance = f
      .compound(Operator::Similarity, vec![f.atom("robin"), f.atom("swan")])
      .unwrap();

    let mut subst = Substitution::new();
    assert!(unify(&pattern, &instance, &mut subst));
    assert_eq!(subst.lookup(x.name()).unwrap().name().as_str(), "swan");
  }

  #[test]
  fn failed_unification_restores_the_substitution() {
    let f = setup();
    let x = f.variable("x");
    let y = f.variable("y");
    let pattern = f
      .compound(Operator::Product, vec![x.clone(), y.clone(), f.atom("z")])
      .unwrap();
    let instance = f
      .compound(Operator::Product, vec![f.atom("a"), f.atom("b"), f.atom("w")])
      .unwrap();

    let mut subst = Substitution::new();
    assert!(!unify(&pattern, &instance, &mut subst));
    // The partial bindings of ?x and ?y were rolled back.
    assert!(subst.is_empty());
  }

  #[test]
  fn apply_reinterns_through_the_factory() {
    let f = setup();
    let x = f.variable("x");
    let pattern = inh(&f, &x, &f.atom("bird"));
    let mut subst = Substitution::new();
    subst.bind(x.name(), f.atom("robin"));

    let applied = apply(&pattern, &subst, &f);
    let direct = inh(&f, &f.atom("robin"), &f.atom("bird"));
    assert!(Arc::ptr_eq(&applied, &direct));
  }

  #[test]
  fn apply_collapses_statements_that_become_reflexive() {
    let f = setup();
    let x = f.variable("x");
    let pattern = inh(&f, &x, &f.atom("bird"));
    let mut subst = Substitution::new();
    subst.bind(x.name(), f.atom("bird"));

    let applied = apply(&pattern, &subst, &f);
    assert!(Arc::ptr_eq(&applied, &f.truth_atom()));
  }
}
