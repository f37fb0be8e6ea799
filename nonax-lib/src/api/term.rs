/*!

Terms of the algebra: atoms, variables, and compounds.

A `Term` is an immutable record of its canonical name, its structure, and its cached structural
complexity. Terms are constructed exclusively through the [`TermFactory`](crate::api::TermFactory),
which normalizes compounds and interns the result, so two structurally equal terms constructed
through the same factory are the same allocation while they remain cached. Equality and hashing
go through the interned canonical name, which is an O(1) comparison and — unlike raw pointer
identity — stays correct across cache eviction boundaries.

*/

use std::{
  cmp::Ordering,
  fmt::{Debug, Display, Formatter},
  hash::{Hash, Hasher},
  sync::Arc,
};

use nonax_abs::IString;

use crate::api::operator::Operator;

pub type TermPtr   = Arc<Term>;
pub type MaybeTerm = Option<TermPtr>;

/// The structural variant of a term.
#[derive(Clone)]
pub enum TermData {
  /// A leaf with a name and no components.
  Atom,
  /// A placeholder that may bind during unification. The canonical spelling is `?name`.
  Variable,
  /// A connective applied to an ordered component list.
  Compound {
    op:         Operator,
    components: Vec<TermPtr>,
  },
}

pub struct Term {
  /// Canonical name; doubles as the interning key.
  name:       IString,
  data:       TermData,
  /// 1 + child count + sum of child complexities.
  complexity: u32,
}

impl Term {
  /// Only the factory constructs terms; everything else holds `TermPtr` handles.
  pub(crate) fn new(name: IString, data: TermData, complexity: u32) -> Term {
    Term { name, data, complexity }
  }

  #[inline(always)]
  pub fn name(&self) -> IString {
    self.name
  }

  #[inline(always)]
  pub fn data(&self) -> &TermData {
    &self.data
  }

  #[inline(always)]
  pub fn complexity(&self) -> u32 {
    self.complexity
  }

  #[inline(always)]
  pub fn is_atom(&self) -> bool {
    matches!(self.data, TermData::Atom)
  }

  #[inline(always)]
  pub fn is_variable(&self) -> bool {
    matches!(self.data, TermData::Variable)
  }

  #[inline(always)]
  pub fn is_compound(&self) -> bool {
    matches!(self.data, TermData::Compound { .. })
  }

  /// The head operator, or `None` for atoms and variables.
  #[inline(always)]
  pub fn operator(&self) -> Option<Operator> {
    match &self.data {
      TermData::Compound { op, .. } => Some(*op),
      _ => None,
    }
  }

  /// Component list; empty for atoms and variables.
  pub fn components(&self) -> &[TermPtr] {
    match &self.data {
      TermData::Compound { components, .. } => components,
      _ => &[],
    }
  }

  /// Number of components.
  #[inline(always)]
  pub fn arity(&self) -> usize {
    self.components().len()
  }

  /// True when this is a two-place statement compound.
  pub fn is_statement(&self) -> bool {
    match self.operator() {
      Some(op) => op.is_statement() && self.arity() == 2,
      None => false,
    }
  }

  /// Subject of a statement compound.
  pub fn subject(&self) -> MaybeTerm {
    if self.is_statement() {
      Some(self.components()[0].clone())
    } else {
      None
    }
  }

  /// Predicate of a statement compound.
  pub fn predicate(&self) -> MaybeTerm {
    if self.is_statement() {
      Some(self.components()[1].clone())
    } else {
      None
    }
  }

  /// Whether `name` occurs as a variable anywhere in this term. This is the occurs-check
  /// predicate the unifier uses.
  pub fn contains_variable(&self, name: IString) -> bool {
    match &self.data {
      TermData::Atom => false,
      TermData::Variable => self.name == name,
      TermData::Compound { components, .. } => {
        components.iter().any(|c| c.contains_variable(name))
      }
    }
  }

  /// True when no variable occurs anywhere in the term.
  pub fn is_ground(&self) -> bool {
    match &self.data {
      TermData::Atom => true,
      TermData::Variable => false,
      TermData::Compound { components, .. } => components.iter().all(|c| c.is_ground()),
    }
  }

  /// Collects the names of all variables occurring in the term, in first-occurrence order.
  pub fn variables(&self) -> Vec<IString> {
    let mut found = Vec::new();
    self.collect_variables(&mut found);
    found
  }

  fn collect_variables(&self, found: &mut Vec<IString>) {
    match &self.data {
      TermData::Atom => {}
      TermData::Variable => {
        if !found.contains(&self.name) {
          found.push(self.name);
        }
      }
      TermData::Compound { components, .. } => {
        for c in components {
          c.collect_variables(found);
        }
      }
    }
  }

  /// Whether `other` occurs as this term or one of its (transitive) components.
  pub fn contains_term(&self, other: &Term) -> bool {
    if self.name == other.name {
      return true;
    }
    self.components().iter().any(|c| c.contains_term(other))
  }
}

impl PartialEq for Term {
  #[inline(always)]
  fn eq(&self, other: &Self) -> bool {
    self.name == other.name
  }
}

impl Eq for Term {}

impl Hash for Term {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.name.hash(state)
  }
}

impl PartialOrd for Term {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Term {
  fn cmp(&self, other: &Self) -> Ordering {
    self.name.as_str().cmp(other.name.as_str())
  }
}

impl Display for Term {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name.as_str())
  }
}

// Terms format the same under `Debug` and `Display`; the canonical name already is the full
// structural spelling.
impl Debug for Term {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Display::fmt(self, f)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::TermFactory;

  #[test]
  fn atoms_have_complexity_one() {
    let factory = TermFactory::new_default();
    let a = factory.atom("bird");
    assert!(a.is_atom());
    assert_eq!(a.complexity(), 1);
    assert_eq!(a.arity(), 0);
  }

  #[test]
  fn statement_accessors() {
    let factory = TermFactory::new_default();
    let s = factory
      .compound(
        Operator::Inheritance,
        vec![factory.atom("robin"), factory.atom("bird")],
      )
      .unwrap();
    assert!(s.is_statement());
    assert_eq!(s.subject().unwrap().name().as_str(), "robin");
    assert_eq!(s.predicate().unwrap().name().as_str(), "bird");
  }

  #[test]
  fn variable_occurrence_is_found_at_depth() {
    let factory = TermFactory::new_default();
    let x = factory.variable("x");
    let inner = factory
      .compound(Operator::Product, vec![factory.atom("a"), x.clone()])
      .unwrap();
    let outer = factory
      .compound(Operator::Inheritance, vec![inner, factory.atom("b")])
      .unwrap();
    assert!(outer.contains_variable(x.name()));
    assert!(!outer.is_ground());
    assert_eq!(outer.variables(), vec![x.name()]);
  }
}
