/*!

The closed operator vocabulary of the term algebra.

Operators can be thought of as names to which structural axioms are attached: commutative
operators keep their components sorted, associative operators flatten nested applications of
themselves, idempotent operators drop duplicate components. The normalization pipeline in the
term factory consults these attributes so that every compound is constructed in canonical form
and downstream rule matching never sees two spellings of the same term.

*/

use std::fmt::{Display, Formatter};

use enumflags2::{bitflags, make_bitflags, BitFlags};

pub type OperatorAttributes = BitFlags<OperatorAttribute, u8>;

/// Structural axioms and roles an operator can carry.
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperatorAttribute {
  /// Components are unordered; canonical form sorts them by canonical name.
  Commutative,
  /// Nested applications of the same operator flatten into one.
  Associative,
  /// Duplicate components collapse to one.
  Idempotent,
  /// A two-place statement connective relating a subject and a predicate.
  Statement,
  /// Premise formation may decompose compounds of this operator into their components.
  Decomposable,
}

/// Every connective the term algebra admits. The vocabulary is closed: terms are either atoms,
/// variables, or compounds headed by one of these.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
  /// `-->`
  Inheritance,
  /// `<->`
  Similarity,
  /// `==>`
  Implication,
  /// `<=>`
  Equivalence,
  /// `&` intensional intersection
  IntersectionInt,
  /// `|` extensional intersection
  IntersectionExt,
  /// `&&`
  Conjunction,
  /// `||`
  Disjunction,
  /// `&/` sequential conjunction
  Sequence,
  /// `*` product
  Product,
  /// `{}` extensional set
  SetExt,
  /// `[]` intensional set
  SetInt,
  /// `/` extensional image
  ImageExt,
  /// `\` intensional image
  ImageInt,
  /// `--`
  Negation,
  /// `^` operation/predicate form
  Operation,
}

impl Operator {
  /// The operator's glyph as it appears in canonical names.
  pub fn glyph(self) -> &'static str {
    match self {
      Operator::Inheritance     => "-->",
      Operator::Similarity      => "<->",
      Operator::Implication     => "==>",
      Operator::Equivalence     => "<=>",
      Operator::IntersectionInt => "&",
      Operator::IntersectionExt => "|",
      Operator::Conjunction     => "&&",
      Operator::Disjunction     => "||",
      Operator::Sequence        => "&/",
      Operator::Product         => "*",
      Operator::SetExt          => "{}",
      Operator::SetInt          => "[]",
      Operator::ImageExt        => "/",
      Operator::ImageInt        => "\\",
      Operator::Negation        => "--",
      Operator::Operation       => "^",
    }
  }

  /// Parses a glyph back into an operator.
  pub fn from_glyph(glyph: &str) -> Option<Operator> {
    let op = match glyph {
      "-->" => Operator::Inheritance,
      "<->" => Operator::Similarity,
      "==>" => Operator::Implication,
      "<=>" => Operator::Equivalence,
      "&"   => Operator::IntersectionInt,
      "|"   => Operator::IntersectionExt,
      "&&"  => Operator::Conjunction,
      "||"  => Operator::Disjunction,
      "&/"  => Operator::Sequence,
      "*"   => Operator::Product,
      "{}"  => Operator::SetExt,
      "[]"  => Operator::SetInt,
      "/"   => Operator::ImageExt,
      "\\"  => Operator::ImageInt,
      "--"  => Operator::Negation,
      "^"   => Operator::Operation,
      _ => return None,
    };
    Some(op)
  }

  pub fn attributes(self) -> OperatorAttributes {
    match self {
      Operator::Inheritance
      | Operator::Implication => make_bitflags!(OperatorAttribute::{Statement | Decomposable}),

      Operator::Similarity
      | Operator::Equivalence => {
        make_bitflags!(OperatorAttribute::{Commutative | Statement | Decomposable})
      }

      Operator::IntersectionInt
      | Operator::IntersectionExt => {
        make_bitflags!(OperatorAttribute::{Commutative | Associative | Idempotent})
      }

      Operator::Conjunction => {
        make_bitflags!(OperatorAttribute::{Commutative | Associative | Idempotent | Decomposable})
      }

      Operator::Disjunction => {
        make_bitflags!(OperatorAttribute::{Commutative | Associative | Idempotent})
      }

      Operator::Sequence => make_bitflags!(OperatorAttribute::{Associative}),

      Operator::Product => make_bitflags!(OperatorAttribute::{Decomposable}),

      Operator::SetExt => {
        make_bitflags!(OperatorAttribute::{Commutative | Idempotent | Decomposable})
      }

      Operator::SetInt => make_bitflags!(OperatorAttribute::{Commutative | Idempotent}),

      Operator::ImageExt
      | Operator::ImageInt
      | Operator::Negation
      | Operator::Operation => BitFlags::empty(),
    }
  }

  #[inline(always)]
  pub fn is(self, attribute: OperatorAttribute) -> bool {
    self.attributes().contains(attribute)
  }

  #[inline(always)]
  pub fn is_statement(self) -> bool {
    self.is(OperatorAttribute::Statement)
  }

  #[inline(always)]
  pub fn is_commutative(self) -> bool {
    self.is(OperatorAttribute::Commutative)
  }

  #[inline(always)]
  pub fn is_associative(self) -> bool {
    self.is(OperatorAttribute::Associative)
  }

  #[inline(always)]
  pub fn is_idempotent(self) -> bool {
    self.is(OperatorAttribute::Idempotent)
  }

  #[inline(always)]
  pub fn is_decomposable(self) -> bool {
    self.is(OperatorAttribute::Decomposable)
  }
}

impl Display for Operator {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.glyph())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn glyphs_round_trip() {
    let all = [
      Operator::Inheritance,
      Operator::Similarity,
      Operator::Implication,
      Operator::Equivalence,
      Operator::IntersectionInt,
      Operator::IntersectionExt,
      Operator::Conjunction,
      Operator::Disjunction,
      Operator::Sequence,
      Operator::Product,
      Operator::SetExt,
      Operator::SetInt,
      Operator::ImageExt,
      Operator::ImageInt,
      Operator::Negation,
      Operator::Operation,
    ];
    for op in all {
      assert_eq!(Operator::from_glyph(op.glyph()), Some(op), "{op:?}");
    }
    assert_eq!(Operator::from_glyph("-->>"), None);
  }

  #[test]
  fn statement_connectives_are_flagged() {
    assert!(Operator::Inheritance.is_statement());
    assert!(Operator::Equivalence.is_statement());
    assert!(!Operator::Product.is_statement());
  }

  #[test]
  fn similarity_is_commutative_but_inheritance_is_not() {
    assert!(Operator::Similarity.is_commutative());
    assert!(!Operator::Inheritance.is_commutative());
  }

  #[test]
  fn sequence_is_associative_but_not_commutative() {
    assert!(Operator::Sequence.is_associative());
    assert!(!Operator::Sequence.is_commutative());
  }
}
