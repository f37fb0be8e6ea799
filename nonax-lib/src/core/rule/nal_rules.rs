/*!

The built-in syllogistic rule table.

Each entry names its premises as templates over the shared variables `?s`, `?p`, `?m`, its
conclusion, and the truth function that combines the premise truths. The first-figure syllogisms
appear in both premise orders where the truth function distinguishes them (deduction's does not;
analogy's does), so a pair fires regardless of which task was drawn as primary. The implication
connective gets counterparts of the three core syllogisms.

*/

use std::sync::Arc;

use crate::{
  api::{operator::Operator, term::TermPtr, term_factory::TermFactory},
  core::rule::{
    pattern_rule::{PatternRule, TruthFunction},
    Rule,
  },
};

fn statement(factory: &TermFactory, op: Operator, s: &TermPtr, p: &TermPtr) -> TermPtr {
  // Two-place statements over variables can't collapse, so construction is infallible.
  factory
    .compound(op, vec![s.clone(), p.clone()])
    .expect("statement template construction")
}

/// The standard table wrapped in the rule discriminant, ready for the processor.
pub fn standard_rule_set(factory: &TermFactory) -> Vec<Rule> {
  standard_rules(factory).into_iter().map(Rule::Pattern).collect()
}

/// The standard rule set the reasoner loads unless the host supplies its own.
pub fn standard_rules(factory: &TermFactory) -> Vec<Arc<PatternRule>> {
  let s = factory.variable("s");
  let p = factory.variable("p");
  let m = factory.variable("m");

  let inh = |a: &TermPtr, b: &TermPtr| statement(factory, Operator::Inheritance, a, b);
  let sim = |a: &TermPtr, b: &TermPtr| statement(factory, Operator::Similarity, a, b);
  let imp = |a: &TermPtr, b: &TermPtr| statement(factory, Operator::Implication, a, b);

  vec![
    // {<M --> P>, <S --> M>} ⊢ <S --> P>
    Arc::new(PatternRule::new(
      "deduction",
      vec![inh(&m, &p), inh(&s, &m)],
      inh(&s, &p),
      TruthFunction::Deduction,
    )),
    // Same figure with the premise roles swapped; deduction's truth function is symmetric.
    Arc::new(PatternRule::new(
      "deduction-exchanged",
      vec![inh(&s, &m), inh(&m, &p)],
      inh(&s, &p),
      TruthFunction::Deduction,
    )),
    // {<P --> M>, <S --> M>} ⊢ <S --> P>
    Arc::new(PatternRule::new(
      "abduction",
      vec![inh(&p, &m), inh(&s, &m)],
      inh(&s, &p),
      TruthFunction::Abduction,
    )),
    // {<M --> P>, <M --> S>} ⊢ <S --> P>
    Arc::new(PatternRule::new(
      "induction",
      vec![inh(&m, &p), inh(&m, &s)],
      inh(&s, &p),
      TruthFunction::Induction,
    )),
    // {<P --> M>, <M --> S>} ⊢ <S --> P>
    Arc::new(PatternRule::new(
      "exemplification",
      vec![inh(&p, &m), inh(&m, &s)],
      inh(&s, &p),
      TruthFunction::Exemplification,
    )),
    // {<M --> P>, <S <-> M>} ⊢ <S --> P>
    Arc::new(PatternRule::new(
      "analogy",
      vec![inh(&m, &p), sim(&s, &m)],
      inh(&s, &p),
      TruthFunction::Analogy,
    )),
    // Similarity drawn as primary; the analogy truth function is order-sensitive.
    Arc::new(PatternRule::new(
      "analogy-exchanged",
      vec![sim(&s, &m), inh(&m, &p)],
      inh(&s, &p),
      TruthFunction::AnalogyExchanged,
    )),
    // {<M <-> P>, <S <-> M>} ⊢ <S <-> P>
    Arc::new(PatternRule::new(
      "resemblance",
      vec![sim(&m, &p), sim(&s, &m)],
      sim(&s, &p),
      TruthFunction::Resemblance,
    )),
    // {<M --> P>, <M --> S>} ⊢ <S <-> P>
    Arc::new(PatternRule::new(
      "comparison",
      vec![inh(&m, &p), inh(&m, &s)],
      sim(&s, &p),
      TruthFunction::Comparison,
    )),
    // {<P --> S>} ⊢ <S --> P>
    Arc::new(PatternRule::new(
      "conversion",
      vec![inh(&p, &s)],
      inh(&s, &p),
      TruthFunction::Conversion,
    )),
    // Compositional rules: a shared subject composes the predicates.
    // {<M --> P>, <M --> S>} ⊢ <M --> (P & S)>
    Arc::new(PatternRule::new(
      "intersection-composition",
      vec![inh(&m, &p), inh(&m, &s)],
      statement(
        factory,
        Operator::Inheritance,
        &m,
        &factory
          .compound(Operator::IntersectionInt, vec![p.clone(), s.clone()])
          .expect("intersection template construction"),
      ),
      TruthFunction::Intersection,
    )),
    // {<M --> P>, <M --> S>} ⊢ <M --> (P | S)>
    Arc::new(PatternRule::new(
      "union-composition",
      vec![inh(&m, &p), inh(&m, &s)],
      statement(
        factory,
        Operator::Inheritance,
        &m,
        &factory
          .compound(Operator::IntersectionExt, vec![p.clone(), s.clone()])
          .expect("union template construction"),
      ),
      TruthFunction::Union,
    )),
    // Implication counterparts of the core syllogisms.
    Arc::new(PatternRule::new(
      "implication-deduction",
      vec![imp(&m, &p), imp(&s, &m)],
      imp(&s, &p),
      TruthFunction::Deduction,
    )),
    Arc::new(PatternRule::new(
      "implication-abduction",
      vec![imp(&p, &m), imp(&s, &m)],
      imp(&s, &p),
      TruthFunction::Abduction,
    )),
    Arc::new(PatternRule::new(
      "implication-induction",
      vec![imp(&m, &p), imp(&m, &s)],
      imp(&s, &p),
      TruthFunction::Induction,
    )),
  ]
}
