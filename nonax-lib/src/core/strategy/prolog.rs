/*!

A resolution-style backward chainer over the belief store.

The strategy compiles memory into a predicate-indexed knowledge base: implication beliefs become
clauses (the antecedent, flattened across conjunction, is the body; the consequent is the head),
and every other belief becomes a fact. Question primaries are then answered by depth-bounded
SLD resolution with unification, standardizing clause variables apart on every use, cut off after
`max_solutions` answers. Ground answers come back as candidate secondary premises.

A small registry of builtin functors covers arithmetic and comparison: `+ - * / < <= > >= = \=`
and the `is/2` evaluator. Builtins are spelled as operation compounds whose first component
names the functor, e.g. `(^ is ?x (^ + 1 2))`.

*/

use std::collections::HashMap;

use nonax_abs::{debug, IString};

use crate::{
  api::{
    operator::Operator,
    term::{TermData, TermPtr},
    term_factory::TermFactory,
  },
  core::{
    error::ReasonerError,
    strategy::{Candidate, CandidateKind, FormationStrategy, StrategyContext},
    substitution::Substitution,
    task::{Punctuation, Task},
    unifier,
  },
};

/// Priority assigned to backward-chained answers, before the strategy multiplier.
const ANSWER_PRIORITY: f32 = 0.75;

/// Beliefs below this frequency don't assert their term as a fact.
const FACT_FREQUENCY_FLOOR: f32 = 0.5;

type ClauseKey = (IString, usize);

#[derive(Clone)]
struct Clause {
  head: TermPtr,
  body: Vec<TermPtr>,
}

#[derive(Default)]
struct KnowledgeBase {
  clauses: HashMap<ClauseKey, Vec<Clause>>,
}

impl KnowledgeBase {
  fn add(&mut self, clause: Clause) {
    if let Some(key) = functor_key(&clause.head) {
      self.clauses.entry(key).or_default().push(clause);
    }
  }

  fn matching(&self, goal: &TermPtr) -> &[Clause] {
    functor_key(goal)
      .and_then(|key| self.clauses.get(&key))
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }
}

/// The index key of a term: predicate name and arity for operation compounds, operator glyph
/// and arity for other compounds, the name itself for atoms. Variables are unindexable.
fn functor_key(term: &TermPtr) -> Option<ClauseKey> {
  match term.data() {
    TermData::Atom => Some((term.name(), 0)),
    TermData::Variable => None,
    TermData::Compound { op: Operator::Operation, components } => {
      let functor = components.first()?;
      if functor.is_atom() {
        Some((functor.name(), components.len() - 1))
      } else {
        None
      }
    }
    TermData::Compound { op, components } => {
      Some((IString::from(op.glyph()), components.len()))
    }
  }
}

/// The functor name of a builtin operation compound, if it is one.
fn builtin_functor(term: &TermPtr) -> Option<&'static str> {
  if term.operator() != Some(Operator::Operation) {
    return None;
  }
  let functor = term.components().first()?;
  if !functor.is_atom() {
    return None;
  }
  match functor.name().as_str() {
    "=" => Some("="),
    "\\=" => Some("\\="),
    "<" => Some("<"),
    "<=" => Some("<="),
    ">" => Some(">"),
    ">=" => Some(">="),
    "is" => Some("is"),
    _ => None,
  }
}

struct Solver<'a> {
  kb:             &'a KnowledgeBase,
  factory:        &'a TermFactory,
  max_depth:      u32,
  max_solutions:  usize,
  rename_counter: u64,
  solutions:      Vec<TermPtr>,
}

impl<'a> Solver<'a> {
  fn new(kb: &'a KnowledgeBase, factory: &'a TermFactory, max_depth: u32, max_solutions: usize) -> Solver<'a> {
    Solver {
      kb,
      factory,
      max_depth,
      max_solutions,
      rename_counter: 0,
      solutions: Vec::new(),
    }
  }

  fn run(mut self, goal: &TermPtr) -> Vec<TermPtr> {
    let mut subst = Substitution::new();
    self.solve(&mut vec![goal.clone()], 0, &mut subst, goal);
    self.solutions
  }

  fn solve(
    &mut self,
    goals: &mut Vec<TermPtr>,
    depth: u32,
    subst: &mut Substitution,
    top_goal: &TermPtr,
  ) {
    if self.solutions.len() >= self.max_solutions || depth > self.max_depth {
      return;
    }

    let Some(goal) = goals.pop() else {
      let answer = unifier::apply(top_goal, subst, self.factory);
      if !self.solutions.iter().any(|s| s.name() == answer.name()) {
        self.solutions.push(answer);
      }
      return;
    };

    if let Some(functor) = builtin_functor(&goal) {
      let mark = subst.mark();
      if self.eval_builtin(functor, &goal, subst) {
        self.solve(goals, depth, subst, top_goal);
      }
      subst.undo_to(mark);
      goals.push(goal);
      return;
    }

    // Resolve against the instantiated goal so the index sees bound functors.
    let instantiated = unifier::apply(&goal, subst, self.factory);

    for clause in self.kb.matching(&instantiated).to_vec() {
      if self.solutions.len() >= self.max_solutions {
        break;
      }
      let renamed = self.standardize_apart(&clause);
      let mark = subst.mark();
      if unifier::unify(&instantiated, &renamed.head, subst) {
        let before = goals.len();
        // Body goals solve left to right; they were pushed in reverse.
        for body_goal in renamed.body.iter().rev() {
          goals.push(body_goal.clone());
        }
        self.solve(goals, depth + 1, subst, top_goal);
        goals.truncate(before);
      }
      subst.undo_to(mark);
    }

    goals.push(goal);
  }

  /// Fresh variable names for one clause use.
  fn standardize_apart(&mut self, clause: &Clause) -> Clause {
    self.rename_counter += 1;
    let suffix = self.rename_counter;
    Clause {
      head: self.rename(&clause.head, suffix),
      body: clause.body.iter().map(|g| self.rename(g, suffix)).collect(),
    }
  }

  fn rename(&self, term: &TermPtr, suffix: u64) -> TermPtr {
    match term.data() {
      TermData::Atom => term.clone(),
      TermData::Variable => {
        let bare = term.name().as_str().trim_start_matches('?');
        self.factory.variable(&format!("{bare}_r{suffix}"))
      }
      TermData::Compound { op, components } => {
        let renamed: Vec<TermPtr> = components.iter().map(|c| self.rename(c, suffix)).collect();
        self
          .factory
          .compound(*op, renamed)
          .unwrap_or_else(|_| term.clone())
      }
    }
  }

  fn eval_builtin(&self, functor: &str, goal: &TermPtr, subst: &mut Substitution) -> bool {
    let args = &goal.components()[1..];
    if args.len() != 2 {
      return false;
    }

    match functor {
      "=" => unifier::unify(&args[0], &args[1], subst),
      "\\=" => {
        let mark = subst.mark();
        let unifies = unifier::unify(&args[0], &args[1], subst);
        subst.undo_to(mark);
        !unifies
      }
      "is" => {
        let Some(value) = self.eval_arith(&args[1], subst) else { return false };
        let value_atom = self.factory.atom(&format_number(value));
        unifier::unify(&args[0], &value_atom, subst)
      }
      comparison => {
        let (Some(lhs), Some(rhs)) = (
          self.eval_arith(&args[0], subst),
          self.eval_arith(&args[1], subst),
        ) else {
          return false;
        };
        match comparison {
          "<" => lhs < rhs,
          "<=" => lhs <= rhs,
          ">" => lhs > rhs,
          ">=" => lhs >= rhs,
          _ => false,
        }
      }
    }
  }

  /// Arithmetic over numeric atoms and the four operation functors.
  fn eval_arith(&self, term: &TermPtr, subst: &Substitution) -> Option<f64> {
    match term.data() {
      TermData::Atom => term.name().as_str().parse::<f64>().ok(),
      TermData::Variable => {
        let bound = subst.lookup(term.name())?.clone();
        self.eval_arith(&bound, subst)
      }
      TermData::Compound { op: Operator::Operation, components } => {
        if components.len() != 3 || !components[0].is_atom() {
          return None;
        }
        let lhs = self.eval_arith(&components[1], subst)?;
        let rhs = self.eval_arith(&components[2], subst)?;
        match components[0].name().as_str() {
          "+" => Some(lhs + rhs),
          "-" => Some(lhs - rhs),
          "*" => Some(lhs * rhs),
          "/" => {
            if rhs.abs() < f64::EPSILON {
              None
            } else {
              Some(lhs / rhs)
            }
          }
          _ => None,
        }
      }
      _ => None,
    }
  }
}

fn format_number(value: f64) -> String {
  if value.fract() == 0.0 && value.abs() < 1e15 {
    format!("{}", value as i64)
  } else {
    format!("{value}")
  }
}

pub struct PrologStrategy {
  enabled:       bool,
  base_priority: f32,
}

impl Default for PrologStrategy {
  fn default() -> Self {
    PrologStrategy { enabled: true, base_priority: 1.0 }
  }
}

impl PrologStrategy {
  pub fn new() -> PrologStrategy {
    PrologStrategy::default()
  }

  /// Compiles the current belief store into an indexed knowledge base.
  fn compile(&self, ctx: &StrategyContext) -> Result<KnowledgeBase, ReasonerError> {
    let mut kb = KnowledgeBase::default();

    for concept in ctx.memory.concepts() {
      let tasks = concept
        .try_tasks(None)
        .map_err(|e| ReasonerError::PremiseSource(e.to_string()))?;

      for task in tasks {
        let Some(truth) = task.truth() else { continue };
        if truth.f < FACT_FREQUENCY_FLOOR {
          continue;
        }
        let term = task.term();
        if term.operator() == Some(Operator::Implication) {
          let antecedent = &term.components()[0];
          let consequent = term.components()[1].clone();
          let body = if antecedent.operator() == Some(Operator::Conjunction) {
            antecedent.components().to_vec()
          } else {
            vec![antecedent.clone()]
          };
          kb.add(Clause { head: consequent, body });
        } else {
          kb.add(Clause { head: term.clone(), body: Vec::new() });
        }
      }
    }

    Ok(kb)
  }
}

impl FormationStrategy for PrologStrategy {
  fn name(&self) -> &'static str {
    "prolog"
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
    // Backward chaining answers questions; other punctuation passes through untouched.
    if primary.punctuation() != Punctuation::Question {
      return Ok(Vec::new());
    }

    let kb = self.compile(ctx)?;
    let solver = Solver::new(
      &kb,
      ctx.factory,
      ctx.config.prolog_max_depth,
      ctx.config.max_solutions,
    );
    let answers = solver.run(primary.term());
    debug!(2, "prolog answered `{}` with {} solution(s)", primary.term(), answers.len());

    Ok(
      answers
        .into_iter()
        .map(|answer| {
          Candidate::from_term(answer, ANSWER_PRIORITY * self.base_priority, CandidateKind::PrologDerived)
        })
        .collect(),
    )
  }
}
