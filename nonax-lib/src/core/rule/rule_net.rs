/*!

A discrimination net over pattern rules.

A discrimination net organizes the conditions of many rules into a tree so an input pair can be
classified against all of them at once. Here the discriminators are fixed and ordered: operator
of the primary, operator of the secondary, arity of the primary, arity of the secondary. Each
internal node branches on the next discriminator's value, with a separate wildcard child for
patterns that accept anything at that position; the leaves hold the rule lists for their
signature path. Compilation is one-shot and deterministic; execution walks exact and wildcard
children side by side and attempts unification only on the rules of reachable leaves.

*/

use std::{collections::HashMap, sync::Arc};

use nonax_abs::debug;

use crate::{
  api::{operator::Operator, term_factory::TermFactory},
  core::{
    rule::pattern_rule::{Discriminator, PatternRule},
    task::Task,
  },
};

/// The value an *instance* exposes at one discriminator position. `None` at an operator
/// position means the instance is not a compound (or there is no secondary); `None` at an
/// arity position likewise.
type InstanceValue = Option<Discriminator>;

const DISCRIMINATOR_COUNT: usize = 4;

#[derive(Default)]
struct TreeNode {
  children: HashMap<Discriminator, TreeNode>,
  wildcard: Option<Box<TreeNode>>,
  /// Populated at depth `DISCRIMINATOR_COUNT` only.
  rules:    Vec<Arc<PatternRule>>,
}

impl TreeNode {
  fn insert(&mut self, path: &[Discriminator], rule: Arc<PatternRule>) {
    match path.split_first() {
      None => self.rules.push(rule),
      Some((first, rest)) => match first {
        Discriminator::Wildcard => {
          self
            .wildcard
            .get_or_insert_with(Default::default)
            .insert(rest, rule);
        }
        exact => {
          self.children.entry(*exact).or_default().insert(rest, rule);
        }
      },
    }
  }

  fn collect<'a>(&'a self, values: &[InstanceValue], found: &mut Vec<&'a Arc<PatternRule>>) {
    match values.split_first() {
      None => found.extend(self.rules.iter()),
      Some((first, rest)) => {
        // The exact-valued child, when the instance has a value at this position…
        if let Some(value) = first {
          if let Some(child) = self.children.get(value) {
            child.collect(rest, found);
          }
        }
        // …and always the wildcard child.
        if let Some(wildcard) = &self.wildcard {
          wildcard.collect(rest, found);
        }
      }
    }
  }
}

pub struct RuleNet {
  root:       TreeNode,
  rule_count: usize,
}

impl RuleNet {
  /// One-shot compilation: O(rules × discriminators).
  pub fn compile(rules: &[Arc<PatternRule>]) -> RuleNet {
    let mut root = TreeNode::default();
    for rule in rules {
      root.insert(&rule.discriminators(), rule.clone());
    }
    debug!(2, "compiled rule net over {} pattern rule(s)", rules.len());
    RuleNet { root, rule_count: rules.len() }
  }

  pub fn rule_count(&self) -> usize {
    self.rule_count
  }

  /// The rules whose discriminator signature admits this pair, in compilation order per leaf.
  pub fn candidates(&self, primary: &Task, secondary: Option<&Task>) -> Vec<&Arc<PatternRule>> {
    let values = instance_values(primary, secondary);
    let mut found = Vec::new();
    self.root.collect(&values, &mut found);
    found
  }

  /// Full execution on a pair: walk, unify, emit. Derivations deeper than `max_depth` are
  /// silently dropped.
  pub fn execute(
    &self,
    primary: &Task,
    secondary: Option<&Task>,
    factory: &TermFactory,
    max_depth: u32,
  ) -> Vec<Task> {
    let mut derivations = Vec::new();
    for rule in self.candidates(primary, secondary) {
      // A binary rule can't fire without a secondary; a single-premise rule ignores it.
      let secondary_for_rule = if rule.is_single_premise() { None } else { secondary };
      if !rule.is_single_premise() && secondary_for_rule.is_none() {
        continue;
      }
      if let Some(derived) = rule.try_apply(primary, secondary_for_rule, factory) {
        if derived.stamp().depth() > max_depth {
          continue;
        }
        derivations.push(derived);
      }
    }
    derivations
  }
}

fn instance_values(primary: &Task, secondary: Option<&Task>) -> [InstanceValue; DISCRIMINATOR_COUNT] {
  [
    instance_op(Some(primary)),
    instance_op(secondary),
    instance_arity(Some(primary)),
    instance_arity(secondary),
  ]
}

fn instance_op(task: Option<&Task>) -> InstanceValue {
  task
    .and_then(|t| t.term().operator())
    .map(Discriminator::Op)
}

fn instance_arity(task: Option<&Task>) -> InstanceValue {
  task.and_then(|t| {
    if t.term().is_compound() {
      Some(Discriminator::Arity(t.term().arity()))
    } else {
      None
    }
  })
}
