/*!

The memory contract the reasoner consumes, and a reference implementation.

The engine never owns long-term memory; it reads premises through the `MemoryView` trait and
leaves storage policy to the host. `SimpleMemory` is the in-crate reference implementation: a
flat concept table keyed by canonical term name, sufficient for tests, demos, and small hosts.
No lifetime guarantees attach to returned task handles beyond the consuming iteration — tasks
are values and clone cheaply.

*/

use std::{
  collections::HashMap,
  sync::{Arc, RwLock},
};

use nonax_abs::IString;

use crate::{
  api::term::TermPtr,
  core::{error::ReasonerError, task::Task},
};

pub trait ConceptView: Send + Sync {
  fn term(&self) -> TermPtr;

  /// Tasks filed under this concept, newest last. `limit` truncates.
  fn tasks(&self, limit: Option<usize>) -> Vec<Task>;

  /// Fallible task read for memories with an error channel (remote stores, corrupt entries).
  /// The premise source skips a concept whose read fails and keeps streaming.
  fn try_tasks(&self, limit: Option<usize>) -> Result<Vec<Task>, ReasonerError> {
    Ok(self.tasks(limit))
  }

  /// Judgment tasks only.
  fn beliefs(&self, limit: Option<usize>) -> Vec<Task> {
    let mut beliefs: Vec<Task> = self
      .tasks(None)
      .into_iter()
      .filter(Task::is_judgment)
      .collect();
    if let Some(limit) = limit {
      beliefs.truncate(limit);
    }
    beliefs
  }
}

pub trait MemoryView: Send + Sync {
  /// All concepts, in a stable iteration order.
  fn concepts(&self) -> Vec<Arc<dyn ConceptView>>;

  /// Concept lookup by canonical term name.
  fn concept(&self, name: IString) -> Option<Arc<dyn ConceptView>>;

  /// Tasks of the current working set, if the memory maintains one. Default: none.
  fn focus_tasks(&self, _limit: usize) -> Vec<Task> {
    Vec::new()
  }
}

pub struct SimpleConcept {
  term:  TermPtr,
  tasks: RwLock<Vec<Task>>,
}

impl SimpleConcept {
  pub fn new(term: TermPtr) -> SimpleConcept {
    SimpleConcept { term, tasks: RwLock::new(Vec::new()) }
  }

  pub fn add_task(&self, task: Task) {
    self.tasks.write().unwrap_or_else(|e| e.into_inner()).push(task);
  }
}

impl ConceptView for SimpleConcept {
  fn term(&self) -> TermPtr {
    self.term.clone()
  }

  fn tasks(&self, limit: Option<usize>) -> Vec<Task> {
    let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
    match limit {
      Some(limit) => tasks.iter().take(limit).cloned().collect(),
      None => tasks.clone(),
    }
  }
}

#[derive(Default)]
struct ConceptTable {
  by_name: HashMap<IString, Arc<SimpleConcept>>,
  /// Insertion order, so `concepts()` iterates deterministically.
  order:   Vec<IString>,
}

/// Reference `MemoryView`: a concept per distinct task term.
#[derive(Default)]
pub struct SimpleMemory {
  table: RwLock<ConceptTable>,
}

impl SimpleMemory {
  pub fn new() -> SimpleMemory {
    SimpleMemory::default()
  }

  /// Files a task under the concept of its term, creating the concept on first sight.
  pub fn add_task(&self, task: Task) {
    let name = task.term().name();
    let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
    let concept = match table.by_name.get(&name) {
      Some(concept) => concept.clone(),
      None => {
        let concept = Arc::new(SimpleConcept::new(task.term().clone()));
        table.by_name.insert(name, concept.clone());
        table.order.push(name);
        concept
      }
    };
    concept.add_task(task);
  }

  pub fn concept_count(&self) -> usize {
    self.table.read().unwrap_or_else(|e| e.into_inner()).order.len()
  }
}

impl MemoryView for SimpleMemory {
  fn concepts(&self) -> Vec<Arc<dyn ConceptView>> {
    let table = self.table.read().unwrap_or_else(|e| e.into_inner());
    table
      .order
      .iter()
      .filter_map(|name| table.by_name.get(name))
      .map(|c| c.clone() as Arc<dyn ConceptView>)
      .collect()
  }

  fn concept(&self, name: IString) -> Option<Arc<dyn ConceptView>> {
    let table = self.table.read().unwrap_or_else(|e| e.into_inner());
    table.by_name.get(&name).map(|c| c.clone() as Arc<dyn ConceptView>)
  }
}
