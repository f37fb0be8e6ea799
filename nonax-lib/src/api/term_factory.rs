/*!

Canonical construction, interning, and complexity metrics for all terms.

The factory is the only place terms come into existence. Compound construction runs a fixed
normalization pipeline — flatten associative operators, sort commutative component lists, dedupe
idempotent ones, collapse double negation and reflexive statements — and then interns the result
in an LRU cache keyed by canonical name. Structural equality thereby becomes a name comparison,
which takes a large constant factor out of unification and rule matching.

Eviction from the LRU is safe because downstream holders keep strong `Arc` references; an evicted
canonical name is simply re-created on its next request, producing a fresh allocation. Consumers
must therefore not assume pointer-identity stability across eviction boundaries; they compare by
canonical name or re-intern.

*/

use std::{
  collections::HashMap,
  num::NonZeroUsize,
  sync::{Arc, Mutex},
};

use lru::LruCache;
use nonax_abs::{join_iter, IString};

use crate::{
  api::{
    events::{Event, EventBus},
    operator::{Operator, OperatorAttribute},
    term::{Term, TermData, TermPtr},
    TRUE_ATOM_NAME,
  },
  core::error::ReasonerError,
};

struct FactoryCache {
  /// Interned terms keyed by canonical name.
  terms:      LruCache<IString, TermPtr>,
  /// Structural complexity per canonical name; evicted together with the term.
  complexity: HashMap<IString, u32>,
  /// Lookup counts per canonical name (the cognitive-diversity registry); evicted together
  /// with the term.
  usage:      HashMap<IString, u64>,
}

pub struct TermFactory {
  cache:  Mutex<FactoryCache>,
  events: EventBus,
}

impl TermFactory {
  pub fn new(capacity: usize, events: EventBus) -> TermFactory {
    let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
    TermFactory {
      cache: Mutex::new(FactoryCache {
        terms:      LruCache::new(capacity),
        complexity: HashMap::new(),
        usage:      HashMap::new(),
      }),
      events,
    }
  }

  /// A factory with the default cache capacity and a bus nobody listens on.
  pub fn new_default() -> Arc<TermFactory> {
    Arc::new(TermFactory::new(5000, EventBus::new()))
  }

  pub fn events(&self) -> &EventBus {
    &self.events
  }

  /// Interns an atom. Idempotent: the same name always yields the same handle while cached.
  pub fn atom(&self, name: &str) -> TermPtr {
    self.intern(IString::from(name), || (TermData::Atom, 1))
  }

  /// Interns a variable. Accepts the `?`, `#`, and `$` prefix spellings and canonicalizes all
  /// of them to `?name`.
  pub fn variable(&self, name: &str) -> TermPtr {
    let bare = name.trim_start_matches(['?', '#', '$']);
    let canonical = IString::from(format!("?{bare}").as_str());
    self.intern(canonical, || (TermData::Variable, 1))
  }

  /// The system atom reflexive statements collapse to.
  pub fn truth_atom(&self) -> TermPtr {
    self.atom(TRUE_ATOM_NAME)
  }

  /// Canonical compound construction. Normalizes, then interns.
  pub fn compound(
    &self,
    op: Operator,
    components: Vec<TermPtr>,
  ) -> Result<TermPtr, ReasonerError> {
    let mut components = components;

    if components.is_empty() {
      return Err(ReasonerError::InvalidTask(format!(
        "compound `{op}` with no components"
      )));
    }

    // Flatten nested applications of an associative operator.
    if op.is(OperatorAttribute::Associative) {
      let mut flattened: Vec<TermPtr> = Vec::with_capacity(components.len());
      for c in components {
        if c.operator() == Some(op) {
          flattened.extend(c.components().iter().cloned());
        } else {
          flattened.push(c);
        }
      }
      components = flattened;
    }

    // Idempotent operators drop duplicate components (first occurrence wins).
    if op.is(OperatorAttribute::Idempotent) {
      let mut seen: Vec<IString> = Vec::with_capacity(components.len());
      components.retain(|c| {
        if seen.contains(&c.name()) {
          false
        } else {
          seen.push(c.name());
          true
        }
      });
    }

    // Commutative operators sort components by canonical name.
    if op.is(OperatorAttribute::Commutative) {
      components.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
    }

    // A variadic compound reduced to a single component is that component.
    if components.len() == 1
      && (op.is(OperatorAttribute::Associative) || op.is(OperatorAttribute::Idempotent))
    {
      return Ok(components.pop().unwrap());
    }

    match op {
      Operator::Negation => {
        if components.len() != 1 {
          return Err(ReasonerError::InvalidTask(format!(
            "negation takes exactly one component, got {}",
            components.len()
          )));
        }
        // Double negation collapses.
        if components[0].operator() == Some(Operator::Negation) {
          return Ok(components[0].components()[0].clone());
        }
      }
      _ if op.is(OperatorAttribute::Statement) => {
        if components.len() != 2 {
          return Err(ReasonerError::InvalidTask(format!(
            "statement `{op}` takes exactly two components, got {}",
            components.len()
          )));
        }
        // Reflexive statements collapse to the system atom.
        if components[0].name() == components[1].name() {
          return Ok(self.truth_atom());
        }
      }
      _ => {}
    }

    let name = canonical_name(op, &components);
    let complexity =
      1 + components.len() as u32 + components.iter().map(|c| c.complexity()).sum::<u32>();

    Ok(self.intern(name, move || (TermData::Compound { op, components }, complexity)))
  }

  /// Structural complexity of a term. The metric is cached on the term itself; this accessor
  /// exists so callers holding only a name can still ask.
  pub fn cached_complexity(&self, name: IString) -> Option<u32> {
    let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
    cache.complexity.get(&name).copied()
  }

  /// Lookup count for a canonical name, from the diversity registry.
  pub fn usage_count(&self, name: IString) -> u64 {
    let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
    cache.usage.get(&name).copied().unwrap_or(0)
  }

  pub fn cache_len(&self) -> usize {
    let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
    cache.terms.len()
  }

  /// Whether a canonical name is currently interned. Does not touch recency.
  pub fn is_cached(&self, name: IString) -> bool {
    let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
    cache.terms.peek(&name).is_some()
  }

  /// Looks up or constructs the term for `name`. The critical section is a single LRU probe or
  /// a single insert.
  fn intern<F>(&self, name: IString, build: F) -> TermPtr
  where
    F: FnOnce() -> (TermData, u32),
  {
    let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());

    if let Some(found) = cache.terms.get(&name) {
      let found = found.clone();
      *cache.usage.entry(name).or_insert(0) += 1;
      drop(cache);
      self.events.emit(Event::TermCacheHit { name });
      return found;
    }

    let (data, complexity) = build();
    let term: TermPtr = Arc::new(Term::new(name, data, complexity));

    let evicted = cache.terms.push(name, term.clone());
    if let Some((evicted_name, _)) = evicted {
      if evicted_name != name {
        cache.complexity.remove(&evicted_name);
        cache.usage.remove(&evicted_name);
      }
    }
    cache.complexity.insert(name, complexity);
    *cache.usage.entry(name).or_insert(0) += 1;
    drop(cache);

    self.events.emit(Event::TermCacheMiss { name });
    self.events.emit(Event::TermCreated { name });
    term
  }
}

/// The canonical spelling of a compound: `(op c₁ c₂ …)`, with the set constructors keeping
/// their bracket forms.
fn canonical_name(op: Operator, components: &[TermPtr]) -> IString {
  let joined = join_iter(components.iter().map(|c| c.name()), " ");
  let spelled = match op {
    Operator::SetExt => format!("{{{joined}}}"),
    Operator::SetInt => format!("[{joined}]"),
    _ => format!("({} {})", op.glyph(), joined),
  };
  IString::from(spelled.as_str())
}
