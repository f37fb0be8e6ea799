/*!

Derivation stamps: the provenance record attached to every task.

A stamp records where a task came from — input or a named rule — together with its parents, its
derivation depth, and its evidential base: the set of input-stamp serials the task ultimately
rests on. Two stamps overlap when their bases intersect; a rule that would combine overlapping
premises is recombining the same evidence and must be suppressed.

Stamps form a DAG of shared immutable nodes: parents are held by `Arc`, so a common ancestor is
one allocation no matter how many derivation chains pass through it.

*/

use std::sync::{
  atomic::{AtomicU64, Ordering},
  Arc,
};

use nonax_abs::{IString, SmallVec};

pub type StampPtr = Arc<Stamp>;

/// Process-wide serial counter for input stamps. Serials are the atoms of evidential bases.
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Logical clock for creation times. Monotone per process; recency comparisons only.
static NEXT_CREATION: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StampSource {
  Input,
  Derived(IString),
}

impl StampSource {
  pub fn derived(rule_id: &str) -> StampSource {
    StampSource::Derived(IString::from(rule_id))
  }

  /// The `INPUT` / `DERIVED:<ruleId>` tag as a string.
  pub fn tag(&self) -> String {
    match self {
      StampSource::Input => "INPUT".to_string(),
      StampSource::Derived(rule_id) => format!("DERIVED:{rule_id}"),
    }
  }
}

#[derive(Debug)]
pub struct Stamp {
  serial:          u64,
  creation_time:   u64,
  source:          StampSource,
  parents:         SmallVec<[StampPtr; 2]>,
  depth:           u32,
  /// Sorted, deduplicated input-stamp serials this stamp evidentially rests on.
  evidential_base: SmallVec<[u64; 8]>,
}

impl Stamp {
  /// A fresh input stamp with a singleton evidential base.
  pub fn input() -> StampPtr {
    let serial = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed);
    Arc::new(Stamp {
      serial,
      creation_time: NEXT_CREATION.fetch_add(1, Ordering::Relaxed),
      source: StampSource::Input,
      parents: SmallVec::new(),
      depth: 0,
      evidential_base: SmallVec::from_slice(&[serial]),
    })
  }

  /// A derived stamp whose base is the union of its parents' bases.
  pub fn derive(parents: &[StampPtr], source: StampSource, depth: u32) -> StampPtr {
    let mut base: SmallVec<[u64; 8]> = SmallVec::new();
    for parent in parents {
      base.extend_from_slice(&parent.evidential_base);
    }
    base.sort_unstable();
    base.dedup();

    Arc::new(Stamp {
      serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
      creation_time: NEXT_CREATION.fetch_add(1, Ordering::Relaxed),
      source,
      parents: parents.iter().cloned().collect(),
      depth,
      evidential_base: base,
    })
  }

  /// A copy of `self` re-tagged with a new source. Parents, depth, and base carry over; used
  /// when the processor enriches a derivation with the id of the rule that produced it.
  pub fn retagged(&self, source: StampSource) -> StampPtr {
    Arc::new(Stamp {
      serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
      creation_time: self.creation_time,
      source,
      parents: self.parents.clone(),
      depth: self.depth,
      evidential_base: self.evidential_base.clone(),
    })
  }

  #[inline(always)]
  pub fn serial(&self) -> u64 {
    self.serial
  }

  #[inline(always)]
  pub fn creation_time(&self) -> u64 {
    self.creation_time
  }

  #[inline(always)]
  pub fn source(&self) -> &StampSource {
    &self.source
  }

  #[inline(always)]
  pub fn parents(&self) -> &[StampPtr] {
    &self.parents
  }

  #[inline(always)]
  pub fn depth(&self) -> u32 {
    self.depth
  }

  #[inline(always)]
  pub fn evidential_base(&self) -> &[u64] {
    &self.evidential_base
  }

  /// Whether two stamps share a base evidential ancestor. Bases are sorted, so this is a
  /// linear merge walk.
  pub fn overlaps(&self, other: &Stamp) -> bool {
    let (mut i, mut j) = (0, 0);
    let (a, b) = (&self.evidential_base, &other.evidential_base);
    while i < a.len() && j < b.len() {
      match a[i].cmp(&b[j]) {
        std::cmp::Ordering::Less => i += 1,
        std::cmp::Ordering::Greater => j += 1,
        std::cmp::Ordering::Equal => return true,
      }
    }
    false
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn input_stamps_never_overlap() {
    let a = Stamp::input();
    let b = Stamp::input();
    assert!(!a.overlaps(&b));
    assert!(a.overlaps(&a));
    assert_eq!(a.depth(), 0);
  }

  #[test]
  fn derivation_unions_the_bases() {
    let a = Stamp::input();
    let b = Stamp::input();
    let d = Stamp::derive(&[a.clone(), b.clone()], StampSource::derived("ded"), 1);

    assert_eq!(d.evidential_base().len(), 2);
    assert!(d.overlaps(&a));
    assert!(d.overlaps(&b));
    assert_eq!(d.depth(), 1);
    assert_eq!(d.parents().len(), 2);
  }

  #[test]
  fn siblings_of_a_common_ancestor_overlap() {
    let root = Stamp::input();
    let other = Stamp::input();
    let left = Stamp::derive(&[root.clone(), other.clone()], StampSource::derived("r1"), 1);
    let right = Stamp::derive(&[root.clone()], StampSource::derived("r2"), 1);

    assert!(left.overlaps(&right));
  }

  #[test]
  fn source_tags_spell_out() {
    assert_eq!(Stamp::input().source().tag(), "INPUT");
    let d = Stamp::derive(&[Stamp::input()], StampSource::derived("ded"), 1);
    assert_eq!(d.source().tag(), "DERIVED:ded");
  }

  #[test]
  fn retagging_preserves_provenance() {
    let a = Stamp::input();
    let d = Stamp::derive(&[a.clone()], StampSource::derived("x"), 3);
    let r = d.retagged(StampSource::derived("y"));
    assert_eq!(r.depth(), 3);
    assert_eq!(r.evidential_base(), d.evidential_base());
    assert_eq!(r.source().tag(), "DERIVED:y");
  }

  #[test]
  fn creation_time_is_monotone() {
    let a = Stamp::input();
    let b = Stamp::input();
    assert!(b.creation_time() > a.creation_time());
  }
}
