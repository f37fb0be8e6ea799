/*!

A bounded-capacity priority-sampled collection.

Items are keyed by an identity string and carry a numeric priority. When the bag is full, adding
a higher-priority item evicts the current minimum; adding a lower-priority item is refused. Two
retrieval modes exist: deterministic, in non-increasing priority order with ties broken by
insertion time, and roulette, a random draw without replacement weighted by priority. Both
retrievals remove what they return.

Capacities are small (the per-primary candidate bag defaults to 50), so the linear scans below
beat maintaining a heap plus a key index.

*/

use nonax_abs::IString;
use ordered_float::NotNan;
use rand::Rng;

struct BagEntry<T> {
  key:      IString,
  item:     T,
  priority: NotNan<f32>,
  seq:      u64,
}

pub struct Bag<T> {
  capacity: usize,
  entries:  Vec<BagEntry<T>>,
  next_seq: u64,
}

impl<T> Bag<T> {
  pub fn new(capacity: usize) -> Bag<T> {
    Bag {
      capacity: capacity.max(1),
      entries: Vec::new(),
      next_seq: 0,
    }
  }

  #[inline(always)]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[inline(always)]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  #[inline(always)]
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  pub fn contains(&self, key: IString) -> bool {
    self.entries.iter().any(|e| e.key == key)
  }

  /// Adds an item under `key`. A duplicate key keeps whichever entry has the higher priority.
  /// When full, the lowest-priority entry is evicted if the newcomer outranks it; otherwise the
  /// newcomer is refused. Returns whether the item was stored.
  pub fn insert(&mut self, key: IString, item: T, priority: f32) -> bool {
    let priority = NotNan::new(priority.clamp(0.0, 1.0)).unwrap_or_default();

    if let Some(existing) = self.entries.iter_mut().find(|e| e.key == key) {
      if priority > existing.priority {
        existing.item = item;
        existing.priority = priority;
      }
      return true;
    }

    if self.entries.len() >= self.capacity {
      let min_index = self.min_index();
      if self.entries[min_index].priority >= priority {
        return false;
      }
      self.entries.swap_remove(min_index);
    }

    self.entries.push(BagEntry {
      key,
      item,
      priority,
      seq: self.next_seq,
    });
    self.next_seq += 1;
    true
  }

  /// Removes and returns up to `n` items in non-increasing priority order, insertion order on
  /// ties.
  pub fn take_ordered(&mut self, n: usize) -> Vec<T> {
    let mut taken = Vec::with_capacity(n.min(self.entries.len()));
    for _ in 0..n {
      let Some(best) = self.max_index() else { break };
      taken.push(self.entries.swap_remove(best).item);
    }
    taken
  }

  /// Removes and returns up to `n` items drawn without replacement with probability
  /// proportional to priority. When every priority is zero the draw is uniform.
  pub fn sample_roulette<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> Vec<T> {
    let mut drawn = Vec::with_capacity(n.min(self.entries.len()));
    for _ in 0..n {
      if self.entries.is_empty() {
        break;
      }
      let total: f32 = self.entries.iter().map(|e| e.priority.into_inner()).sum();
      let index = if total <= f32::EPSILON {
        rng.gen_range(0..self.entries.len())
      } else {
        let mut threshold = rng.gen_range(0.0..total);
        let mut chosen = self.entries.len() - 1;
        for (i, entry) in self.entries.iter().enumerate() {
          threshold -= entry.priority.into_inner();
          if threshold <= 0.0 {
            chosen = i;
            break;
          }
        }
        chosen
      };
      drawn.push(self.entries.swap_remove(index).item);
    }
    drawn
  }

  fn min_index(&self) -> usize {
    let mut min = 0;
    for (i, entry) in self.entries.iter().enumerate().skip(1) {
      let best = &self.entries[min];
      // On equal priority the newer entry loses.
      if entry.priority < best.priority
        || (entry.priority == best.priority && entry.seq > best.seq)
      {
        min = i;
      }
    }
    min
  }

  fn max_index(&self) -> Option<usize> {
    if self.entries.is_empty() {
      return None;
    }
    let mut max = 0;
    for (i, entry) in self.entries.iter().enumerate().skip(1) {
      let best = &self.entries[max];
      if entry.priority > best.priority
        || (entry.priority == best.priority && entry.seq < best.seq)
      {
        max = i;
      }
    }
    Some(max)
  }
}
