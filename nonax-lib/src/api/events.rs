/*!

Introspection events and the observer bus that carries them.

The engine emits named events at a few well-known points: term-cache traffic in the factory,
language-model calls in the LM rule harness, and backpressure transitions in the pipeline.
Observers subscribe on the bus; with no observers registered, emission is a length check and
nothing more, so the instrumented paths cost effectively nothing in the common case.

*/

use std::{
  sync::{Arc, RwLock},
  time::{SystemTime, UNIX_EPOCH},
};

use nonax_abs::IString;

/// Milliseconds since the Unix epoch; the timestamp carried on LM events.
pub fn timestamp_millis() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}

#[derive(Clone, Debug)]
pub enum Event {
  TermCacheHit {
    name: IString,
  },
  TermCacheMiss {
    name: IString,
  },
  TermCreated {
    name: IString,
  },
  LmPrompt {
    rule_id:   IString,
    prompt:    String,
    timestamp: u64,
  },
  LmResponse {
    rule_id:     IString,
    prompt:      String,
    response:    String,
    duration_ms: u64,
    timestamp:   u64,
  },
  LmFailure {
    rule_id:     IString,
    error:       String,
    duration_ms: u64,
    timestamp:   u64,
  },
  Backpressure {
    queue_length: usize,
    level:        f32,
  },
}

pub trait EventObserver: Send + Sync {
  fn notify(&self, event: &Event);
}

/// A broadcast point for [`Event`]s. Cloning the bus shares the subscriber list.
#[derive(Clone, Default)]
pub struct EventBus {
  observers: Arc<RwLock<Vec<Arc<dyn EventObserver>>>>,
}

impl EventBus {
  pub fn new() -> EventBus {
    EventBus::default()
  }

  pub fn subscribe(&self, observer: Arc<dyn EventObserver>) {
    self.observers.write().unwrap_or_else(|e| e.into_inner()).push(observer);
  }

  pub fn observer_count(&self) -> usize {
    self.observers.read().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn emit(&self, event: Event) {
    let observers = self.observers.read().unwrap_or_else(|e| e.into_inner());
    for observer in observers.iter() {
      observer.notify(&event);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  struct Recorder {
    seen: Mutex<Vec<String>>,
  }

  impl EventObserver for Recorder {
    fn notify(&self, event: &Event) {
      self.seen.lock().unwrap().push(format!("{event:?}"));
    }
  }

  #[test]
  fn events_reach_every_subscriber() {
    let bus = EventBus::new();
    let a = Arc::new(Recorder { seen: Mutex::new(Vec::new()) });
    let b = Arc::new(Recorder { seen: Mutex::new(Vec::new()) });
    bus.subscribe(a.clone());
    bus.subscribe(b.clone());

    bus.emit(Event::TermCreated { name: IString::from("bird") });

    assert_eq!(a.seen.lock().unwrap().len(), 1);
    assert_eq!(b.seen.lock().unwrap().len(), 1);
  }

  #[test]
  fn emission_without_observers_is_a_no_op() {
    let bus = EventBus::new();
    bus.emit(Event::TermCacheMiss { name: IString::from("x") });
    assert_eq!(bus.observer_count(), 0);
  }
}
