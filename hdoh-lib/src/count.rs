use std::sync::{
  atomic::{AtomicIsize, Ordering},
  Arc,
};

#[derive(Debug, Clone, Default)]
/// In-flight connection counter shared across listener tasks.
/// Relaxed ordering is enough; the count gates admission and is advisory.
pub struct RequestCount(Arc<AtomicIsize>);

impl RequestCount {
  pub fn current(&self) -> isize {
    self.0.load(Ordering::Relaxed)
  }

  pub fn increment(&self) -> isize {
    self.0.fetch_add(1, Ordering::Relaxed) + 1
  }

  pub fn decrement(&self) -> isize {
    self.0.fetch_sub(1, Ordering::Relaxed) - 1
  }
}
