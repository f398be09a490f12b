//! Free lists for the scratch sets the fixpoint passes churn through.

use super::biased_bitset::BiasedBitSet;
use super::ll_string::LLStringSet;
use super::positional::PositionalLLString;

pub const DEFAULT_CAPACITY: usize = 100;

/// Values that can be emptied in place and handed out again.
pub trait Recycle {
  fn recycle(&mut self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
  /// instances allocated because the free list was empty
  pub created: usize,
  /// calls to `get`
  pub retrieved: usize,
  /// instances currently parked in the free list
  pub idle: usize,
}

/// A bounded stack of cleared instances.
///
/// New instances are cloned from an empty prototype, so every value handed
/// out has the same shape.
pub struct Pool<T> {
  prototype: T,
  free: Vec<T>,
  capacity: usize,
  created: usize,
  retrieved: usize,
}

pub type BitSetCache = Pool<BiasedBitSet>;
pub type LLStringSetCache = Pool<LLStringSet>;
pub type PositionalCache = Pool<PositionalLLString>;

impl<T: Recycle + Clone> Pool<T> {
  pub fn new(prototype: T) -> Self {
    Self::with_capacity(prototype, DEFAULT_CAPACITY)
  }

  pub fn with_capacity(mut prototype: T, capacity: usize) -> Self {
    prototype.recycle();
    Pool {
      prototype,
      free: Vec::with_capacity(capacity),
      capacity,
      created: 0,
      retrieved: 0,
    }
  }

  pub fn get(&mut self) -> T {
    self.retrieved += 1;
    match self.free.pop() {
      Some(item) => item,
      None => {
        self.created += 1;
        self.prototype.clone()
      }
    }
  }

  /// Parks `item` for reuse; dropped when the free list is full.
  pub fn put(&mut self, mut item: T) {
    if self.free.len() < self.capacity {
      item.recycle();
      self.free.push(item);
    }
  }

  pub fn stats(&self) -> PoolStats {
    PoolStats {
      created: self.created,
      retrieved: self.retrieved,
      idle: self.free.len(),
    }
  }
}
