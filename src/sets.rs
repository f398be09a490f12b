//! Lookahead set representations.
//!
//! The three depths of First/Follow share one engine; `LookaheadSet` is the
//! seam between that engine and the set algebra it runs on:
//!
//! * `BiasedBitSet`: single symbols, the empty string is `EPSILON`
//! * `LLStringSet`: strings of at most k symbols
//! * `PositionalLLString`: one symbol set per position, up to k positions

use std::fmt::Debug;
use crate::symbol::{Symbol, EPSILON, MIN_RESERVED, MIN_TYPE};

pub mod biased_bitset;
pub mod cache;
pub mod ll_string;
pub mod positional;

pub use biased_bitset::BiasedBitSet;
pub use cache::{Pool, PoolStats, Recycle};
pub use ll_string::{LLString, LLStringSet};
pub use positional::PositionalLLString;

/// Dimensions every set of one analysis run shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
  pub k: usize,
  pub min_symbol: Symbol,
  pub max_symbol: Symbol,
}

impl Shape {
  pub fn new(k: usize, max_symbol: Symbol) -> Self {
    Shape {
      k,
      min_symbol: MIN_RESERVED,
      max_symbol: max_symbol.max(MIN_TYPE),
    }
  }
}

pub trait LookaheadSet: Clone + PartialEq + Debug + Recycle {
  fn empty(shape: &Shape) -> Self;

  /// The set holding just the empty derivation.
  fn epsilon(shape: &Shape) -> Self;

  fn symbol(shape: &Shape, sym: Symbol) -> Self;

  fn is_empty(&self) -> bool;

  fn contains_epsilon(&self) -> bool;

  /// Whether appending anything leaves the set unchanged.
  fn is_full(&self) -> bool;

  /// Returns whether the set has changed.
  fn union_with(&mut self, other: &Self) -> bool;

  /// Concatenation cut to the depth bound; `out` is overwritten.
  fn append_into(&self, other: &Self, out: &mut Self);

  fn append(&self, other: &Self) -> Self {
    let mut out = self.clone();
    self.append_into(other, &mut out);
    out
  }

  fn without_epsilon(&self) -> Self;

  /// Lookahead shared by `self` and `other` when looking `depth` symbols
  /// ahead. Empty means the two can be told apart.
  fn conflict(&self, other: &Self, depth: usize) -> Self;

  fn format_with(&self, name: &dyn Fn(Symbol) -> String) -> String;
}

impl LookaheadSet for BiasedBitSet {
  fn empty(shape: &Shape) -> Self {
    BiasedBitSet::new(shape.min_symbol, shape.max_symbol)
  }

  fn epsilon(shape: &Shape) -> Self {
    BiasedBitSet::from_symbol(shape.min_symbol, shape.max_symbol, EPSILON)
  }

  fn symbol(shape: &Shape, sym: Symbol) -> Self {
    BiasedBitSet::from_symbol(shape.min_symbol, shape.max_symbol, sym)
  }

  fn is_empty(&self) -> bool {
    BiasedBitSet::is_empty(self)
  }

  fn contains_epsilon(&self) -> bool {
    self.contains(EPSILON)
  }

  fn is_full(&self) -> bool {
    !self.contains(EPSILON)
  }

  fn union_with(&mut self, other: &Self) -> bool {
    BiasedBitSet::union_with(self, other)
  }

  fn append_into(&self, other: &Self, out: &mut Self) {
    out.clear();
    out.union_with(self);
    if out.remove(EPSILON) {
      out.union_with(other);
    }
  }

  fn without_epsilon(&self) -> Self {
    let mut out = self.clone();
    out.remove(EPSILON);
    out
  }

  fn conflict(&self, other: &Self, _depth: usize) -> Self {
    BiasedBitSet::conflict(self, other)
  }

  fn format_with(&self, name: &dyn Fn(Symbol) -> String) -> String {
    BiasedBitSet::format_with(self, name)
  }
}

impl LookaheadSet for LLStringSet {
  fn empty(shape: &Shape) -> Self {
    LLStringSet::new(shape.k)
  }

  fn epsilon(shape: &Shape) -> Self {
    LLStringSet::epsilon(shape.k)
  }

  fn symbol(shape: &Shape, sym: Symbol) -> Self {
    LLStringSet::from_symbol(shape.k, sym)
  }

  fn is_empty(&self) -> bool {
    LLStringSet::is_empty(self)
  }

  fn contains_epsilon(&self) -> bool {
    LLStringSet::contains_epsilon(self)
  }

  fn is_full(&self) -> bool {
    LLStringSet::is_full(self)
  }

  fn union_with(&mut self, other: &Self) -> bool {
    self.add_all(other)
  }

  fn append_into(&self, other: &Self, out: &mut Self) {
    LLStringSet::append_into(self, other, out)
  }

  fn without_epsilon(&self) -> Self {
    LLStringSet::without_epsilon(self)
  }

  fn conflict(&self, other: &Self, depth: usize) -> Self {
    self.truncated(depth).intersect(&other.truncated(depth))
  }

  fn format_with(&self, name: &dyn Fn(Symbol) -> String) -> String {
    LLStringSet::format_with(self, name)
  }
}

impl LookaheadSet for PositionalLLString {
  fn empty(shape: &Shape) -> Self {
    PositionalLLString::new(shape.k, shape.min_symbol, shape.max_symbol)
  }

  fn epsilon(shape: &Shape) -> Self {
    PositionalLLString::epsilon(shape.k, shape.min_symbol, shape.max_symbol)
  }

  fn symbol(shape: &Shape, sym: Symbol) -> Self {
    PositionalLLString::from_symbol(shape.k, shape.min_symbol, shape.max_symbol, sym)
  }

  fn is_empty(&self) -> bool {
    PositionalLLString::is_empty(self)
  }

  fn contains_epsilon(&self) -> bool {
    PositionalLLString::contains_epsilon(self)
  }

  fn is_full(&self) -> bool {
    PositionalLLString::is_full(self)
  }

  fn union_with(&mut self, other: &Self) -> bool {
    PositionalLLString::union_with(self, other)
  }

  fn append_into(&self, other: &Self, out: &mut Self) {
    PositionalLLString::append_into(self, other, out)
  }

  fn without_epsilon(&self) -> Self {
    PositionalLLString::without_epsilon(self)
  }

  fn conflict(&self, other: &Self, depth: usize) -> Self {
    PositionalLLString::conflict(self, other, depth)
  }

  fn format_with(&self, name: &dyn Fn(Symbol) -> String) -> String {
    PositionalLLString::format_with(self, name)
  }
}
