//! Position-wise approximation of a k-bounded lookahead set.
//!
//! Instead of the strings themselves, a `PositionalLLString` keeps one
//! symbol set per lookahead position and the set of string lengths seen.
//! Memory grows with `k * alphabet` instead of `alphabet^k`, at the price of
//! forgetting which symbols occurred together in one string.

use std::fmt::{self, Debug, Formatter};
use crate::symbol::Symbol;
use super::biased_bitset::BiasedBitSet;
use super::cache::Recycle;
use super::ll_string::LLString;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PositionalLLString {
  positions: Vec<BiasedBitSet>,
  /// realized lengths, `0..=k`
  lengths: BiasedBitSet,
}

impl PositionalLLString {
  pub fn new(k: usize, min: Symbol, max: Symbol) -> Self {
    Self {
      positions: vec![BiasedBitSet::new(min, max); k],
      lengths: BiasedBitSet::new(0, k as Symbol),
    }
  }

  pub fn epsilon(k: usize, min: Symbol, max: Symbol) -> Self {
    let mut s = Self::new(k, min, max);
    s.lengths.insert(0);
    s
  }

  pub fn from_symbol(k: usize, min: Symbol, max: Symbol, sym: Symbol) -> Self {
    let mut s = Self::new(k, min, max);
    if k > 0 {
      s.positions[0].insert(sym);
      s.lengths.insert(1);
    } else {
      s.lengths.insert(0);
    }
    s
  }

  pub fn from_string(k: usize, min: Symbol, max: Symbol, string: &LLString) -> Self {
    let mut s = Self::new(k, min, max);
    s.add_string(string);
    s
  }

  pub fn k(&self) -> usize {
    self.positions.len()
  }

  /// Records `string`, cut to k symbols.
  pub fn add_string(&mut self, string: &LLString) -> bool {
    let mut changed = false;
    for (position, &sym) in self.positions.iter_mut().zip(string.symbols()) {
      changed |= position.insert(sym);
    }
    changed | self.lengths.insert(string.len().min(self.k()) as Symbol)
  }

  pub fn position(&self, index: usize) -> &BiasedBitSet {
    &self.positions[index]
  }

  pub fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
    self.lengths.iter().map(|l| l as usize)
  }

  pub fn clear(&mut self) {
    for position in self.positions.iter_mut() {
      position.clear();
    }
    self.lengths.clear();
  }

  /// Empty means no string at all; an empty string is `epsilon`.
  pub fn is_empty(&self) -> bool {
    self.lengths.is_empty()
  }

  pub fn contains_epsilon(&self) -> bool {
    self.lengths.contains(0)
  }

  pub fn is_full(&self) -> bool {
    let k = self.k();
    self.lengths().all(|l| l == k)
  }

  /// Returns whether anything has changed.
  pub fn union_with(&mut self, other: &PositionalLLString) -> bool {
    debug_assert_eq!(self.k(), other.k());
    let mut changed = self.lengths.union_with(&other.lengths);
    for (mine, theirs) in self.positions.iter_mut().zip(other.positions.iter()) {
      changed |= mine.union_with(theirs);
    }
    changed
  }

  pub fn append(&self, other: &PositionalLLString) -> PositionalLLString {
    let mut out = self.clone();
    self.append_into(other, &mut out);
    out
  }

  /// Shifts `other` behind every length of `self` shorter than k and unions
  /// the shifted positions in. Lengths are capped at k.
  pub fn append_into(&self, other: &PositionalLLString, out: &mut PositionalLLString) {
    out.clear();
    let k = self.k();
    for l in self.lengths() {
      if l >= k {
        out.lengths.insert(k as Symbol);
        continue;
      }
      for m in other.lengths() {
        out.lengths.insert((l + m).min(k) as Symbol);
      }
      if other.is_empty() {
        continue;
      }
      for i in 0..k - l {
        out.positions[l + i].union_with(&other.positions[i]);
      }
    }
    if out.lengths.is_empty() {
      out.clear();
      return;
    }
    for (position, mine) in out.positions.iter_mut().zip(self.positions.iter()) {
      position.union_with(mine);
    }
  }

  /// Per-position intersection over the first `depth` positions.
  ///
  /// Two strings cut to `depth` can only coincide when their cut lengths
  /// agree and every position before that length overlaps, so the result
  /// keeps exactly the common cut lengths that pass this test.
  pub fn conflict(&self, other: &PositionalLLString, depth: usize) -> PositionalLLString {
    let depth = depth.min(self.k());
    let mut out = self.clone();
    out.clear();

    let overlaps = (0..depth)
      .map(|p| self.positions[p].conflict(&other.positions[p]))
      .collect::<Vec<_>>();

    let mut mine = BiasedBitSet::new(0, depth as Symbol);
    for l in self.lengths() {
      mine.insert(l.min(depth) as Symbol);
    }
    let mut theirs = BiasedBitSet::new(0, depth as Symbol);
    for l in other.lengths() {
      theirs.insert(l.min(depth) as Symbol);
    }

    let mut reach = 0;
    for c in mine.conflict(&theirs).iter().map(|c| c as usize) {
      if overlaps[..c].iter().all(|o| !o.is_empty()) {
        out.lengths.insert(c as Symbol);
        reach = reach.max(c);
      }
    }
    for (position, overlap) in out.positions.iter_mut().zip(overlaps).take(reach) {
      *position = overlap;
    }
    out
  }

  pub fn without_epsilon(&self) -> PositionalLLString {
    let mut out = self.clone();
    out.lengths.remove(0);
    if out.lengths.is_empty() {
      out.clear();
    }
    out
  }

  pub fn format_with(&self, name: &dyn Fn(Symbol) -> String) -> String {
    let positions = self.positions.iter()
      .map(|p| p.format_with(name))
      .collect::<Vec<_>>();
    let lengths = self.lengths().map(|l| l.to_string()).collect::<Vec<_>>();
    format!("[{}] lengths {{{}}}", positions.join(" "), lengths.join(", "))
  }
}

impl Recycle for PositionalLLString {
  fn recycle(&mut self) {
    self.clear();
  }
}

impl Debug for PositionalLLString {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    f.debug_struct("PositionalLLString")
      .field("positions", &self.positions)
      .field("lengths", &self.lengths().collect::<Vec<_>>())
      .finish()
  }
}
