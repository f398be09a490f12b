use std::collections::BTreeSet;
use std::fmt::{self, Debug, Formatter};
use crate::symbol::Symbol;
use super::cache::Recycle;

/// A lookahead string of at most k symbols. The bound lives in the owning
/// `LLStringSet`; a string shorter than k means the derivation ended there.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LLString {
  symbols: Vec<Symbol>,
}

impl LLString {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn new(symbols: impl Into<Vec<Symbol>>) -> Self {
    Self {
      symbols: symbols.into(),
    }
  }

  pub fn single(sym: Symbol) -> Self {
    Self {
      symbols: vec![sym],
    }
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }

  pub fn symbols(&self) -> &[Symbol] {
    &self.symbols
  }

  /// `self` followed by `other`, cut after `k` symbols.
  pub fn concat(&self, other: &LLString, k: usize) -> LLString {
    let symbols = self.symbols.iter()
      .chain(other.symbols.iter())
      .take(k)
      .copied()
      .collect();
    LLString { symbols }
  }

  pub fn truncated(&self, len: usize) -> LLString {
    LLString {
      symbols: self.symbols.iter().take(len).copied().collect(),
    }
  }

  pub fn format_with(&self, name: &dyn Fn(Symbol) -> String) -> String {
    let names = self.symbols.iter().map(|&s| name(s)).collect::<Vec<_>>();
    format!("[{}]", names.join(" "))
  }
}

impl Debug for LLString {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    f.write_str(&self.format_with(&|s: Symbol| s.to_string()))
  }
}

/// A set of lookahead strings sharing the bound `k`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LLStringSet {
  k: usize,
  strings: BTreeSet<LLString>,
}

impl LLStringSet {
  pub fn new(k: usize) -> Self {
    Self {
      k,
      strings: BTreeSet::new(),
    }
  }

  /// The set holding only the empty string.
  pub fn epsilon(k: usize) -> Self {
    let mut s = Self::new(k);
    s.add(LLString::empty());
    s
  }

  pub fn from_symbol(k: usize, sym: Symbol) -> Self {
    let mut s = Self::new(k);
    s.add(LLString::single(sym));
    s
  }

  pub fn k(&self) -> usize {
    self.k
  }

  pub fn len(&self) -> usize {
    self.strings.len()
  }

  pub fn is_empty(&self) -> bool {
    self.strings.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &LLString> {
    self.strings.iter()
  }

  pub fn clear(&mut self) {
    self.strings.clear();
  }

  /// Adds `string` cut to k symbols. Returns whether the set has changed.
  pub fn add(&mut self, string: LLString) -> bool {
    if string.len() > self.k {
      self.strings.insert(string.truncated(self.k))
    } else {
      self.strings.insert(string)
    }
  }

  /// Returns whether the set has changed.
  pub fn add_all(&mut self, other: &LLStringSet) -> bool {
    let mut changed = false;
    for s in other.iter() {
      if !self.strings.contains(s) {
        changed |= self.add(s.clone());
      }
    }
    changed
  }

  pub fn contains(&self, string: &LLString) -> bool {
    self.strings.contains(string)
  }

  pub fn contains_epsilon(&self) -> bool {
    self.strings.contains(&LLString::empty())
  }

  /// Whether every member already has k symbols.
  pub fn is_full(&self) -> bool {
    self.strings.iter().all(|s| s.len() >= self.k)
  }

  /// Every string of `self` followed by every string of `other`, cut to k.
  /// Strings that already have k symbols are carried over unchanged, even
  /// when `other` is empty.
  pub fn append(&self, other: &LLStringSet) -> LLStringSet {
    let mut out = LLStringSet::new(self.k);
    self.append_into(other, &mut out);
    out
  }

  pub fn append_into(&self, other: &LLStringSet, out: &mut LLStringSet) {
    out.clear();
    for s in self.iter() {
      if s.len() >= self.k {
        out.add(s.clone());
        continue;
      }
      for t in other.iter() {
        out.add(s.concat(t, self.k));
      }
    }
  }

  pub fn intersect(&self, other: &LLStringSet) -> LLStringSet {
    LLStringSet {
      k: self.k,
      strings: self.strings.intersection(&other.strings).cloned().collect(),
    }
  }

  pub fn intersects(&self, other: &LLStringSet) -> bool {
    self.strings.intersection(&other.strings).next().is_some()
  }

  /// Every member cut to `len` symbols.
  pub fn truncated(&self, len: usize) -> LLStringSet {
    LLStringSet {
      k: self.k,
      strings: self.strings.iter().map(|s| s.truncated(len)).collect(),
    }
  }

  pub fn without_epsilon(&self) -> LLStringSet {
    let mut out = self.clone();
    out.strings.remove(&LLString::empty());
    out
  }

  pub fn format_with(&self, name: &dyn Fn(Symbol) -> String) -> String {
    let strings = self.iter().map(|s| s.format_with(name)).collect::<Vec<_>>();
    format!("{{{}}}", strings.join(", "))
  }
}

impl Recycle for LLStringSet {
  fn recycle(&mut self) {
    self.clear();
  }
}

impl Debug for LLStringSet {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    f.debug_set().entries(self.iter()).finish()
  }
}
