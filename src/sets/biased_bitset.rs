use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use crate::symbol::Symbol;
use super::cache::Recycle;

type BitBlock = u64;

const BLOCK_NBITS: usize = std::mem::size_of::<BitBlock>() * 8;

/// A set of symbols whose bit 0 stands for `bias`, so the reserved negative
/// symbols get a slot as well.
///
/// The block vector grows on demand; equality and hashing ignore trailing
/// zero blocks.
#[derive(Clone)]
pub struct BiasedBitSet {
  bias: Symbol,
  slice: Vec<BitBlock>,
}

fn blocks_for(num_bits: usize) -> usize {
  (num_bits + BLOCK_NBITS - 1) / BLOCK_NBITS
}

impl BiasedBitSet {
  /// Creates an empty set with room for `min..=max`.
  pub fn new(min: Symbol, max: Symbol) -> Self {
    let num_bits = if max >= min { (max - min) as usize + 1 } else { 0 };
    Self {
      bias: min,
      slice: vec![0; blocks_for(num_bits)],
    }
  }

  pub fn from_symbol(min: Symbol, max: Symbol, sym: Symbol) -> Self {
    let mut s = Self::new(min, max);
    s.insert(sym);
    s
  }

  pub fn bias(&self) -> Symbol {
    self.bias
  }

  pub fn clear(&mut self) {
    for x in self.slice.iter_mut() {
      *x = 0;
    }
  }

  fn bit(&self, sym: Symbol) -> usize {
    assert!(sym >= self.bias, "symbol {} below bias {}", sym, self.bias);
    (sym - self.bias) as usize
  }

  fn reserve_bit(&mut self, bit: usize) {
    let len = bit / BLOCK_NBITS + 1;
    if self.slice.len() < len {
      self.slice.resize(len, 0);
    }
  }

  /// Returns whether the symbol was newly added.
  pub fn insert(&mut self, sym: Symbol) -> bool {
    let bit = self.bit(sym);
    self.reserve_bit(bit);
    let block = &mut self.slice[bit / BLOCK_NBITS];
    let mask = 1 << (bit % BLOCK_NBITS);
    let added = *block & mask == 0;
    *block |= mask;
    added
  }

  /// Returns whether the symbol was present.
  pub fn remove(&mut self, sym: Symbol) -> bool {
    if sym < self.bias {
      return false;
    }
    let bit = self.bit(sym);
    match self.slice.get_mut(bit / BLOCK_NBITS) {
      Some(block) => {
        let mask = 1 << (bit % BLOCK_NBITS);
        let present = *block & mask != 0;
        *block &= !mask;
        present
      }
      None => false,
    }
  }

  pub fn flip(&mut self, sym: Symbol) {
    let bit = self.bit(sym);
    self.reserve_bit(bit);
    self.slice[bit / BLOCK_NBITS] ^= 1 << (bit % BLOCK_NBITS);
  }

  pub fn contains(&self, sym: Symbol) -> bool {
    if sym < self.bias {
      return false;
    }
    let bit = (sym - self.bias) as usize;
    match self.slice.get(bit / BLOCK_NBITS) {
      Some(block) => block & (1 << (bit % BLOCK_NBITS)) != 0,
      None => false,
    }
  }

  /// Returns whether the set has changed.
  pub fn union_with(&mut self, other: &BiasedBitSet) -> bool {
    debug_assert_eq!(self.bias, other.bias);
    if self.slice.len() < other.slice.len() {
      self.slice.resize(other.slice.len(), 0);
    }
    let mut changed = false;
    for (i, &bits) in other.slice.iter().enumerate() {
      let old = self.slice[i];
      self.slice[i] |= bits;
      changed |= old != self.slice[i];
    }
    changed
  }

  /// Whether every member of `self` is also in `other`.
  pub fn is_subset(&self, other: &BiasedBitSet) -> bool {
    debug_assert_eq!(self.bias, other.bias);
    self.slice.iter().enumerate().all(|(i, &bits)| {
      let theirs = other.slice.get(i).copied().unwrap_or(0);
      bits & !theirs == 0
    })
  }

  pub fn contains_all(&self, other: &BiasedBitSet) -> bool {
    other.is_subset(self)
  }

  /// The intersection as a new set.
  pub fn conflict(&self, other: &BiasedBitSet) -> BiasedBitSet {
    debug_assert_eq!(self.bias, other.bias);
    let slice = self.slice.iter()
      .zip(other.slice.iter())
      .map(|(a, b)| a & b)
      .collect();
    BiasedBitSet {
      bias: self.bias,
      slice,
    }
  }

  pub fn intersects(&self, other: &BiasedBitSet) -> bool {
    self.slice.iter()
      .zip(other.slice.iter())
      .any(|(a, b)| a & b != 0)
  }

  pub fn is_empty(&self) -> bool {
    self.slice.iter().all(|&x| x == 0)
  }

  pub fn len(&self) -> usize {
    self.slice.iter().map(|x| x.count_ones() as usize).sum()
  }

  pub fn max(&self) -> Option<Symbol> {
    self.iter().last()
  }

  pub fn iter(&self) -> Iter {
    Iter {
      slice: &self.slice,
      bias: self.bias,
      bit: 0,
      index: 0,
    }
  }

  fn significant(&self) -> &[BitBlock] {
    let len = self.slice.iter().rposition(|&x| x != 0).map_or(0, |i| i + 1);
    &self.slice[..len]
  }

  pub fn format_with(&self, name: &dyn Fn(Symbol) -> String) -> String {
    let names = self.iter().map(name).collect::<Vec<_>>();
    format!("{{{}}}", names.join(", "))
  }
}

impl PartialEq for BiasedBitSet {
  fn eq(&self, other: &BiasedBitSet) -> bool {
    self.bias == other.bias && self.significant() == other.significant()
  }
}

impl Eq for BiasedBitSet {}

impl Hash for BiasedBitSet {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.bias.hash(state);
    self.significant().hash(state);
  }
}

impl Recycle for BiasedBitSet {
  fn recycle(&mut self) {
    self.clear();
  }
}

pub struct Iter<'a> {
  slice: &'a [BitBlock],
  bias: Symbol,
  bit: usize,
  index: usize,
}

impl<'a> Iterator for Iter<'a> {
  type Item = Symbol;

  fn next(&mut self) -> Option<Symbol> {
    while self.index < self.slice.len() {
      if self.bit < BLOCK_NBITS {
        let bit = (self.slice[self.index] & !((1 << self.bit) - 1))
          .trailing_zeros() as usize;
        if bit < BLOCK_NBITS {
          self.bit = bit + 1;
          return Some((self.index * BLOCK_NBITS + bit) as Symbol + self.bias);
        }
      }

      self.index += 1;
      self.bit = 0;
    }
    None
  }
}

impl Debug for BiasedBitSet {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    f.debug_set().entries(self.iter()).finish()
  }
}
