//! First/Follow attribute tables and the driver shared by all three depths.

use crate::diagnostics::{Diagnostics, Event, Family};
use crate::grammar::{AltId, BlockId, Grammar, MultiplexId, RuleId, TermId, TermKind};
use crate::sets::{LookaheadSet, Pool, Shape};
use crate::symbol::EOF;
use crate::visit::{CancelToken, Interrupted};
use super::conflicts::{self, Conflict, ResolvingDepth, SelfConflict};
use super::flags::FlagTable;
use super::{first, follow};

#[derive(Debug, Clone, PartialEq)]
pub struct MultiplexLookahead<S> {
  pub(crate) first: S,
  pub(crate) follow: S,
  pub(crate) conflicts: Vec<Conflict<S>>,
  pub(crate) self_conflict: Option<SelfConflict<S>>,
  pub(crate) resolving_depth: ResolvingDepth,
}

impl<S> MultiplexLookahead<S> {
  pub fn first(&self) -> &S {
    &self.first
  }

  pub fn follow(&self) -> &S {
    &self.follow
  }

  /// Alternative pairs that share lookahead, earlier alternative first.
  pub fn conflicts(&self) -> &[Conflict<S>] {
    &self.conflicts
  }

  /// Lookahead shared by the content of a nullable or repeatable construct
  /// and what comes after it.
  pub fn self_conflict(&self) -> Option<&SelfConflict<S>> {
    self.self_conflict.as_ref()
  }

  pub fn resolving_depth(&self) -> ResolvingDepth {
    self.resolving_depth
  }

  pub fn is_ambiguous(&self) -> bool {
    !self.conflicts.is_empty() || self.self_conflict.is_some()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AltLookahead<S> {
  pub(crate) first: S,
  pub(crate) follow: S,
}

impl<S> AltLookahead<S> {
  pub fn first(&self) -> &S {
    &self.first
  }

  pub fn follow(&self) -> &S {
    &self.follow
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermLookahead<S> {
  pub(crate) first: S,
  pub(crate) follow: S,
  /// First of the terms after this one in its alternative
  pub(crate) suffix_first: S,
}

impl<S> TermLookahead<S> {
  pub fn first(&self) -> &S {
    &self.first
  }

  pub fn follow(&self) -> &S {
    &self.follow
  }

  pub fn suffix_first(&self) -> &S {
    &self.suffix_first
  }
}

/// First/Follow of every node at one lookahead depth.
#[derive(Debug, Clone, PartialEq)]
pub struct LookaheadTable<S> {
  depth: usize,
  pub(crate) rules: Vec<MultiplexLookahead<S>>,
  pub(crate) blocks: Vec<MultiplexLookahead<S>>,
  pub(crate) alternatives: Vec<AltLookahead<S>>,
  pub(crate) terms: Vec<TermLookahead<S>>,
}

impl<S: LookaheadSet> LookaheadTable<S> {
  /// Fresh empty sets everywhere, terminal occurrences seeded with their
  /// symbol and the start rule followed by end of input.
  pub(crate) fn prepare(grammar: &Grammar, shape: &Shape) -> Self {
    let empty = S::empty(shape);
    let multiplex = MultiplexLookahead {
      first: empty.clone(),
      follow: empty.clone(),
      conflicts: vec![],
      self_conflict: None,
      resolving_depth: ResolvingDepth::Resolved(0),
    };
    let alternative = AltLookahead {
      first: empty.clone(),
      follow: empty.clone(),
    };

    let mut table = LookaheadTable {
      depth: shape.k,
      rules: vec![multiplex.clone(); grammar.rule_count()],
      blocks: vec![multiplex; grammar.block_count()],
      alternatives: vec![alternative; grammar.alternative_count()],
      terms: Vec::with_capacity(grammar.term_count()),
    };

    for i in 0..grammar.term_count() {
      let first = match grammar.term(TermId(i as u32)).kind() {
        TermKind::Terminal(token) => S::symbol(shape, grammar.token(token).symbol()),
        _ => empty.clone(),
      };
      table.terms.push(TermLookahead {
        first,
        follow: empty.clone(),
        suffix_first: empty.clone(),
      });
    }

    if let Some(start) = grammar.start_rule() {
      table.rules[start.index()].follow = S::symbol(shape, EOF);
    }
    table
  }
}

impl<S> LookaheadTable<S> {
  /// Lookahead depth the sets were computed at; 1 for plain First/Follow.
  pub fn depth(&self) -> usize {
    self.depth
  }

  pub fn rule(&self, id: RuleId) -> &MultiplexLookahead<S> {
    &self.rules[id.index()]
  }

  pub fn block(&self, id: BlockId) -> &MultiplexLookahead<S> {
    &self.blocks[id.index()]
  }

  pub fn multiplex(&self, id: MultiplexId) -> &MultiplexLookahead<S> {
    match id {
      MultiplexId::Rule(rule) => self.rule(rule),
      MultiplexId::Block(block) => self.block(block),
    }
  }

  pub fn alternative(&self, id: AltId) -> &AltLookahead<S> {
    &self.alternatives[id.index()]
  }

  pub fn term(&self, id: TermId) -> &TermLookahead<S> {
    &self.terms[id.index()]
  }

  pub(crate) fn multiplex_mut(&mut self, id: MultiplexId) -> &mut MultiplexLookahead<S> {
    match id {
      MultiplexId::Rule(rule) => &mut self.rules[rule.index()],
      MultiplexId::Block(block) => &mut self.blocks[block.index()],
    }
  }
}

#[cfg(test)]
impl<S: LookaheadSet> LookaheadTable<S> {
  /// Whether every set still holds everything it held in `earlier`.
  pub(crate) fn includes(&self, earlier: &Self) -> bool {
    fn grown<S: LookaheadSet>(later: &S, earlier: &S) -> bool {
      !later.clone().union_with(earlier)
    }

    let multiplexes = self.rules.iter().zip(&earlier.rules)
      .chain(self.blocks.iter().zip(&earlier.blocks))
      .all(|(l, e)| grown(&l.first, &e.first) && grown(&l.follow, &e.follow));
    let alternatives = self.alternatives.iter().zip(&earlier.alternatives)
      .all(|(l, e)| grown(&l.first, &e.first) && grown(&l.follow, &e.follow));
    let terms = self.terms.iter().zip(&earlier.terms)
      .all(|(l, e)| grown(&l.first, &e.first) && grown(&l.follow, &e.follow));
    multiplexes && alternatives && terms
  }
}

/// Scratch sets for one calculation.
pub(crate) struct Workspace<S> {
  pool: Pool<S>,
  epsilon: S,
}

impl<S: LookaheadSet> Workspace<S> {
  pub(crate) fn new(shape: &Shape, pool_capacity: usize) -> Self {
    Workspace {
      pool: Pool::with_capacity(S::empty(shape), pool_capacity),
      epsilon: S::epsilon(shape),
    }
  }

  pub(crate) fn get(&mut self) -> S {
    self.pool.get()
  }

  pub(crate) fn put(&mut self, set: S) {
    self.pool.put(set)
  }

  pub(crate) fn append(&mut self, a: &S, b: &S) -> S {
    let mut out = self.pool.get();
    a.append_into(b, &mut out);
    out
  }

  /// First of a run of terms given their Firsts: keeps appending while
  /// some string can still grow.
  pub(crate) fn sequence_first<'s>(&mut self, firsts: impl IntoIterator<Item = &'s S>) -> S
  where
    S: 's,
  {
    let mut acc = self.pool.get();
    acc.union_with(&self.epsilon);
    let mut scratch = self.pool.get();
    for first in firsts {
      if acc.is_full() {
        break;
      }
      acc.append_into(first, &mut scratch);
      std::mem::swap(&mut acc, &mut scratch);
    }
    self.pool.put(scratch);
    acc
  }

  pub(crate) fn epsilon(&self) -> &S {
    &self.epsilon
  }

  fn stats(&self) -> crate::sets::PoolStats {
    self.pool.stats()
  }
}

pub(crate) struct Setup {
  pub family: Family,
  /// `shape.k` is also the deepest lookahead the conflict search uses
  pub shape: Shape,
  pub pool_capacity: usize,
}

pub(crate) fn compute<S: LookaheadSet>(
  grammar: &Grammar,
  flags: &FlagTable,
  setup: &Setup,
  cancel: &CancelToken,
  sink: &mut dyn Diagnostics,
) -> Result<LookaheadTable<S>, Interrupted> {
  let family = setup.family;
  let mut table = LookaheadTable::prepare(grammar, &setup.shape);
  let mut work = Workspace::new(&setup.shape, setup.pool_capacity);

  let passes = first::compute(grammar, &mut table, &mut work, cancel)?;
  sink.event(&Event::Converged { family, attribute: "first", passes });

  let passes = follow::compute(grammar, &mut table, &mut work, cancel)?;
  sink.event(&Event::Converged { family, attribute: "follow", passes });

  conflicts::detect(grammar, flags, &mut table, &mut work, setup.shape.k, cancel)?;
  sink.event(&Event::Pool { family, stats: work.stats() });

  Ok(table)
}
