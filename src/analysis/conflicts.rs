//! Lookahead conflicts between alternatives, and between the content of a
//! nullable or repeatable construct and what follows it.
//!
//! Each conflict is searched downward from the deepest configured lookahead:
//! the first depth found still showing a conflict, i.e. the deepest one at
//! which the alternatives collide, is one short of the lookahead needed.

use std::fmt::{self, Display, Formatter};
use crate::grammar::{AltId, BlockId, Grammar, MultiplexId, RuleId};
use crate::sets::LookaheadSet;
use crate::visit::{walk_multiplex, CancelToken, Interrupted, Visitor};
use super::flags::FlagTable;
use super::lookahead::{LookaheadTable, Workspace};

/// Smallest lookahead depth telling apart every alternative of a rule or
/// block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvingDepth {
  /// `Resolved(0)`: no conflict at all.
  Resolved(usize),
  /// still ambiguous at the deepest lookahead computed
  Unresolved,
}

impl ResolvingDepth {
  /// The integer form: the depth, or -1 when unresolved.
  pub fn as_i32(self) -> i32 {
    match self {
      ResolvingDepth::Resolved(depth) => depth as i32,
      ResolvingDepth::Unresolved => -1,
    }
  }

  pub fn is_resolved(self) -> bool {
    matches!(self, ResolvingDepth::Resolved(_))
  }

  /// The depth resolving both.
  pub fn combine(self, other: ResolvingDepth) -> ResolvingDepth {
    match (self, other) {
      (ResolvingDepth::Resolved(a), ResolvingDepth::Resolved(b)) => {
        ResolvingDepth::Resolved(a.max(b))
      }
      _ => ResolvingDepth::Unresolved,
    }
  }
}

impl Default for ResolvingDepth {
  fn default() -> Self {
    ResolvingDepth::Resolved(0)
  }
}

impl Display for ResolvingDepth {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}", self.as_i32())
  }
}

/// Two alternatives of one multiplex sharing lookahead.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict<S> {
  source: AltId,
  target: AltId,
  set: S,
  depth: usize,
}

impl<S> Conflict<S> {
  /// the earlier alternative
  pub fn source(&self) -> AltId {
    self.source
  }

  pub fn target(&self) -> AltId {
    self.target
  }

  /// Lookahead both alternatives can start with, cut to `depth()`.
  pub fn set(&self) -> &S {
    &self.set
  }

  /// Deepest depth at which the two alternatives still collide.
  pub fn depth(&self) -> usize {
    self.depth
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelfConflict<S> {
  set: S,
  depth: usize,
}

impl<S> SelfConflict<S> {
  pub fn set(&self) -> &S {
    &self.set
  }

  pub fn depth(&self) -> usize {
    self.depth
  }
}

pub(crate) fn detect<S: LookaheadSet>(
  grammar: &Grammar,
  flags: &FlagTable,
  table: &mut LookaheadTable<S>,
  work: &mut Workspace<S>,
  max_depth: usize,
  cancel: &CancelToken,
) -> Result<(), Interrupted> {
  ConflictVisitor { flags, table, work, max_depth }.visit_grammar(grammar, cancel)
}

struct Search<S> {
  /// the shared lookahead at the deepest colliding depth
  shared: Option<(S, usize)>,
  resolving: ResolvingDepth,
}

/// Looks for the deepest depth at or below `depth` where `a` and `b`
/// still collide.
fn search<S: LookaheadSet>(a: &S, b: &S, depth: usize, max_depth: usize) -> Search<S> {
  let shared = a.conflict(b, depth);
  if !shared.is_empty() {
    let resolving = if depth >= max_depth {
      ResolvingDepth::Unresolved
    } else {
      ResolvingDepth::Resolved(depth + 1)
    };
    Search { shared: Some((shared, depth)), resolving }
  } else if depth <= 1 {
    Search { shared: None, resolving: ResolvingDepth::Resolved(0) }
  } else {
    search(a, b, depth - 1, max_depth)
  }
}

struct ConflictVisitor<'a, S> {
  flags: &'a FlagTable,
  table: &'a mut LookaheadTable<S>,
  work: &'a mut Workspace<S>,
  max_depth: usize,
}

impl<S: LookaheadSet> ConflictVisitor<'_, S> {
  /// What an alternative can start with, continued into its Follow.
  fn alt_lookahead(&mut self, alt: AltId) -> S {
    let node = &self.table.alternatives[alt.index()];
    if node.follow.is_empty() {
      let mut out = self.work.get();
      out.union_with(&node.first);
      out
    } else {
      self.work.append(&node.first, &node.follow)
    }
  }

  fn inspect(&mut self, grammar: &Grammar, mux: MultiplexId) {
    let alternatives = grammar.multiplex(mux).alternatives();
    let lookaheads = alternatives.iter()
      .map(|&alt| self.alt_lookahead(alt))
      .collect::<Vec<_>>();

    let mut conflicts: Vec<Conflict<S>> = vec![];
    let mut resolving = ResolvingDepth::Resolved(0);
    for i in 0..lookaheads.len() {
      for j in i + 1..lookaheads.len() {
        let found = search(&lookaheads[i], &lookaheads[j], self.max_depth, self.max_depth);
        resolving = resolving.combine(found.resolving);
        if let Some((set, depth)) = found.shared {
          let conflict = Conflict {
            source: alternatives[i],
            target: alternatives[j],
            set,
            depth,
          };
          if !conflicts.contains(&conflict) {
            conflicts.push(conflict);
          }
        }
      }
    }
    for lookahead in lookaheads {
      self.work.put(lookahead);
    }

    let mut self_conflict = None;
    if let Some(found) = self.self_conflict(grammar, mux) {
      resolving = resolving.combine(found.resolving);
      self_conflict = found.shared.map(|(set, depth)| SelfConflict { set, depth });
    }

    let node = self.table.multiplex_mut(mux);
    node.conflicts = conflicts;
    node.self_conflict = self_conflict;
    node.resolving_depth = resolving;
  }

  /// Entering the construct once more against leaving it. Only nullable
  /// and repeatable constructs make that choice.
  fn self_conflict(&mut self, grammar: &Grammar, mux: MultiplexId) -> Option<Search<S>> {
    let loops = match mux {
      MultiplexId::Block(block) => grammar.block(block).is_repeatable(),
      MultiplexId::Rule(_) => false,
    };
    if !loops && !self.flags.multiplex(mux).nullable {
      return None;
    }

    let node = self.table.multiplex(mux);
    let content = node.first.without_epsilon();
    let entering = self.work.append(&content, &node.follow);
    let found = search(&entering, &node.follow, self.max_depth, self.max_depth);
    self.work.put(entering);
    self.work.put(content);
    Some(found)
  }
}

impl<S: LookaheadSet> Visitor for ConflictVisitor<'_, S> {
  fn visit_rule(&mut self, grammar: &Grammar, rule: RuleId) {
    self.inspect(grammar, rule.into());
    walk_multiplex(self, grammar, rule.into());
  }

  fn visit_block(&mut self, grammar: &Grammar, block: BlockId) {
    self.inspect(grammar, block.into());
    walk_multiplex(self, grammar, block.into());
  }
}
