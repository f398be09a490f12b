//! Follow in three passes: suffix Firsts with their context-free part folded
//! into the referenced rules, a fixpoint over reference sites, and a final
//! push-down onto alternatives and terms.

use std::mem;
use crate::grammar::{AltId, BlockId, Grammar, MultiplexId, RuleId, TermId, TermKind};
use crate::sets::LookaheadSet;
use crate::visit::{fixpoint, walk_alternative, walk_multiplex, CancelToken, Fixpoint, Interrupted, Visitor};
use super::lookahead::{LookaheadTable, Workspace};

pub(crate) fn compute<S: LookaheadSet>(
  grammar: &Grammar,
  table: &mut LookaheadTable<S>,
  work: &mut Workspace<S>,
  cancel: &CancelToken,
) -> Result<usize, Interrupted> {
  SuffixVisitor { table: &mut *table, work: &mut *work }.visit_grammar(grammar, cancel)?;

  let mut visitor = FollowVisitor {
    table: &mut *table,
    work: &mut *work,
    modified: false,
  };
  let passes = fixpoint(&mut visitor, grammar, cancel)?;

  PushDownVisitor { table, work }.visit_grammar(grammar, cancel)?;
  Ok(passes)
}

/// What may come after the end of an alternative of `mux`. Inside a
/// repeatable block that is either another round of the block or whatever
/// follows it.
pub(crate) fn context_follow<S: LookaheadSet>(
  grammar: &Grammar,
  table: &LookaheadTable<S>,
  work: &mut Workspace<S>,
  mux: MultiplexId,
) -> S {
  let node = table.multiplex(mux);
  let mut follow = work.get();
  follow.union_with(&node.follow);
  if let MultiplexId::Block(block) = mux {
    if grammar.block(block).is_repeatable() {
      let again = work.append(&node.first, &node.follow);
      follow.union_with(&again);
      work.put(again);
    }
  }
  follow
}

/// Follow contribution of one occurrence: what comes after it inside its
/// alternative, then the alternative's context.
fn site_follow<S: LookaheadSet>(
  grammar: &Grammar,
  table: &LookaheadTable<S>,
  work: &mut Workspace<S>,
  term: TermId,
) -> S {
  let mux = grammar.parent_multiplex(grammar.term(term).parent());
  let context = context_follow(grammar, table, work, mux);
  let follow = work.append(&table.terms[term.index()].suffix_first, &context);
  work.put(context);
  follow
}

struct SuffixVisitor<'a, S> {
  table: &'a mut LookaheadTable<S>,
  work: &'a mut Workspace<S>,
}

impl<S: LookaheadSet> Visitor for SuffixVisitor<'_, S> {
  fn visit_alternative(&mut self, grammar: &Grammar, alt: AltId) {
    walk_alternative(self, grammar, alt);
    let terms = grammar.alternative(alt).terms();
    let nothing = self.work.get();

    for (i, &term) in terms.iter().enumerate() {
      let table = &mut *self.table;
      let suffix = self.work.sequence_first(terms[i + 1..].iter().map(|t| &table.terms[t.index()].first));
      let provisional = self.work.append(&suffix, &nothing);

      match grammar.term(term).kind() {
        TermKind::Terminal(_) => {}
        TermKind::Nonterminal(rule) => {
          table.rules[rule.index()].follow.union_with(&provisional);
        }
        TermKind::Block(block) => {
          table.blocks[block.index()].follow.union_with(&provisional);
        }
      }
      self.work.put(provisional);

      let old = mem::replace(&mut table.terms[term.index()].suffix_first, suffix);
      self.work.put(old);
    }

    self.work.put(nothing);
  }
}

struct FollowVisitor<'a, S> {
  table: &'a mut LookaheadTable<S>,
  work: &'a mut Workspace<S>,
  modified: bool,
}

impl<S: LookaheadSet> FollowVisitor<'_, S> {
  fn update(&mut self, grammar: &Grammar, mux: MultiplexId, sites: &[TermId]) {
    for &term in sites {
      let follow = site_follow(grammar, self.table, self.work, term);
      self.modified |= self.table.multiplex_mut(mux).follow.union_with(&follow);
      self.work.put(follow);
    }
  }
}

impl<S: LookaheadSet> Visitor for FollowVisitor<'_, S> {
  fn visit_rule(&mut self, grammar: &Grammar, rule: RuleId) {
    self.update(grammar, rule.into(), grammar.rule(rule).references());
    walk_multiplex(self, grammar, rule.into());
  }

  fn visit_block(&mut self, grammar: &Grammar, block: BlockId) {
    self.update(grammar, block.into(), &[grammar.block(block).term()]);
    walk_multiplex(self, grammar, block.into());
  }
}

impl<S: LookaheadSet> Fixpoint for FollowVisitor<'_, S> {
  fn take_modified(&mut self) -> bool {
    mem::replace(&mut self.modified, false)
  }
}

struct PushDownVisitor<'a, S> {
  table: &'a mut LookaheadTable<S>,
  work: &'a mut Workspace<S>,
}

impl<S: LookaheadSet> Visitor for PushDownVisitor<'_, S> {
  fn visit_alternative(&mut self, grammar: &Grammar, alt: AltId) {
    let context = context_follow(grammar, self.table, self.work, grammar.parent_multiplex(alt));

    for &term in grammar.alternative(alt).terms() {
      let follow = self.work.append(&self.table.terms[term.index()].suffix_first, &context);
      self.table.terms[term.index()].follow.union_with(&follow);
      self.work.put(follow);
    }
    self.table.alternatives[alt.index()].follow.union_with(&context);
    self.work.put(context);

    walk_alternative(self, grammar, alt);
  }
}
