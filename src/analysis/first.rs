use std::mem;
use crate::grammar::{AltId, BlockId, Grammar, MultiplexId, RuleId, TermKind};
use crate::sets::LookaheadSet;
use crate::visit::{fixpoint, walk_alternative, walk_multiplex, CancelToken, Fixpoint, Interrupted, Visitor};
use super::lookahead::{LookaheadTable, Workspace};

pub(crate) fn compute<S: LookaheadSet>(
  grammar: &Grammar,
  table: &mut LookaheadTable<S>,
  work: &mut Workspace<S>,
  cancel: &CancelToken,
) -> Result<usize, Interrupted> {
  let mut visitor = FirstVisitor {
    table,
    work,
    modified: false,
  };
  fixpoint(&mut visitor, grammar, cancel)
}

struct FirstVisitor<'a, S> {
  table: &'a mut LookaheadTable<S>,
  work: &'a mut Workspace<S>,
  modified: bool,
}

impl<S: LookaheadSet> FirstVisitor<'_, S> {
  fn update_multiplex(&mut self, grammar: &Grammar, mux: MultiplexId) {
    let mut first = self.work.get();
    for &alt in grammar.multiplex(mux).alternatives() {
      first.union_with(&self.table.alternatives[alt.index()].first);
    }

    if let MultiplexId::Block(block) = mux {
      let block = grammar.block(block);
      if block.is_optional() {
        first.union_with(self.work.epsilon());
      }
      if block.is_repeatable() {
        self.close(&mut first);
      }
    }

    self.modified |= self.table.multiplex_mut(mux).first.union_with(&first);
    self.work.put(first);
  }

  /// Folds in one more repetition until nothing new appears.
  fn close(&mut self, first: &mut S) {
    loop {
      let repeated = self.work.append(&*first, &*first);
      let changed = first.union_with(&repeated);
      self.work.put(repeated);
      if !changed {
        break;
      }
    }
  }
}

impl<S: LookaheadSet> Visitor for FirstVisitor<'_, S> {
  fn visit_rule(&mut self, grammar: &Grammar, rule: RuleId) {
    walk_multiplex(self, grammar, rule.into());
    self.update_multiplex(grammar, rule.into());
  }

  fn visit_block(&mut self, grammar: &Grammar, block: BlockId) {
    walk_multiplex(self, grammar, block.into());
    self.update_multiplex(grammar, block.into());
  }

  fn visit_alternative(&mut self, grammar: &Grammar, alt: AltId) {
    walk_alternative(self, grammar, alt);
    let terms = grammar.alternative(alt).terms();

    let table = &mut *self.table;
    for &term in terms {
      let first = match grammar.term(term).kind() {
        TermKind::Terminal(_) => continue,
        TermKind::Nonterminal(rule) => &table.rules[rule.index()].first,
        TermKind::Block(block) => &table.blocks[block.index()].first,
      };
      self.modified |= table.terms[term.index()].first.union_with(first);
    }

    let first = self.work.sequence_first(terms.iter().map(|t| &table.terms[t.index()].first));
    self.modified |= table.alternatives[alt.index()].first.union_with(&first);
    self.work.put(first);
  }
}

impl<S: LookaheadSet> Fixpoint for FirstVisitor<'_, S> {
  fn take_modified(&mut self) -> bool {
    mem::replace(&mut self.modified, false)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::builder::*;
  use crate::grammar::BlockId;
  use crate::sets::{BiasedBitSet, LLStringSet, Shape};
  use crate::analysis::lookahead::LookaheadTable;
  use insta::assert_snapshot;
  use pretty_assertions::assert_eq;

  fn first<S: LookaheadSet>(g: &Grammar, k: usize) -> LookaheadTable<S> {
    let shape = Shape::new(k, g.max_symbol());
    let mut table = LookaheadTable::prepare(g, &shape);
    let mut work = Workspace::new(&shape, 8);
    compute(g, &mut table, &mut work, &CancelToken::new()).unwrap();
    table
  }

  fn rule_first<S: LookaheadSet>(g: &Grammar, table: &LookaheadTable<S>, name: &str) -> String {
    g.describe(table.rule(g.rule_by_name(name).unwrap()).first())
  }

  #[test]
  fn nullable_prefix_runs() {
    let g = grammar(&["x", "y", "z"], &[
      ("s", seq([sym("a"), sym("b"), sym("z")])),
      ("a", sym("x") | empty()),
      ("b", sym("y") | empty()),
    ]).build().unwrap();

    let table = first::<BiasedBitSet>(&g, 1);

    assert_snapshot!(rule_first(&g, &table, "s"), @"{x, y, z}");
    assert_snapshot!(rule_first(&g, &table, "a"), @"{<epsilon>, x}");
  }

  #[test]
  fn left_recursion_settles() {
    let g = grammar(&["x", "y"], &[
      ("a", seq([sym("a"), sym("x")]) | sym("y")),
    ]).build().unwrap();

    assert_snapshot!(rule_first(&g, &first::<BiasedBitSet>(&g, 1), "a"), @"{y}");
    assert_snapshot!(rule_first(&g, &first::<LLStringSet>(&g, 2), "a"), @"{[y], [y x]}");
  }

  #[test]
  fn repetition_is_closed() {
    let g = grammar(&["x", "y"], &[
      ("s", seq([many(sym("x") | sym("y")), sym("y")])),
    ]).build().unwrap();

    let table = first::<LLStringSet>(&g, 2);

    assert_snapshot!(g.describe(table.block(BlockId(0)).first()),
      @"{[], [x], [x x], [x y], [y], [y x], [y y]}");
    assert_snapshot!(rule_first(&g, &table, "s"),
      @"{[x x], [x y], [y], [y x], [y y]}");
  }

  #[test]
  fn optional_block_adds_epsilon() {
    let g = grammar(&["x", "y"], &[
      ("s", seq([option(sym("x")), sym("y")])),
    ]).build().unwrap();

    let table = first::<BiasedBitSet>(&g, 1);

    assert_snapshot!(g.describe(table.block(BlockId(0)).first()), @"{<epsilon>, x}");
    assert_snapshot!(rule_first(&g, &table, "s"), @"{x, y}");
  }

  #[test]
  fn passes_only_add_strings() {
    let g = grammar(&["x", "y"], &[
      ("s", seq([sym("a"), many(sym("x") | sym("b"))]) | seq([sym("s"), sym("y")])),
      ("b", seq([sym("a"), sym("x")])),
      ("a", seq([sym("a"), sym("x")]) | sym("y")),
    ]).build().unwrap();
    let shape = Shape::new(2, g.max_symbol());
    let mut table = LookaheadTable::<LLStringSet>::prepare(&g, &shape);
    let mut work = Workspace::new(&shape, 8);
    let cancel = CancelToken::new();

    let mut passes = 0;
    loop {
      let before = table.clone();
      let mut visitor = FirstVisitor { table: &mut table, work: &mut work, modified: false };
      visitor.visit_grammar(&g, &cancel).unwrap();
      let changed = visitor.take_modified();
      passes += 1;

      assert!(table.includes(&before), "pass {} dropped a string", passes);
      if !changed {
        assert_eq!(table, before);
        break;
      }
    }

    assert!(passes > 2);
    assert_snapshot!(rule_first(&g, &table, "s"), @"{[y], [y x], [y y]}");
  }
}
