//! Nullable, productive, reachable and used markers.
//!
//! Each marker only ever goes from false to true, so the whole-tree passes
//! below reach a fixpoint in at most one pass per node.

use crate::diagnostics::{Diagnostics, Event, Family};
use crate::grammar::{
  AltId, BlockId, Grammar, MultiplexId, RuleId, TermId, TermKind, TokenId,
};
use crate::visit::{
  fixpoint, walk_alternative, walk_multiplex, CancelToken, Fixpoint, Interrupted, Visitor,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
  pub nullable: bool,
  pub productive: bool,
  pub reachable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermFlags {
  pub nullable: bool,
  pub productive: bool,
  pub reachable: bool,
  /// every term before this one in its alternative is nullable
  pub prefix_nullable: bool,
  /// every term after this one in its alternative is nullable
  pub suffix_nullable: bool,
}

/// A named grammar entity, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleRef {
  Nonterminal(RuleId),
  Terminal(TokenId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagTable {
  rules: Vec<Flags>,
  blocks: Vec<Flags>,
  alternatives: Vec<Flags>,
  terms: Vec<TermFlags>,
  token_reachable: Vec<bool>,
  rule_used: Vec<bool>,
  token_used: Vec<bool>,
  non_productive: Vec<RuleId>,
  unreachable: Vec<RuleRef>,
  unused: Vec<RuleRef>,
}

impl FlagTable {
  fn prepare(grammar: &Grammar) -> Self {
    FlagTable {
      rules: vec![Flags::default(); grammar.rule_count()],
      blocks: vec![Flags::default(); grammar.block_count()],
      alternatives: vec![Flags::default(); grammar.alternative_count()],
      terms: vec![TermFlags::default(); grammar.term_count()],
      token_reachable: vec![false; grammar.token_count()],
      rule_used: vec![false; grammar.rule_count()],
      token_used: vec![false; grammar.token_count()],
      non_productive: vec![],
      unreachable: vec![],
      unused: vec![],
    }
  }

  pub fn rule(&self, id: RuleId) -> Flags {
    self.rules[id.index()]
  }

  pub fn block(&self, id: BlockId) -> Flags {
    self.blocks[id.index()]
  }

  pub fn multiplex(&self, id: MultiplexId) -> Flags {
    match id {
      MultiplexId::Rule(rule) => self.rule(rule),
      MultiplexId::Block(block) => self.block(block),
    }
  }

  pub fn alternative(&self, id: AltId) -> Flags {
    self.alternatives[id.index()]
  }

  pub fn term(&self, id: TermId) -> TermFlags {
    self.terms[id.index()]
  }

  pub fn is_token_reachable(&self, id: TokenId) -> bool {
    self.token_reachable[id.index()]
  }

  pub fn is_rule_used(&self, id: RuleId) -> bool {
    self.rule_used[id.index()]
  }

  pub fn is_token_used(&self, id: TokenId) -> bool {
    self.token_used[id.index()]
  }

  pub fn non_productive_rules(&self) -> &[RuleId] {
    &self.non_productive
  }

  pub fn unreachable_rules(&self) -> &[RuleRef] {
    &self.unreachable
  }

  pub fn unused_rules(&self) -> &[RuleRef] {
    &self.unused
  }

  fn multiplex_mut(&mut self, id: MultiplexId) -> &mut Flags {
    match id {
      MultiplexId::Rule(rule) => &mut self.rules[rule.index()],
      MultiplexId::Block(block) => &mut self.blocks[block.index()],
    }
  }
}

/// Sets `flag` when `value` holds; returns whether it flipped.
fn raise(flag: &mut bool, value: bool) -> bool {
  if value && !*flag {
    *flag = true;
    true
  } else {
    false
  }
}

pub(crate) fn compute(
  grammar: &Grammar,
  cancel: &CancelToken,
  sink: &mut dyn Diagnostics,
) -> Result<FlagTable, Interrupted> {
  let mut table = FlagTable::prepare(grammar);
  let family = Family::Flags;

  let passes = fixpoint(&mut NullableVisitor { table: &mut table, modified: false }, grammar, cancel)?;
  sink.event(&Event::Converged { family, attribute: "nullable", passes });
  PositionVisitor { table: &mut table }.visit_grammar(grammar, cancel)?;

  let passes = fixpoint(&mut ProductiveVisitor { table: &mut table, modified: false }, grammar, cancel)?;
  sink.event(&Event::Converged { family, attribute: "productive", passes });

  if let Some(start) = grammar.start_rule() {
    table.rules[start.index()].reachable = true;
  }
  let passes = fixpoint(&mut ReachableVisitor { table: &mut table, modified: false }, grammar, cancel)?;
  sink.event(&Event::Converged { family, attribute: "reachable", passes });

  UsedVisitor { table: &mut table }.visit_grammar(grammar, cancel)?;

  collect_reports(grammar, &mut table);
  Ok(table)
}

fn collect_reports(grammar: &Grammar, table: &mut FlagTable) {
  table.non_productive = grammar.rule_ids()
    .filter(|&r| !table.rules[r.index()].productive)
    .collect();

  let rules = grammar.rule_ids()
    .filter(|&r| !table.rules[r.index()].reachable)
    .map(RuleRef::Nonterminal);
  let tokens = grammar.token_ids()
    .filter(|&t| !table.token_reachable[t.index()])
    .map(RuleRef::Terminal);
  table.unreachable = rules.chain(tokens).collect();

  let rules = grammar.rule_ids()
    .filter(|&r| !table.rule_used[r.index()])
    .map(RuleRef::Nonterminal);
  let tokens = grammar.token_ids()
    .filter(|&t| !table.token_used[t.index()])
    .map(RuleRef::Terminal);
  table.unused = rules.chain(tokens).collect();
}

struct NullableVisitor<'a> {
  table: &'a mut FlagTable,
  modified: bool,
}

impl NullableVisitor<'_> {
  fn term_nullable(&self, grammar: &Grammar, term: TermId) -> bool {
    match grammar.term(term).kind() {
      TermKind::Terminal(_) => false,
      TermKind::Nonterminal(rule) => self.table.rules[rule.index()].nullable,
      TermKind::Block(block) => self.table.blocks[block.index()].nullable,
    }
  }

  fn update_multiplex(&mut self, grammar: &Grammar, mux: MultiplexId, optional: bool) {
    let nullable = optional || grammar.multiplex(mux).alternatives().iter()
      .any(|alt| self.table.alternatives[alt.index()].nullable);
    self.modified |= raise(&mut self.table.multiplex_mut(mux).nullable, nullable);
  }
}

impl Visitor for NullableVisitor<'_> {
  fn visit_rule(&mut self, grammar: &Grammar, rule: RuleId) {
    walk_multiplex(self, grammar, rule.into());
    self.update_multiplex(grammar, rule.into(), false);
  }

  fn visit_block(&mut self, grammar: &Grammar, block: BlockId) {
    walk_multiplex(self, grammar, block.into());
    self.update_multiplex(grammar, block.into(), grammar.block(block).is_optional());
  }

  fn visit_alternative(&mut self, grammar: &Grammar, alt: AltId) {
    walk_alternative(self, grammar, alt);
    let mut nullable = true;
    for &term in grammar.alternative(alt).terms() {
      let value = self.term_nullable(grammar, term);
      self.modified |= raise(&mut self.table.terms[term.index()].nullable, value);
      nullable &= value;
    }
    self.modified |= raise(&mut self.table.alternatives[alt.index()].nullable, nullable);
  }
}

impl Fixpoint for NullableVisitor<'_> {
  fn take_modified(&mut self) -> bool {
    std::mem::replace(&mut self.modified, false)
  }
}

/// Derives prefix/suffix nullability once nullability has settled.
struct PositionVisitor<'a> {
  table: &'a mut FlagTable,
}

impl Visitor for PositionVisitor<'_> {
  fn visit_alternative(&mut self, grammar: &Grammar, alt: AltId) {
    walk_alternative(self, grammar, alt);
    let terms = grammar.alternative(alt).terms();

    let mut prefix = true;
    for &term in terms {
      self.table.terms[term.index()].prefix_nullable = prefix;
      prefix &= self.table.terms[term.index()].nullable;
    }

    let mut suffix = true;
    for &term in terms.iter().rev() {
      self.table.terms[term.index()].suffix_nullable = suffix;
      suffix &= self.table.terms[term.index()].nullable;
    }
  }
}

struct ProductiveVisitor<'a> {
  table: &'a mut FlagTable,
  modified: bool,
}

impl ProductiveVisitor<'_> {
  fn term_productive(&self, grammar: &Grammar, term: TermId) -> bool {
    match grammar.term(term).kind() {
      TermKind::Terminal(_) => true,
      TermKind::Nonterminal(rule) => self.table.rules[rule.index()].productive,
      TermKind::Block(block) => self.table.blocks[block.index()].productive,
    }
  }

  fn update_multiplex(&mut self, grammar: &Grammar, mux: MultiplexId, optional: bool) {
    let productive = optional || grammar.multiplex(mux).alternatives().iter()
      .any(|alt| self.table.alternatives[alt.index()].productive);
    self.modified |= raise(&mut self.table.multiplex_mut(mux).productive, productive);
  }
}

impl Visitor for ProductiveVisitor<'_> {
  fn visit_rule(&mut self, grammar: &Grammar, rule: RuleId) {
    walk_multiplex(self, grammar, rule.into());
    self.update_multiplex(grammar, rule.into(), false);
  }

  fn visit_block(&mut self, grammar: &Grammar, block: BlockId) {
    walk_multiplex(self, grammar, block.into());
    self.update_multiplex(grammar, block.into(), grammar.block(block).is_optional());
  }

  fn visit_alternative(&mut self, grammar: &Grammar, alt: AltId) {
    walk_alternative(self, grammar, alt);
    let mut productive = true;
    for &term in grammar.alternative(alt).terms() {
      let value = self.term_productive(grammar, term);
      self.modified |= raise(&mut self.table.terms[term.index()].productive, value);
      productive &= value;
    }
    self.modified |= raise(&mut self.table.alternatives[alt.index()].productive, productive);
  }
}

impl Fixpoint for ProductiveVisitor<'_> {
  fn take_modified(&mut self) -> bool {
    std::mem::replace(&mut self.modified, false)
  }
}

struct ReachableVisitor<'a> {
  table: &'a mut FlagTable,
  modified: bool,
}

impl ReachableVisitor<'_> {
  fn spread(&mut self, grammar: &Grammar, mux: MultiplexId) {
    if !self.table.multiplex_mut(mux).reachable {
      return;
    }
    for &alt in grammar.multiplex(mux).alternatives() {
      self.modified |= raise(&mut self.table.alternatives[alt.index()].reachable, true);
    }
  }
}

impl Visitor for ReachableVisitor<'_> {
  fn visit_rule(&mut self, grammar: &Grammar, rule: RuleId) {
    self.spread(grammar, rule.into());
    walk_multiplex(self, grammar, rule.into());
  }

  fn visit_block(&mut self, grammar: &Grammar, block: BlockId) {
    self.spread(grammar, block.into());
    walk_multiplex(self, grammar, block.into());
  }

  fn visit_alternative(&mut self, grammar: &Grammar, alt: AltId) {
    if self.table.alternatives[alt.index()].reachable {
      for &term in grammar.alternative(alt).terms() {
        let table = &mut *self.table;
        let mut modified = raise(&mut table.terms[term.index()].reachable, true);
        modified |= match grammar.term(term).kind() {
          TermKind::Terminal(token) => raise(&mut table.token_reachable[token.index()], true),
          TermKind::Nonterminal(rule) => raise(&mut table.rules[rule.index()].reachable, true),
          TermKind::Block(block) => raise(&mut table.blocks[block.index()].reachable, true),
        };
        self.modified |= modified;
      }
    }
    walk_alternative(self, grammar, alt);
  }
}

impl Fixpoint for ReachableVisitor<'_> {
  fn take_modified(&mut self) -> bool {
    std::mem::replace(&mut self.modified, false)
  }
}

/// Single pass: a rule is used once any term names it. The start rule
/// counts as used.
struct UsedVisitor<'a> {
  table: &'a mut FlagTable,
}

impl Visitor for UsedVisitor<'_> {
  fn visit_grammar(&mut self, grammar: &Grammar, cancel: &CancelToken) -> Result<(), Interrupted> {
    cancel.check()?;
    if let Some(start) = grammar.start_rule() {
      self.table.rule_used[start.index()] = true;
    }
    crate::visit::walk_grammar(self, grammar);
    Ok(())
  }

  fn visit_terminal(&mut self, _: &Grammar, _: TermId, token: TokenId) {
    self.table.token_used[token.index()] = true;
  }

  fn visit_nonterminal(&mut self, _: &Grammar, _: TermId, rule: RuleId) {
    self.table.rule_used[rule.index()] = true;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::builder::*;
  use pretty_assertions::assert_eq;

  fn flags(g: &Grammar) -> FlagTable {
    compute(g, &CancelToken::new(), &mut Vec::<Event>::new()).unwrap()
  }

  fn alt(g: &Grammar, rule: &str, index: usize) -> AltId {
    g.rule(g.rule_by_name(rule).unwrap()).alternatives()[index]
  }

  #[test]
  fn simple_nullable() {
    let g = grammar(&["a", "c", "d"], &[
      ("Z", sym("d") | seq([sym("X"), sym("Y"), sym("Z")])),
      ("Y", empty() | sym("c")),
      ("X", sym("Y") | sym("a")),
    ]).build().unwrap();

    let table = flags(&g);
    let nullable = g.rule_ids()
      .map(|r| table.rule(r).nullable)
      .collect::<Vec<_>>();

    assert_eq!(nullable, vec![false, true, true]);
  }

  #[test]
  fn alternative_nullable_and_productive() {
    let g = grammar(&["x"], &[
      ("s", empty() | sym("x") | sym("n") | seq([sym("n"), sym("x")]) | sym("loop")),
      ("n", sym("x") | empty()),
      ("loop", seq([sym("x"), sym("loop")])),
    ]).build().unwrap();

    let table = flags(&g);
    let summary = (0..5)
      .map(|i| {
        let f = table.alternative(alt(&g, "s", i));
        (f.nullable, f.productive)
      })
      .collect::<Vec<_>>();

    assert_eq!(summary, vec![
      (true, true),
      (false, true),
      (true, true),
      (false, true),
      (false, false),
    ]);
    assert_eq!(table.non_productive_rules(), &[g.rule_by_name("loop").unwrap()]);
  }

  #[test]
  fn optional_blocks_are_nullable_and_productive() {
    let g = grammar(&["x"], &[
      ("s", seq([option(sym("t")), many(sym("x"))])),
      ("t", seq([sym("x"), sym("t")])),
    ]).build().unwrap();

    let table = flags(&g);
    let s = g.rule_by_name("s").unwrap();

    assert!(table.rule(s).nullable);
    assert!(table.rule(s).productive);
    assert!(table.block(crate::grammar::BlockId(0)).nullable);
    assert!(table.block(crate::grammar::BlockId(0)).productive);
    assert!(!table.alternative(g.block(crate::grammar::BlockId(0)).alternatives()[0]).productive);
    assert!(!table.rule(g.rule_by_name("t").unwrap()).productive);
  }

  #[test]
  fn prefix_and_suffix() {
    let g = grammar(&["x"], &[
      ("s", seq([sym("e"), sym("x"), sym("e"), sym("e")])),
      ("e", empty()),
    ]).build().unwrap();

    let table = flags(&g);
    let positions = g.alternative(alt(&g, "s", 0)).terms().iter()
      .map(|&t| (table.term(t).prefix_nullable, table.term(t).suffix_nullable))
      .collect::<Vec<_>>();

    assert_eq!(positions, vec![
      (true, false),
      (true, true),
      (false, true),
      (false, true),
    ]);
  }

  #[test]
  fn reachable_and_used() {
    let g = grammar(&["x", "y", "z"], &[
      ("s", seq([sym("x"), option(sym("a"))])),
      ("a", sym("y")),
      ("b", seq([sym("z"), sym("c")])),
      ("c", sym("b")),
    ]).build().unwrap();

    let table = flags(&g);
    let id = |name: &str| g.rule_by_name(name).unwrap();

    assert!(table.rule(id("a")).reachable);
    assert!(table.block(crate::grammar::BlockId(0)).reachable);
    assert_eq!(table.unreachable_rules(), &[
      RuleRef::Nonterminal(id("b")),
      RuleRef::Nonterminal(id("c")),
      RuleRef::Terminal(g.token_by_name("z").unwrap()),
    ]);
    assert!(table.is_rule_used(id("s")));
    assert!(table.is_rule_used(id("b")));
    assert!(table.unused_rules().is_empty());
    assert!(table.is_token_used(g.token_by_name("z").unwrap()));
    assert!(!table.is_token_reachable(g.token_by_name("z").unwrap()));
  }

  #[test]
  fn unused_rules_and_tokens() {
    let g = grammar(&["x", "w"], &[
      ("s", sym("x")),
      ("orphan", sym("x")),
    ]).build().unwrap();

    let table = flags(&g);

    assert_eq!(table.unused_rules(), &[
      RuleRef::Nonterminal(g.rule_by_name("orphan").unwrap()),
      RuleRef::Terminal(g.token_by_name("w").unwrap()),
    ]);
  }

  #[test]
  fn cancellation_surfaces_as_interrupt() {
    let g = grammar(&["x"], &[("s", sym("x"))]).build().unwrap();
    let token = CancelToken::new();
    token.cancel();

    assert_eq!(compute(&g, &token, &mut Vec::<Event>::new()), Err(Interrupted));
  }

  #[test]
  fn reports_pass_counts() {
    let g = grammar(&["x"], &[
      ("s", sym("t")),
      ("t", sym("u") | empty()),
      ("u", sym("x")),
    ]).build().unwrap();
    let mut events: Vec<Event> = Vec::new();

    compute(&g, &CancelToken::new(), &mut events).unwrap();

    assert_eq!(events[0], Event::Converged {
      family: Family::Flags,
      attribute: "nullable",
      passes: 3,
    });
  }

  /// Every marker set in `earlier` is still set in `later`.
  fn only_raised(earlier: &FlagTable, later: &FlagTable) -> bool {
    let kept = |e: &Flags, l: &Flags| {
      (!e.nullable || l.nullable) && (!e.productive || l.productive) && (!e.reachable || l.reachable)
    };
    earlier.rules.iter().zip(&later.rules)
      .chain(earlier.blocks.iter().zip(&later.blocks))
      .chain(earlier.alternatives.iter().zip(&later.alternatives))
      .all(|(e, l)| kept(e, l))
      && earlier.terms.iter().zip(&later.terms).all(|(e, l)| {
        (!e.nullable || l.nullable) && (!e.productive || l.productive) && (!e.reachable || l.reachable)
      })
      && earlier.token_reachable.iter().zip(&later.token_reachable).all(|(&e, &l)| !e || l)
  }

  /// Runs single passes until one changes nothing, checking each against
  /// the table it started from.
  fn by_pass(g: &Grammar, table: &mut FlagTable, mut pass: impl FnMut(&Grammar, &mut FlagTable) -> bool) -> usize {
    let mut passes = 0;
    loop {
      let before = table.clone();
      let changed = pass(g, table);
      passes += 1;
      assert!(only_raised(&before, table), "pass {} lowered a marker", passes);
      if !changed {
        assert_eq!(before, *table);
        return passes;
      }
    }
  }

  #[test]
  fn passes_only_raise_markers() {
    let g = grammar(&["x", "y"], &[
      ("s", seq([sym("a"), many(sym("x"))]) | seq([sym("s"), sym("x")])),
      ("c", sym("x") | empty()),
      ("b", seq([sym("c"), sym("c")])),
      ("a", sym("b") | sym("y")),
    ]).build().unwrap();
    let cancel = CancelToken::new();
    let mut table = FlagTable::prepare(&g);

    let nullable = by_pass(&g, &mut table, |g, table| {
      let mut visitor = NullableVisitor { table, modified: false };
      visitor.visit_grammar(g, &cancel).unwrap();
      visitor.take_modified()
    });
    let productive = by_pass(&g, &mut table, |g, table| {
      let mut visitor = ProductiveVisitor { table, modified: false };
      visitor.visit_grammar(g, &cancel).unwrap();
      visitor.take_modified()
    });
    table.rules[0].reachable = true;
    let reachable = by_pass(&g, &mut table, |g, table| {
      let mut visitor = ReachableVisitor { table, modified: false };
      visitor.visit_grammar(g, &cancel).unwrap();
      visitor.take_modified()
    });

    assert_eq!((nullable, productive, reachable), (4, 4, 4));
    assert!(g.rule_ids().all(|r| {
      let f = table.rule(r);
      f.nullable && f.productive && f.reachable
    }));
  }
}
