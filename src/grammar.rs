//! Arena representation of a grammar.
//!
//! Nodes of each kind live in their own vector and refer to each other by
//! id: parent links, the rule a nonterminal names, and the list of places a
//! rule is referenced from. Computed attributes are kept in side tables
//! (see `analysis`) so the structure itself stays immutable while a
//! calculator runs.

use std::borrow::Cow;
use anyhow::{bail, ensure, Result};
use indexmap::IndexMap;
use crate::analysis::Attributes;
use crate::analysis::flags::FlagTable;
use crate::analysis::lookahead::LookaheadTable;
use crate::sets::{BiasedBitSet, LLStringSet, LookaheadSet, PositionalLLString};
use crate::symbol::{self, Symbol, MIN_TYPE};

pub mod builder;

pub use builder::{grammar, GrammarDef, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AltId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermId(pub(crate) u32);

impl RuleId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl TokenId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl BlockId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl AltId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl TermId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// A node owning an ordered list of alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiplexId {
  Rule(RuleId),
  Block(BlockId),
}

impl From<RuleId> for MultiplexId {
  fn from(id: RuleId) -> Self {
    MultiplexId::Rule(id)
  }
}

impl From<BlockId> for MultiplexId {
  fn from(id: BlockId) -> Self {
    MultiplexId::Block(id)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multiplex {
  alternatives: Vec<AltId>,
}

impl Multiplex {
  pub fn alternatives(&self) -> &[AltId] {
    &self.alternatives
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonterminalRule {
  name: String,
  body: Multiplex,
  /// nonterminal occurrences naming this rule
  references: Vec<TermId>,
}

impl NonterminalRule {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn alternatives(&self) -> &[AltId] {
    self.body.alternatives()
  }

  pub fn references(&self) -> &[TermId] {
    &self.references
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalRule {
  name: String,
  symbol: Symbol,
  references: Vec<TermId>,
}

impl TerminalRule {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn symbol(&self) -> Symbol {
    self.symbol
  }

  pub fn references(&self) -> &[TermId] {
    &self.references
  }
}

/// EBNF suffix of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
  One,
  /// `?`
  Optional,
  /// `*`
  ZeroOrMore,
  /// `+`
  OneOrMore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
  body: Multiplex,
  cardinality: Cardinality,
  greedy: bool,
  /// the occurrence of this block inside its enclosing alternative
  term: TermId,
}

impl Block {
  pub fn alternatives(&self) -> &[AltId] {
    self.body.alternatives()
  }

  pub fn cardinality(&self) -> Cardinality {
    self.cardinality
  }

  pub fn is_optional(&self) -> bool {
    matches!(self.cardinality, Cardinality::Optional | Cardinality::ZeroOrMore)
  }

  pub fn is_repeatable(&self) -> bool {
    matches!(self.cardinality, Cardinality::ZeroOrMore | Cardinality::OneOrMore)
  }

  pub fn is_greedy(&self) -> bool {
    self.greedy
  }

  pub fn term(&self) -> TermId {
    self.term
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
  parent: MultiplexId,
  terms: Vec<TermId>,
}

impl Alternative {
  pub fn parent(&self) -> MultiplexId {
    self.parent
  }

  pub fn terms(&self) -> &[TermId] {
    &self.terms
  }

  pub fn is_empty(&self) -> bool {
    self.terms.is_empty()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
  Terminal(TokenId),
  Nonterminal(RuleId),
  Block(BlockId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
  kind: TermKind,
  parent: AltId,
  position: usize,
}

impl Term {
  pub fn kind(&self) -> TermKind {
    self.kind
  }

  pub fn parent(&self) -> AltId {
    self.parent
  }

  /// Index of this term inside its alternative.
  pub fn position(&self) -> usize {
    self.position
  }
}

#[derive(Debug, Clone, Default)]
pub struct Grammar {
  rules: Vec<NonterminalRule>,
  tokens: Vec<TerminalRule>,
  blocks: Vec<Block>,
  alternatives: Vec<Alternative>,
  terms: Vec<Term>,
  rule_names: IndexMap<String, RuleId>,
  token_names: IndexMap<String, TokenId>,
  symbols: IndexMap<Symbol, TokenId>,
  pub(crate) attributes: Attributes,
}

impl Grammar {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declares a terminal with the next free symbol.
  pub fn add_token(&mut self, name: impl Into<String>) -> Result<TokenId> {
    let next = self.symbols.keys().copied().max().map_or(MIN_TYPE, |s| s + 1);
    self.add_token_with_symbol(name, next)
  }

  pub fn add_token_with_symbol(
    &mut self,
    name: impl Into<String>,
    symbol: Symbol,
  ) -> Result<TokenId> {
    let name = name.into();
    ensure!(symbol >= MIN_TYPE,
      "token `{}` uses reserved symbol {}", name, symbol);
    ensure!(!self.token_names.contains_key(&name),
      "token `{}` is declared twice", name);
    if let Some(&other) = self.symbols.get(&symbol) {
      bail!("tokens `{}` and `{}` share symbol {}",
        self.tokens[other.index()].name, name, symbol);
    }

    self.attributes.clear();
    let id = TokenId(self.tokens.len() as u32);
    self.tokens.push(TerminalRule {
      name: name.clone(),
      symbol,
      references: vec![],
    });
    self.token_names.insert(name, id);
    self.symbols.insert(symbol, id);
    Ok(id)
  }

  /// Declares a rule with no alternatives yet. The first rule declared is
  /// the start rule.
  pub fn add_rule(&mut self, name: impl Into<String>) -> Result<RuleId> {
    let name = name.into();
    ensure!(!self.rule_names.contains_key(&name),
      "rule `{}` is declared twice", name);

    self.attributes.clear();
    let id = RuleId(self.rules.len() as u32);
    self.rules.push(NonterminalRule {
      name: name.clone(),
      body: Multiplex::default(),
      references: vec![],
    });
    self.rule_names.insert(name, id);
    Ok(id)
  }

  pub fn add_alternative(&mut self, parent: impl Into<MultiplexId>) -> AltId {
    let parent = parent.into();
    self.attributes.clear();
    let id = AltId(self.alternatives.len() as u32);
    self.alternatives.push(Alternative {
      parent,
      terms: vec![],
    });
    self.multiplex_mut(parent).alternatives.push(id);
    id
  }

  fn push_term(&mut self, alt: AltId, kind: TermKind) -> TermId {
    self.attributes.clear();
    let id = TermId(self.terms.len() as u32);
    let position = self.alternatives[alt.index()].terms.len();
    self.terms.push(Term {
      kind,
      parent: alt,
      position,
    });
    self.alternatives[alt.index()].terms.push(id);
    id
  }

  pub fn add_terminal(&mut self, alt: AltId, token: TokenId) -> TermId {
    let id = self.push_term(alt, TermKind::Terminal(token));
    self.tokens[token.index()].references.push(id);
    id
  }

  pub fn add_nonterminal(&mut self, alt: AltId, rule: RuleId) -> TermId {
    let id = self.push_term(alt, TermKind::Nonterminal(rule));
    self.rules[rule.index()].references.push(id);
    id
  }

  pub fn add_block(&mut self, alt: AltId, cardinality: Cardinality, greedy: bool) -> BlockId {
    let id = BlockId(self.blocks.len() as u32);
    let term = self.push_term(alt, TermKind::Block(id));
    self.blocks.push(Block {
      body: Multiplex::default(),
      cardinality,
      greedy,
      term,
    });
    id
  }

  pub fn rule(&self, id: RuleId) -> &NonterminalRule {
    &self.rules[id.index()]
  }

  pub fn token(&self, id: TokenId) -> &TerminalRule {
    &self.tokens[id.index()]
  }

  pub fn block(&self, id: BlockId) -> &Block {
    &self.blocks[id.index()]
  }

  pub fn alternative(&self, id: AltId) -> &Alternative {
    &self.alternatives[id.index()]
  }

  pub fn term(&self, id: TermId) -> &Term {
    &self.terms[id.index()]
  }

  pub fn multiplex(&self, id: MultiplexId) -> &Multiplex {
    match id {
      MultiplexId::Rule(rule) => &self.rules[rule.index()].body,
      MultiplexId::Block(block) => &self.blocks[block.index()].body,
    }
  }

  fn multiplex_mut(&mut self, id: MultiplexId) -> &mut Multiplex {
    match id {
      MultiplexId::Rule(rule) => &mut self.rules[rule.index()].body,
      MultiplexId::Block(block) => &mut self.blocks[block.index()].body,
    }
  }

  pub fn rule_count(&self) -> usize {
    self.rules.len()
  }

  pub fn token_count(&self) -> usize {
    self.tokens.len()
  }

  pub fn block_count(&self) -> usize {
    self.blocks.len()
  }

  pub fn alternative_count(&self) -> usize {
    self.alternatives.len()
  }

  pub fn term_count(&self) -> usize {
    self.terms.len()
  }

  pub fn rule_ids(&self) -> impl Iterator<Item = RuleId> {
    (0..self.rules.len() as u32).map(RuleId)
  }

  pub fn token_ids(&self) -> impl Iterator<Item = TokenId> {
    (0..self.tokens.len() as u32).map(TokenId)
  }

  pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
    (0..self.blocks.len() as u32).map(BlockId)
  }

  /// Rules first, then blocks, each in declaration order.
  pub fn multiplex_ids(&self) -> impl Iterator<Item = MultiplexId> {
    self.rule_ids()
      .map(MultiplexId::Rule)
      .chain(self.block_ids().map(MultiplexId::Block))
  }

  pub fn start_rule(&self) -> Option<RuleId> {
    if self.rules.is_empty() {
      None
    } else {
      Some(RuleId(0))
    }
  }

  pub fn rule_by_name(&self, name: &str) -> Option<RuleId> {
    self.rule_names.get(name).copied()
  }

  pub fn token_by_name(&self, name: &str) -> Option<TokenId> {
    self.token_names.get(name).copied()
  }

  pub fn token_by_symbol(&self, symbol: Symbol) -> Option<TokenId> {
    self.symbols.get(&symbol).copied()
  }

  /// Largest symbol carried by a terminal, `MIN_TYPE` when there is none.
  pub fn max_symbol(&self) -> Symbol {
    self.tokens.iter().map(|t| t.symbol).max().unwrap_or(MIN_TYPE)
  }

  /// The multiplex owning `alt`.
  pub fn parent_multiplex(&self, alt: AltId) -> MultiplexId {
    self.alternative(alt).parent
  }

  /// The rule a node is nested in, walking up through blocks.
  pub fn owning_rule(&self, mut id: MultiplexId) -> RuleId {
    loop {
      match id {
        MultiplexId::Rule(rule) => return rule,
        MultiplexId::Block(block) => {
          let term = self.block(block).term;
          id = self.parent_multiplex(self.term(term).parent);
        }
      }
    }
  }

  pub fn symbol_name(&self, sym: Symbol) -> Cow<'_, str> {
    if let Some(name) = symbol::reserved_name(sym) {
      return Cow::Borrowed(name);
    }
    match self.token_by_symbol(sym) {
      Some(token) => Cow::Borrowed(&self.tokens[token.index()].name),
      None => Cow::Owned(format!("<{}>", sym)),
    }
  }

  /// Renders a lookahead set with token names.
  pub fn describe<S: LookaheadSet>(&self, set: &S) -> String {
    set.format_with(&|sym: Symbol| self.symbol_name(sym).into_owned())
  }

  pub fn describe_multiplex(&self, id: MultiplexId) -> String {
    match id {
      MultiplexId::Rule(rule) => self.rule(rule).name.clone(),
      MultiplexId::Block(block) => {
        let rule = self.owning_rule(id);
        format!("{} (block {})", self.rule(rule).name, block.0)
      }
    }
  }

  pub fn flags(&self) -> Option<&FlagTable> {
    self.attributes.flags.as_ref()
  }

  pub fn first_follow(&self) -> Option<&LookaheadTable<BiasedBitSet>> {
    self.attributes.ll1.as_ref()
  }

  pub fn first_follow_k(&self) -> Option<&LookaheadTable<LLStringSet>> {
    self.attributes.llk.as_ref()
  }

  pub fn first_follow_kl(&self) -> Option<&LookaheadTable<PositionalLLString>> {
    self.attributes.llkl.as_ref()
  }

  /// Drops every computed attribute.
  pub fn clear_attributes(&mut self) {
    self.attributes.clear();
  }

  /// Checks the structural invariants the calculators rely on.
  pub fn validate(&self) -> Result<()> {
    for (i, rule) in self.rules.iter().enumerate() {
      let id = MultiplexId::Rule(RuleId(i as u32));
      self.validate_multiplex(id, &rule.body)?;
      for &term in &rule.references {
        ensure!(term.index() < self.terms.len(),
          "rule `{}` is referenced from missing term {}", rule.name, term.0);
        ensure!(self.term(term).kind == TermKind::Nonterminal(RuleId(i as u32)),
          "rule `{}` lists term {} which does not name it", rule.name, term.0);
      }
    }

    for (i, block) in self.blocks.iter().enumerate() {
      let id = BlockId(i as u32);
      self.validate_multiplex(MultiplexId::Block(id), &block.body)?;
      ensure!(block.term.index() < self.terms.len()
        && self.term(block.term).kind == TermKind::Block(id),
        "block {} is not attached to its occurrence", i);
    }

    for (i, alt) in self.alternatives.iter().enumerate() {
      for (position, &term) in alt.terms.iter().enumerate() {
        ensure!(term.index() < self.terms.len(),
          "alternative {} holds missing term {}", i, term.0);
        let node = self.term(term);
        ensure!(node.parent == AltId(i as u32) && node.position == position,
          "term {} has a stale parent link", term.0);
      }
    }

    for (i, term) in self.terms.iter().enumerate() {
      let id = TermId(i as u32);
      match term.kind {
        TermKind::Terminal(token) => {
          ensure!(token.index() < self.tokens.len(),
            "term {} names missing token {}", i, token.0);
          ensure!(self.token(token).references.contains(&id),
            "token `{}` misses reference {}", self.token(token).name, i);
        }
        TermKind::Nonterminal(rule) => {
          ensure!(rule.index() < self.rules.len(),
            "term {} names missing rule {}", i, rule.0);
          ensure!(self.rule(rule).references.contains(&id),
            "rule `{}` misses reference {}", self.rule(rule).name, i);
        }
        TermKind::Block(block) => {
          ensure!(block.index() < self.blocks.len(),
            "term {} names missing block {}", i, block.0);
        }
      }
    }

    for token in &self.tokens {
      ensure!(token.symbol >= MIN_TYPE,
        "token `{}` uses reserved symbol {}", token.name, token.symbol);
    }

    Ok(())
  }

  fn validate_multiplex(&self, id: MultiplexId, body: &Multiplex) -> Result<()> {
    for &alt in &body.alternatives {
      ensure!(alt.index() < self.alternatives.len(),
        "{:?} holds missing alternative {}", id, alt.0);
      ensure!(self.alternative(alt).parent == id,
        "alternative {} has a stale parent link", alt.0);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn expr() -> Grammar {
    let mut g = Grammar::new();
    let num = g.add_token("num").unwrap();
    let plus = g.add_token("+").unwrap();
    let e = g.add_rule("e").unwrap();
    let t = g.add_rule("t").unwrap();

    let alt = g.add_alternative(e);
    g.add_nonterminal(alt, t);
    let rest = g.add_block(alt, Cardinality::ZeroOrMore, true);
    let inner = g.add_alternative(rest);
    g.add_terminal(inner, plus);
    g.add_nonterminal(inner, t);

    let alt = g.add_alternative(t);
    g.add_terminal(alt, num);
    g
  }

  #[test]
  fn links() {
    let g = expr();
    g.validate().unwrap();

    let t = g.rule_by_name("t").unwrap();
    assert_eq!(g.rule(t).references().len(), 2);
    assert_eq!(g.start_rule(), g.rule_by_name("e"));

    let block = BlockId(0);
    let occurrence = g.term(g.block(block).term());
    assert_eq!(occurrence.position(), 1);
    assert_eq!(g.owning_rule(block.into()), g.rule_by_name("e").unwrap());
    assert_eq!(g.describe_multiplex(block.into()), "e (block 0)");
  }

  #[test]
  fn symbols() {
    let g = expr();

    assert_eq!(g.token(g.token_by_name("+").unwrap()).symbol(), MIN_TYPE + 1);
    assert_eq!(g.max_symbol(), MIN_TYPE + 1);
    assert_eq!(g.symbol_name(MIN_TYPE), "num");
    assert_eq!(g.symbol_name(symbol::EOF), "<EOF>");
    assert_eq!(g.symbol_name(99), "<99>");
  }

  #[test]
  fn duplicate_declarations() {
    let mut g = Grammar::new();
    g.add_token("a").unwrap();
    g.add_rule("r").unwrap();

    assert!(g.add_token("a").is_err());
    assert!(g.add_rule("r").is_err());
    assert!(g.add_token_with_symbol("b", MIN_TYPE).is_err());
    assert!(g.add_token_with_symbol("c", symbol::EOF).is_err());
  }

  #[test]
  fn validate_catches_stale_links() {
    let mut g = expr();
    g.alternatives[0].parent = MultiplexId::Rule(RuleId(1));

    assert!(g.validate().is_err());
  }
}
