//! Depth-first traversal over the grammar arena.
//!
//! Every `visit_*` method defaults to walking the node's children, so a
//! visitor only overrides the node kinds it cares about. Cancellation is
//! polled once per `visit_grammar`, i.e. once per whole-tree pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use crate::grammar::{AltId, BlockId, Grammar, MultiplexId, RuleId, TermId, TermKind, TokenId};

/// Shared flag a caller flips to stop a running calculator.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn reset(&self) {
    self.0.store(false, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }

  pub(crate) fn check(&self) -> Result<(), Interrupted> {
    if self.is_cancelled() {
      Err(Interrupted)
    } else {
      Ok(())
    }
  }
}

/// Raised out of a traversal once its token is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

pub trait Visitor {
  fn visit_grammar(&mut self, grammar: &Grammar, cancel: &CancelToken) -> Result<(), Interrupted> {
    cancel.check()?;
    walk_grammar(self, grammar);
    Ok(())
  }

  fn visit_rule(&mut self, grammar: &Grammar, rule: RuleId) {
    walk_multiplex(self, grammar, rule.into());
  }

  fn visit_block(&mut self, grammar: &Grammar, block: BlockId) {
    walk_multiplex(self, grammar, block.into());
  }

  fn visit_alternative(&mut self, grammar: &Grammar, alt: AltId) {
    walk_alternative(self, grammar, alt);
  }

  fn visit_term(&mut self, grammar: &Grammar, term: TermId) {
    walk_term(self, grammar, term);
  }

  fn visit_terminal(&mut self, _grammar: &Grammar, _term: TermId, _token: TokenId) {}

  fn visit_nonterminal(&mut self, _grammar: &Grammar, _term: TermId, _rule: RuleId) {}
}

pub fn walk_grammar<V: Visitor + ?Sized>(visitor: &mut V, grammar: &Grammar) {
  for rule in grammar.rule_ids() {
    visitor.visit_rule(grammar, rule);
  }
}

pub fn walk_multiplex<V: Visitor + ?Sized>(visitor: &mut V, grammar: &Grammar, mux: MultiplexId) {
  for &alt in grammar.multiplex(mux).alternatives() {
    visitor.visit_alternative(grammar, alt);
  }
}

pub fn walk_alternative<V: Visitor + ?Sized>(visitor: &mut V, grammar: &Grammar, alt: AltId) {
  for &term in grammar.alternative(alt).terms() {
    visitor.visit_term(grammar, term);
  }
}

pub fn walk_term<V: Visitor + ?Sized>(visitor: &mut V, grammar: &Grammar, term: TermId) {
  match grammar.term(term).kind() {
    TermKind::Terminal(token) => visitor.visit_terminal(grammar, term, token),
    TermKind::Nonterminal(rule) => visitor.visit_nonterminal(grammar, term, rule),
    TermKind::Block(block) => visitor.visit_block(grammar, block),
  }
}

/// A visitor recomputing an attribute family from its current values.
pub trait Fixpoint: Visitor {
  /// Returns whether the last pass changed anything, and resets the flag.
  fn take_modified(&mut self) -> bool;
}

/// Runs whole-tree passes until one changes nothing. Returns the number of
/// passes, the last (unchanged) one included.
pub fn fixpoint<V: Fixpoint>(
  visitor: &mut V,
  grammar: &Grammar,
  cancel: &CancelToken,
) -> Result<usize, Interrupted> {
  let mut passes = 0;
  loop {
    visitor.visit_grammar(grammar, cancel)?;
    passes += 1;
    if !visitor.take_modified() {
      return Ok(passes);
    }
  }
}
