//! Entry points computing each attribute family onto a grammar.
//!
//! ```
//! use grammar_lookahead::{AnalysisConfig, Analyzer, ResolvingDepth};
//! use grammar_lookahead::grammar::builder::*;
//!
//! let mut g = grammar(&["x", "y", "z"], &[
//!   ("a", seq([sym("x"), sym("y")]) | seq([sym("x"), sym("z")])),
//! ]).build().unwrap();
//!
//! let mut analyzer = Analyzer::new(AnalysisConfig::new().with_k(2));
//! analyzer.run_all(&mut g).unwrap();
//!
//! let a = g.rule_by_name("a").unwrap();
//! let table = g.first_follow_k().unwrap();
//! assert_eq!(table.rule(a).resolving_depth(), ResolvingDepth::Resolved(2));
//! ```

use anyhow::{ensure, Context, Result};
use crate::config::AnalysisConfig;
use crate::diagnostics::{Diagnostics, Event, Family, Finding, LogDiagnostics};
use crate::grammar::Grammar;
use crate::sets::{BiasedBitSet, LLStringSet, LookaheadSet, PositionalLLString, Shape};
use crate::visit::{CancelToken, Interrupted};

pub mod conflicts;
pub mod flags;
pub mod lookahead;
mod first;
mod follow;

use flags::{FlagTable, RuleRef};
use lookahead::{LookaheadTable, Setup};

/// Computed attribute families of a grammar. Any structural edit clears all
/// of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Attributes {
  pub(crate) flags: Option<FlagTable>,
  pub(crate) ll1: Option<LookaheadTable<BiasedBitSet>>,
  pub(crate) llk: Option<LookaheadTable<LLStringSet>>,
  pub(crate) llkl: Option<LookaheadTable<PositionalLLString>>,
}

impl Attributes {
  pub(crate) fn clear(&mut self) {
    *self = Attributes::default();
  }
}

/// How a calculation ended. Either way the grammar is consistent: a
/// cancelled family is left unset.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Completed,
  Cancelled,
}

impl Outcome {
  pub fn is_cancelled(self) -> bool {
    self == Outcome::Cancelled
  }
}

/// Runs the calculators. Each one clears its family first and installs the
/// result only once it has finished, so re-running is always safe.
///
/// A cancelled token stays cancelled until `CancelToken::reset`.
pub struct Analyzer<D = LogDiagnostics> {
  config: AnalysisConfig,
  cancel: CancelToken,
  diagnostics: D,
}

impl Analyzer {
  pub fn new(config: AnalysisConfig) -> Self {
    Analyzer {
      config,
      cancel: CancelToken::new(),
      diagnostics: LogDiagnostics,
    }
  }
}

impl Default for Analyzer {
  fn default() -> Self {
    Analyzer::new(AnalysisConfig::default())
  }
}

impl<D: Diagnostics> Analyzer<D> {
  pub fn with_diagnostics<E: Diagnostics>(self, diagnostics: E) -> Analyzer<E> {
    Analyzer {
      config: self.config,
      cancel: self.cancel,
      diagnostics,
    }
  }

  pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
    self.cancel = cancel;
    self
  }

  pub fn config(&self) -> &AnalysisConfig {
    &self.config
  }

  pub fn cancel_token(&self) -> &CancelToken {
    &self.cancel
  }

  pub fn diagnostics(&self) -> &D {
    &self.diagnostics
  }

  pub fn diagnostics_mut(&mut self) -> &mut D {
    &mut self.diagnostics
  }

  pub fn into_diagnostics(self) -> D {
    self.diagnostics
  }

  /// Nullable, productive, reachable and used markers.
  pub fn flags(&mut self, grammar: &mut Grammar) -> Result<Outcome> {
    grammar.validate()?;
    grammar.attributes.flags = None;

    match flags::compute(grammar, &self.cancel, &mut self.diagnostics) {
      Ok(table) => {
        self.report_flags(grammar, &table);
        grammar.attributes.flags = Some(table);
        Ok(Outcome::Completed)
      }
      Err(Interrupted) => Ok(self.cancelled(Family::Flags)),
    }
  }

  /// Single-symbol First/Follow, computing the flags first when missing.
  pub fn first_follow(&mut self, grammar: &mut Grammar) -> Result<Outcome> {
    grammar.validate()?;
    if grammar.flags().is_none() && self.flags(grammar)?.is_cancelled() {
      return Ok(Outcome::Cancelled);
    }
    self.lookahead::<BiasedBitSet>(grammar, Family::FirstFollow, 1, |a| &mut a.ll1)
  }

  /// First/Follow as sets of strings up to the configured `k`.
  pub fn first_follow_k(&mut self, grammar: &mut Grammar) -> Result<Outcome> {
    let k = self.config.k.context("lookahead depth k is not configured")?;
    ensure!(k >= 1, "lookahead depth k must be at least 1, got {}", k);
    grammar.validate()?;
    let missing = grammar.flags().is_none() || grammar.first_follow().is_none();
    if missing && self.first_follow(grammar)?.is_cancelled() {
      return Ok(Outcome::Cancelled);
    }
    self.lookahead::<LLStringSet>(grammar, Family::FirstFollowK, k, |a| &mut a.llk)
  }

  /// First/Follow as per-position symbol sets up to the configured `kl`.
  pub fn first_follow_kl(&mut self, grammar: &mut Grammar) -> Result<Outcome> {
    let kl = self.config.kl.context("lookahead depth kl is not configured")?;
    ensure!(kl >= 1, "lookahead depth kl must be at least 1, got {}", kl);
    grammar.validate()?;
    let missing = grammar.flags().is_none() || grammar.first_follow().is_none();
    if missing && self.first_follow(grammar)?.is_cancelled() {
      return Ok(Outcome::Cancelled);
    }
    self.lookahead::<PositionalLLString>(grammar, Family::FirstFollowKl, kl, |a| &mut a.llkl)
  }

  /// Every family the configuration enables, stopping at the first
  /// cancellation.
  pub fn run_all(&mut self, grammar: &mut Grammar) -> Result<Outcome> {
    if self.flags(grammar)?.is_cancelled() || self.first_follow(grammar)?.is_cancelled() {
      return Ok(Outcome::Cancelled);
    }
    if self.config.k.is_some() && self.first_follow_k(grammar)?.is_cancelled() {
      return Ok(Outcome::Cancelled);
    }
    if self.config.kl.is_some() && self.first_follow_kl(grammar)?.is_cancelled() {
      return Ok(Outcome::Cancelled);
    }
    Ok(Outcome::Completed)
  }

  fn lookahead<S: LookaheadSet>(
    &mut self,
    grammar: &mut Grammar,
    family: Family,
    depth: usize,
    slot: fn(&mut Attributes) -> &mut Option<LookaheadTable<S>>,
  ) -> Result<Outcome> {
    *slot(&mut grammar.attributes) = None;

    let setup = Setup {
      family,
      shape: Shape::new(depth, grammar.max_symbol()),
      pool_capacity: self.config.pool_capacity,
    };
    let result = if grammar.rule_count() == 0 {
      Ok(LookaheadTable::prepare(grammar, &setup.shape))
    } else {
      let flags = grammar.flags().context("flags are not computed")?;
      lookahead::compute(grammar, flags, &setup, &self.cancel, &mut self.diagnostics)
    };

    match result {
      Ok(table) => {
        self.report_ambiguities(grammar, family, &table);
        *slot(&mut grammar.attributes) = Some(table);
        Ok(Outcome::Completed)
      }
      Err(Interrupted) => Ok(self.cancelled(family)),
    }
  }

  fn cancelled(&mut self, family: Family) -> Outcome {
    self.diagnostics.event(&Event::Cancelled { family });
    Outcome::Cancelled
  }

  fn report_flags(&mut self, grammar: &Grammar, table: &FlagTable) {
    let name = |r: &RuleRef| match *r {
      RuleRef::Nonterminal(rule) => grammar.rule(rule).name().to_owned(),
      RuleRef::Terminal(token) => grammar.token(token).name().to_owned(),
    };

    for &rule in table.non_productive_rules() {
      let rule = grammar.rule(rule).name().to_owned();
      self.diagnostics.event(&Event::Finding(Finding::NonProductive { rule }));
    }
    for r in table.unreachable_rules() {
      self.diagnostics.event(&Event::Finding(Finding::Unreachable { name: name(r) }));
    }
    for r in table.unused_rules() {
      self.diagnostics.event(&Event::Finding(Finding::Unused { name: name(r) }));
    }
  }

  fn report_ambiguities<S>(&mut self, grammar: &Grammar, family: Family, table: &LookaheadTable<S>) {
    for id in grammar.multiplex_ids() {
      let node = table.multiplex(id);
      if !node.is_ambiguous() {
        continue;
      }
      let finding = Finding::Ambiguity {
        family,
        context: grammar.describe_multiplex(id),
        conflicts: node.conflicts().len() + node.self_conflict().is_some() as usize,
        resolving: node.resolving_depth(),
      };
      self.diagnostics.event(&Event::Finding(finding));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::builder::*;
  use crate::grammar::Cardinality;
  use crate::sets::PoolStats;
  use pretty_assertions::assert_eq;

  fn recording(config: AnalysisConfig) -> Analyzer<Vec<Event>> {
    Analyzer::new(config).with_diagnostics(Vec::new())
  }

  #[test]
  fn first_follow_computes_flags_on_demand() {
    let mut g = grammar(&["x"], &[("s", sym("x"))]).build().unwrap();
    let mut analyzer = recording(AnalysisConfig::new());

    assert_eq!(analyzer.first_follow(&mut g).unwrap(), Outcome::Completed);
    assert!(g.flags().is_some());
    assert!(g.first_follow().is_some());
    assert!(g.first_follow_k().is_none());
  }

  #[test]
  fn depth_must_be_configured() {
    let mut g = grammar(&["x"], &[("s", sym("x"))]).build().unwrap();
    let mut analyzer = recording(AnalysisConfig::new());

    let err = analyzer.first_follow_k(&mut g).unwrap_err();
    assert_eq!(err.to_string(), "lookahead depth k is not configured");

    let mut analyzer = recording(AnalysisConfig::new().with_kl(0));
    let err = analyzer.first_follow_kl(&mut g).unwrap_err();
    assert_eq!(err.to_string(), "lookahead depth kl must be at least 1, got 0");
    assert!(g.first_follow().is_none());
  }

  #[test]
  fn reports_findings() {
    let mut g = grammar(&["x", "w"], &[
      ("s", sym("x") | sym("x")),
      ("loop", seq([sym("x"), sym("loop")])),
    ]).build().unwrap();
    let mut analyzer = recording(AnalysisConfig::new());

    analyzer.first_follow(&mut g).unwrap();

    let findings = analyzer.diagnostics().iter()
      .filter_map(|e| match e {
        Event::Finding(f) => Some(f.to_string()),
        _ => None,
      })
      .collect::<Vec<_>>();
    assert_eq!(findings, vec![
      "rule `loop` cannot derive a finite string".to_owned(),
      "`loop` is unreachable from the start rule".to_owned(),
      "`w` is unreachable from the start rule".to_owned(),
      "`w` is never referenced".to_owned(),
      "first/follow: 1 conflict(s) in `s`, unresolved at the configured depth".to_owned(),
    ]);
  }

  #[test]
  fn empty_grammar_is_trivial() {
    let mut g = Grammar::new();
    let mut analyzer = recording(AnalysisConfig::new().with_k(2).with_kl(2));

    assert_eq!(analyzer.run_all(&mut g).unwrap(), Outcome::Completed);
    assert_eq!(g.first_follow_k().unwrap().depth(), 2);
    assert!(g.first_follow_kl().is_some());
  }

  #[test]
  fn cancelled_token_leaves_family_unset() {
    let mut g = grammar(&["x"], &[("s", sym("x"))]).build().unwrap();
    let mut analyzer = recording(AnalysisConfig::new());

    analyzer.cancel_token().cancel();
    assert_eq!(analyzer.flags(&mut g).unwrap(), Outcome::Cancelled);
    assert!(g.flags().is_none());
    assert_eq!(analyzer.diagnostics().last(), Some(&Event::Cancelled { family: Family::Flags }));

    analyzer.cancel_token().reset();
    assert_eq!(analyzer.flags(&mut g).unwrap(), Outcome::Completed);
  }

  #[test]
  fn cancelled_flags_are_recomputed_before_deeper_families() {
    let mut g = grammar(&["x"], &[("s", sym("x") | seq([sym("x"), sym("x")]))]).build().unwrap();
    let mut analyzer = recording(AnalysisConfig::new().with_k(2).with_kl(2));
    analyzer.first_follow(&mut g).unwrap();

    analyzer.cancel_token().cancel();
    assert_eq!(analyzer.flags(&mut g).unwrap(), Outcome::Cancelled);
    assert!(g.flags().is_none());
    assert!(g.first_follow().is_some());
    analyzer.cancel_token().reset();

    assert_eq!(analyzer.first_follow_k(&mut g).unwrap(), Outcome::Completed);
    assert!(g.flags().is_some());
    assert!(g.first_follow_k().is_some());

    g.attributes.flags = None;
    assert_eq!(analyzer.first_follow_kl(&mut g).unwrap(), Outcome::Completed);
    assert!(g.flags().is_some());
    assert!(g.first_follow_kl().is_some());
  }

  #[test]
  fn edits_clear_attributes() {
    let mut g = grammar(&["x"], &[("s", sym("x"))]).build().unwrap();
    let mut analyzer = recording(AnalysisConfig::new());
    analyzer.first_follow(&mut g).unwrap();

    let s = g.rule_by_name("s").unwrap();
    let alt = g.rule(s).alternatives()[0];
    g.add_block(alt, Cardinality::Optional, true);

    assert!(g.flags().is_none());
    assert!(g.first_follow().is_none());
  }

  #[test]
  fn pool_statistics_are_reported() {
    let mut g = grammar(&["x", "y"], &[
      ("s", many(sym("x") | sym("y"))),
    ]).build().unwrap();
    let mut analyzer = recording(AnalysisConfig::new().with_k(2).with_pool_capacity(4));

    analyzer.first_follow_k(&mut g).unwrap();

    let stats = analyzer.diagnostics().iter()
      .filter_map(|e| match e {
        Event::Pool { family: Family::FirstFollowK, stats } => Some(*stats),
        _ => None,
      })
      .collect::<Vec<PoolStats>>();
    assert_eq!(stats.len(), 1);
    assert!(stats[0].retrieved >= stats[0].created);
    assert!(stats[0].idle <= 4);
  }
}
