//! Combinator DSL for writing grammars in Rust and lowering them into the
//! arena.
//!
//! ```
//! use grammar_lookahead::grammar::builder::*;
//!
//! let g = grammar(&["x", "y"], &[
//!   ("a", seq([sym("x"), sym("b")]) | empty()),
//!   ("b", many(sym("y"))),
//! ]).build().unwrap();
//!
//! assert_eq!(g.rule_count(), 2);
//! ```

use std::ops::BitOr;
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use super::{AltId, Cardinality, Grammar, MultiplexId};

pub struct GrammarDef {
  tokens: Vec<String>,
  rules: IndexMap<String, Rule>,
}

#[derive(Debug, Clone)]
pub struct Rule(RuleVariant);

#[derive(Debug, Clone)]
enum RuleVariant {
  Sym(String),
  Seq(Vec<Rule>),
  Or(Vec<Rule>),
  Many(Box<Rule>),
  Some(Box<Rule>),
  Option(Box<Rule>),
  SepBy(Box<RuleSepBy>),
  SepBy1(Box<RuleSepBy>),
  NonGreedy(Box<Rule>),
}

#[derive(Debug, Clone)]
struct RuleSepBy {
  sep: Rule,
  rule: Rule,
}

pub fn sym(
  sym: impl Into<String>,
) -> Rule {
  Rule(RuleVariant::Sym(sym.into()))
}

pub fn seq<const N: usize>(
  rules: [Rule; N],
) -> Rule {
  Rule(RuleVariant::Seq(rules.to_vec()))
}

/// The empty sequence, for epsilon alternatives.
pub fn empty() -> Rule {
  Rule(RuleVariant::Seq(vec![]))
}

/// `rule*`
pub fn many(
  rule: Rule,
) -> Rule {
  Rule(RuleVariant::Many(Box::new(rule)))
}

/// `rule+`
pub fn some(
  rule: Rule,
) -> Rule {
  Rule(RuleVariant::Some(Box::new(rule)))
}

/// `rule?`
pub fn option(
  rule: Rule,
) -> Rule {
  Rule(RuleVariant::Option(Box::new(rule)))
}

/// `(rule (sep rule)*)?`
pub fn sep_by(
  sep: Rule,
  rule: Rule,
) -> Rule {
  Rule(RuleVariant::SepBy(Box::new(RuleSepBy {
    sep,
    rule,
  })))
}

/// `rule (sep rule)*`
pub fn sep_by1(
  sep: Rule,
  rule: Rule,
) -> Rule {
  Rule(RuleVariant::SepBy1(Box::new(RuleSepBy {
    sep,
    rule,
  })))
}

/// Marks a `?`, `*` or `+` block as non-greedy.
pub fn non_greedy(
  rule: Rule,
) -> Rule {
  Rule(RuleVariant::NonGreedy(Box::new(rule)))
}

impl BitOr for Rule {
  type Output = Rule;

  fn bitor(self, rhs: Rule) -> Rule {
    match (self.0, rhs.0) {
      (RuleVariant::Or(mut x), RuleVariant::Or(mut y)) => {
        x.append(&mut y);
        Rule(RuleVariant::Or(x))
      }
      (RuleVariant::Or(mut x), y) => {
        x.push(Rule(y));
        Rule(RuleVariant::Or(x))
      }
      (x, RuleVariant::Or(mut y)) => {
        y.insert(0, Rule(x));
        Rule(RuleVariant::Or(y))
      }
      (x, y) => {
        Rule(RuleVariant::Or(vec![Rule(x), Rule(y)]))
      }
    }
  }
}

/// Collects tokens and rules; the first rule is the start rule.
pub fn grammar(
  tokens: &[&str],
  rules: &[(&str, Rule)],
) -> GrammarDef {
  GrammarDef {
    tokens: tokens.iter().map(|&s| s.to_owned()).collect(),
    rules: rules.iter()
      .map(|(name, rule)| ((*name).to_owned(), rule.clone()))
      .collect(),
  }
}

impl GrammarDef {
  pub fn build(self) -> Result<Grammar> {
    let mut g = Grammar::new();
    for name in self.tokens {
      g.add_token(name)?;
    }
    for name in self.rules.keys() {
      g.add_rule(name.as_str())?;
    }

    for (name, rule) in self.rules {
      let id = g.rule_by_name(&name)
        .with_context(|| format!("rule `{}` vanished", name))?;
      lower_multiplex(&mut g, id.into(), rule)
        .with_context(|| format!("in rule `{}`", name))?;
    }

    g.validate()?;
    Ok(g)
  }
}

fn lower_multiplex(
  g: &mut Grammar,
  mux: MultiplexId,
  rule: Rule,
) -> Result<()> {
  match rule.0 {
    RuleVariant::Or(rules) => {
      for rule in rules {
        lower_alternative(g, mux, rule)?;
      }
      Ok(())
    }
    other => lower_alternative(g, mux, Rule(other)),
  }
}

fn lower_alternative(
  g: &mut Grammar,
  mux: MultiplexId,
  rule: Rule,
) -> Result<()> {
  let alt = g.add_alternative(mux);
  lower_term(g, alt, rule)
}

fn lower_term(
  g: &mut Grammar,
  alt: AltId,
  rule: Rule,
) -> Result<()> {
  match rule.0 {
    RuleVariant::Sym(name) => {
      if let Some(token) = g.token_by_name(&name) {
        g.add_terminal(alt, token);
      } else if let Some(rule) = g.rule_by_name(&name) {
        g.add_nonterminal(alt, rule);
      } else {
        bail!("undefined symbol `{}`", name);
      }
      Ok(())
    }
    RuleVariant::Seq(rules) => {
      for rule in rules {
        lower_term(g, alt, rule)?;
      }
      Ok(())
    }
    RuleVariant::Or(_) => {
      lower_block(g, alt, Cardinality::One, true, rule)
    }
    RuleVariant::Many(rule) => {
      lower_block(g, alt, Cardinality::ZeroOrMore, true, *rule)
    }
    RuleVariant::Some(rule) => {
      lower_block(g, alt, Cardinality::OneOrMore, true, *rule)
    }
    RuleVariant::Option(rule) => {
      lower_block(g, alt, Cardinality::Optional, true, *rule)
    }
    RuleVariant::SepBy(sep_by) => {
      let RuleSepBy { sep, rule } = *sep_by;
      lower_term(g, alt, option(seq([rule.clone(), many(seq([sep, rule]))])))
    }
    RuleVariant::SepBy1(sep_by) => {
      let RuleSepBy { sep, rule } = *sep_by;
      lower_term(g, alt, seq([rule.clone(), many(seq([sep, rule]))]))
    }
    RuleVariant::NonGreedy(inner) => {
      match inner.0 {
        RuleVariant::Many(rule) => {
          lower_block(g, alt, Cardinality::ZeroOrMore, false, *rule)
        }
        RuleVariant::Some(rule) => {
          lower_block(g, alt, Cardinality::OneOrMore, false, *rule)
        }
        RuleVariant::Option(rule) => {
          lower_block(g, alt, Cardinality::Optional, false, *rule)
        }
        _ => bail!("non-greedy applies only to `?`, `*` and `+`"),
      }
    }
  }
}

fn lower_block(
  g: &mut Grammar,
  alt: AltId,
  cardinality: Cardinality,
  greedy: bool,
  body: Rule,
) -> Result<()> {
  let block = g.add_block(alt, cardinality, greedy);
  lower_multiplex(g, block.into(), body)
}
