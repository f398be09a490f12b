use grammar_lookahead::grammar::builder::*;
use grammar_lookahead::grammar::{Grammar, RuleId};
use grammar_lookahead::sets::{LLString, LLStringSet};
use grammar_lookahead::symbol::EPSILON;
use grammar_lookahead::{
  AnalysisConfig, Analyzer, CancelToken, Diagnostics, Event, Family, Outcome, ResolvingDepth,
};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

fn analyze(g: &mut Grammar, config: AnalysisConfig) -> Vec<Event> {
  let mut analyzer = Analyzer::new(config).with_diagnostics(Vec::new());
  assert_eq!(analyzer.run_all(g).unwrap(), Outcome::Completed);
  analyzer.into_diagnostics()
}

fn rule(g: &Grammar, name: &str) -> RuleId {
  g.rule_by_name(name).unwrap()
}

fn expressions() -> Grammar {
  grammar(&["num", "id", "+", "*", "(", ")", ","], &[
    ("expr", seq([sym("term"), many(seq([sym("+"), sym("term")]))])),
    ("term", seq([sym("factor"), many(seq([sym("*"), sym("factor")]))])),
    ("factor", sym("num") | seq([sym("id"), option(sym("call"))]) | seq([sym("("), sym("expr"), sym(")")])),
    ("call", seq([sym("("), sep_by(sym(","), sym("expr")), sym(")")])),
  ]).build().unwrap()
}

#[test]
fn diverging_continuations_resolve_one_past_the_shared_prefix() {
  let mut g = grammar(&["x", "y", "z"], &[
    ("a", seq([sym("x"), sym("b")]) | seq([sym("x"), sym("c")])),
    ("b", sym("y")),
    ("c", sym("z")),
  ]).build().unwrap();

  analyze(&mut g, AnalysisConfig::new().with_k(3).with_kl(3));
  let a = rule(&g, "a");

  let plain = g.first_follow().unwrap().rule(a);
  assert_snapshot!(g.describe(plain.conflicts()[0].set()), @"{x}");
  assert_eq!(plain.resolving_depth(), ResolvingDepth::Unresolved);
  assert_eq!(plain.resolving_depth().as_i32(), -1);

  let strings = g.first_follow_k().unwrap().rule(a);
  assert_eq!(strings.resolving_depth(), ResolvingDepth::Resolved(2));
  assert_eq!(strings.conflicts().len(), 1);

  let positional = g.first_follow_kl().unwrap().rule(a);
  assert_eq!(positional.resolving_depth(), ResolvingDepth::Resolved(2));

  let alternatives = g.rule(a).alternatives();
  let table = g.first_follow_k().unwrap();
  assert_snapshot!(g.describe(table.alternative(alternatives[0]).first()), @"{[x y]}");
  assert_snapshot!(g.describe(table.alternative(alternatives[1]).first()), @"{[x z]}");
}

#[test]
fn empty_alternative() {
  let mut g = grammar(&["x"], &[
    ("a", sym("x") | empty()),
  ]).build().unwrap();

  analyze(&mut g, AnalysisConfig::new().with_k(2));
  let a = rule(&g, "a");

  assert!(g.flags().unwrap().rule(a).nullable);
  assert!(g.first_follow().unwrap().rule(a).first().contains(EPSILON));
  assert!(g.first_follow_k().unwrap().rule(a).first().contains_epsilon());
  assert!(g.first_follow().unwrap().rule(a).conflicts().is_empty());
  assert!(g.first_follow_k().unwrap().rule(a).conflicts().is_empty());
}

#[test]
fn left_recursion_terminates() {
  let mut g = grammar(&["x", "y"], &[
    ("a", seq([sym("a"), sym("x")]) | sym("y")),
  ]).build().unwrap();

  analyze(&mut g, AnalysisConfig::new().with_k(2));
  let a = rule(&g, "a");

  assert_snapshot!(g.describe(g.first_follow().unwrap().rule(a).first()), @"{y}");
  assert_snapshot!(g.describe(g.first_follow_k().unwrap().rule(a).first()), @"{[y], [y x]}");
  assert_snapshot!(g.describe(g.first_follow().unwrap().rule(a).follow()), @"{<EOF>, x}");
}

#[test]
fn alternative_duality() {
  let mut g = grammar(&["x"], &[
    ("s", empty() | sym("x") | sym("n") | seq([sym("n"), sym("x")]) | seq([sym("n"), sym("dead")])),
    ("n", empty()),
    ("dead", sym("dead")),
  ]).build().unwrap();

  analyze(&mut g, AnalysisConfig::new());
  let flags = g.flags().unwrap();
  let duality = g.rule(rule(&g, "s")).alternatives().iter()
    .map(|&alt| (flags.alternative(alt).nullable, flags.alternative(alt).productive))
    .collect::<Vec<_>>();

  assert_eq!(duality, vec![
    (true, true),
    (false, true),
    (true, true),
    (false, true),
    (false, false),
  ]);
}

#[test]
fn append_truncates_to_k() {
  let mut ab = LLStringSet::new(3);
  ab.add(LLString::new(vec![1, 2]));
  let mut cd = LLStringSet::new(3);
  cd.add(LLString::new(vec![3, 4]));

  let joined = ab.append(&cd);

  assert_eq!(joined.iter().cloned().collect::<Vec<_>>(), vec![LLString::new(vec![1, 2, 3])]);
  assert!(joined.iter().all(|s| s.len() <= 3));
}

#[test]
fn recomputing_is_idempotent() {
  let mut g = expressions();
  let config = AnalysisConfig::new().with_k(2).with_kl(2);

  analyze(&mut g, config.clone());
  let flags = g.flags().cloned();
  let plain = g.first_follow().cloned();
  let strings = g.first_follow_k().cloned();
  let positional = g.first_follow_kl().cloned();

  analyze(&mut g, config);

  assert!(flags.is_some() && strings.is_some());
  assert_eq!(g.flags().cloned(), flags);
  assert_eq!(g.first_follow().cloned(), plain);
  assert_eq!(g.first_follow_k().cloned(), strings);
  assert_eq!(g.first_follow_kl().cloned(), positional);
}

#[test]
fn expression_grammar_is_ll1() {
  let mut g = expressions();

  let events = analyze(&mut g, AnalysisConfig::new().with_k(2));

  let table = g.first_follow().unwrap();
  for id in g.multiplex_ids() {
    assert_eq!(table.multiplex(id).resolving_depth(), ResolvingDepth::Resolved(0),
      "{}", g.describe_multiplex(id));
  }
  assert_snapshot!(g.describe(table.rule(rule(&g, "term")).follow()), @"{<EOF>, +, ), ,}");
  assert_snapshot!(g.describe(table.rule(rule(&g, "factor")).first()), @"{num, id, (}");
  assert!(!events.iter().any(|e| matches!(e, Event::Finding(_))));
}

/// Cancels the token once a family reports its First.
struct CancelAfterFirst {
  token: CancelToken,
  family: Family,
}

impl Diagnostics for CancelAfterFirst {
  fn event(&mut self, event: &Event) {
    if let Event::Converged { family, attribute: "first", .. } = event {
      if *family == self.family {
        self.token.cancel();
      }
    }
  }
}

#[test]
fn cancellation_rolls_back_the_running_family() {
  let mut g = expressions();
  let analyzer = Analyzer::new(AnalysisConfig::new().with_k(2));
  let token = analyzer.cancel_token().clone();
  let mut analyzer = analyzer.with_diagnostics(CancelAfterFirst {
    token: token.clone(),
    family: Family::FirstFollowK,
  });

  assert_eq!(analyzer.run_all(&mut g).unwrap(), Outcome::Cancelled);
  assert!(g.flags().is_some());
  assert!(g.first_follow().is_some());
  assert!(g.first_follow_k().is_none());

  token.reset();
  assert_eq!(analyzer.flags(&mut g).unwrap(), Outcome::Completed);
  assert!(g.first_follow().is_some());
}

#[test]
fn unset_depth_is_an_error() {
  let mut g = expressions();
  let mut analyzer = Analyzer::new(AnalysisConfig::new()).with_diagnostics(Vec::<Event>::new());

  assert!(analyzer.first_follow_k(&mut g).is_err());
  assert!(analyzer.first_follow_kl(&mut g).is_err());
  assert!(g.first_follow().is_none());
}

#[test]
fn grammar_without_rules() {
  let mut g = Grammar::new();
  g.add_token("x").unwrap();

  let events = analyze(&mut g, AnalysisConfig::new().with_k(1).with_kl(1));

  assert_eq!(g.first_follow().unwrap().depth(), 1);
  assert!(g.first_follow_kl().is_some());
  assert!(events.iter().any(|e| matches!(e, Event::Finding(_))));
}
