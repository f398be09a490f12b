//! Where calculators report progress and findings.
//!
//! Nothing in the engine prints or keeps global counters; an `Analyzer`
//! hands every event to its `Diagnostics` sink instead.

use std::fmt::{self, Display, Formatter};
use crate::analysis::conflicts::ResolvingDepth;
use crate::sets::PoolStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
  Flags,
  FirstFollow,
  FirstFollowK,
  FirstFollowKl,
}

impl Display for Family {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    f.write_str(match self {
      Family::Flags => "flags",
      Family::FirstFollow => "first/follow",
      Family::FirstFollowK => "first/follow k",
      Family::FirstFollowKl => "first/follow kl",
    })
  }
}

/// A grammar soundness problem, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
  NonProductive { rule: String },
  Unreachable { name: String },
  Unused { name: String },
  Ambiguity {
    family: Family,
    /// rule name, or `rule (block n)`
    context: String,
    conflicts: usize,
    resolving: ResolvingDepth,
  },
}

impl Display for Finding {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    match self {
      Finding::NonProductive { rule } => {
        write!(f, "rule `{}` cannot derive a finite string", rule)
      }
      Finding::Unreachable { name } => {
        write!(f, "`{}` is unreachable from the start rule", name)
      }
      Finding::Unused { name } => write!(f, "`{}` is never referenced", name),
      Finding::Ambiguity { family, context, conflicts, resolving } => {
        write!(f, "{}: {} conflict(s) in `{}`, ", family, conflicts, context)?;
        match resolving {
          ResolvingDepth::Resolved(depth) => write!(f, "resolved at depth {}", depth),
          ResolvingDepth::Unresolved => f.write_str("unresolved at the configured depth"),
        }
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  /// A fixpoint settled.
  Converged {
    family: Family,
    attribute: &'static str,
    passes: usize,
  },
  Cancelled {
    family: Family,
  },
  Pool {
    family: Family,
    stats: PoolStats,
  },
  Finding(Finding),
}

pub trait Diagnostics {
  fn event(&mut self, event: &Event);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
  fn event(&mut self, event: &Event) {
    match event {
      Event::Converged { family, attribute, passes } => {
        log::debug!("{} {} settled after {} passes", family, attribute, passes);
      }
      Event::Cancelled { family } => {
        log::info!("{} cancelled, attributes cleared", family);
      }
      Event::Pool { family, stats } => {
        log::trace!("{} pool: {} created, {} retrieved, {} idle",
          family, stats.created, stats.retrieved, stats.idle);
      }
      Event::Finding(finding) => log::warn!("{}", finding),
    }
  }
}

/// Records every event, mostly for tests.
impl Diagnostics for Vec<Event> {
  fn event(&mut self, event: &Event) {
    self.push(event.clone());
  }
}

impl<D: Diagnostics + ?Sized> Diagnostics for &mut D {
  fn event(&mut self, event: &Event) {
    (**self).event(event);
  }
}
