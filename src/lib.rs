//! Static analysis of context-free grammars: nullable, productive,
//! reachable and used markers, First/Follow at one symbol, at `k`-bounded
//! strings and at `kl` positional sets, and the lookahead conflicts between
//! alternatives together with the depth that resolves them.

pub mod analysis;
pub mod config;
pub mod diagnostics;
pub mod grammar;
pub mod sets;
pub mod symbol;
pub mod visit;

pub use analysis::conflicts::ResolvingDepth;
pub use analysis::{Analyzer, Outcome};
pub use config::AnalysisConfig;
pub use diagnostics::{Diagnostics, Event, Family, Finding, LogDiagnostics};
pub use grammar::Grammar;
pub use visit::CancelToken;
