use crate::sets::cache::DEFAULT_CAPACITY;

/// Settings shared by every calculator an `Analyzer` runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
  /// lookahead depth of the string-set family; unset disables it
  pub k: Option<usize>,
  /// lookahead depth of the positional family; unset disables it
  pub kl: Option<usize>,
  /// free-list bound of the scratch set pools
  pub pool_capacity: usize,
}

impl Default for AnalysisConfig {
  fn default() -> Self {
    AnalysisConfig {
      k: None,
      kl: None,
      pool_capacity: DEFAULT_CAPACITY,
    }
  }
}

impl AnalysisConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_k(mut self, k: usize) -> Self {
    self.k = Some(k);
    self
  }

  pub fn with_kl(mut self, kl: usize) -> Self {
    self.kl = Some(kl);
    self
  }

  pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
    self.pool_capacity = capacity;
    self
  }
}
