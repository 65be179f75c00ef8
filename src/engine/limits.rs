//! Resource limits bounding one method's exploration.

/// Configurable exploration bounds for a single method analysis.
///
/// All three limits exist to keep one pathological method from dominating an
/// analysis run; the defaults are sized so that ordinary methods never hit
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisLimits {
    /// How many distinct states may enter a loop header before the engine
    /// widens (drops facts about loop-written values).
    pub loop_visit_cap: u32,
    /// Maximum number of exploded-graph nodes explored per method.
    pub node_budget: usize,
    /// Maximum number of distinct states kept per block; beyond it, incoming
    /// states are joined instead of kept separate.
    pub path_split_budget: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            loop_visit_cap: 3,
            node_budget: 20_000,
            path_split_budget: 64,
        }
    }
}

impl AnalysisLimits {
    /// Creates the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the loop visit cap.
    #[must_use]
    pub fn with_loop_visit_cap(mut self, cap: u32) -> Self {
        self.loop_visit_cap = cap;
        self
    }

    /// Sets the per-method node budget.
    #[must_use]
    pub fn with_node_budget(mut self, budget: usize) -> Self {
        self.node_budget = budget;
        self
    }

    /// Sets the per-block path split budget.
    #[must_use]
    pub fn with_path_split_budget(mut self, budget: usize) -> Self {
        self.path_split_budget = budget;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builders() {
        let limits = AnalysisLimits::default();
        assert_eq!(limits.loop_visit_cap, 3);
        assert_eq!(limits.node_budget, 20_000);
        assert_eq!(limits.path_split_budget, 64);

        let limits = AnalysisLimits::new()
            .with_loop_visit_cap(1)
            .with_node_budget(100)
            .with_path_split_budget(4);
        assert_eq!(limits.loop_visit_cap, 1);
        assert_eq!(limits.node_budget, 100);
        assert_eq!(limits.path_split_budget, 4);
    }
}
