use thiserror::Error;

/// The generic Error type, which provides coverage for all errors this library can
/// potentially return.
///
/// Every variant describes an engine-internal failure. None of them is ever surfaced
/// as a finding: the driver recovers from a failed method analysis locally (findings
/// already emitted for other methods are unaffected) and decides whether to report
/// partial results or skip the method entirely.
///
/// # Error Categories
///
/// ## Graph Construction Errors
/// - [`Error::GraphError`] - Inconsistent CFG structure (bad successor index, empty body)
///
/// ## Traversal Errors
/// - [`Error::BudgetExceeded`] - The exploded-graph node budget was exhausted
/// - [`Error::Cancelled`] - The driver requested cooperative cancellation
/// - [`Error::UnsupportedOperation`] - An operation shape the engine cannot model
///
/// # Examples
///
/// ```rust,ignore
/// use flowscope::{Error, SymbolicEngine};
///
/// match engine.run(&mut sink) {
///     Ok(summary) => println!("explored {} nodes", summary.nodes_explored),
///     Err(Error::BudgetExceeded { explored, budget }) => {
///         eprintln!("abandoned after {explored}/{budget} nodes");
///     }
///     Err(e) => eprintln!("analysis failed: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The control flow graph is structurally inconsistent.
    ///
    /// Raised during CFG construction when a block references a successor index
    /// outside the block arena, or when a method body contains no blocks at all.
    /// A CFG provider that produces this error has violated its contract.
    #[error("Control flow graph error: {0}")]
    GraphError(String),

    /// The exploration budget for a single method was exhausted.
    ///
    /// The engine bounds the number of live exploded-graph nodes to keep one
    /// pathological method from dominating an analysis run. When the bound is
    /// hit, traversal of that method stops; findings emitted before the cutoff
    /// remain valid.
    #[error("Exploration budget exceeded: {explored} nodes explored, budget was {budget}")]
    BudgetExceeded {
        /// Number of exploded-graph nodes created before the budget was hit.
        explored: usize,
        /// The configured node budget.
        budget: usize,
    },

    /// The driver cancelled the analysis between worklist iterations.
    ///
    /// Cancellation is cooperative and coarse-grained: it is checked at block
    /// boundaries only, so already-emitted findings are never corrupted.
    #[error("Analysis cancelled by the driver")]
    Cancelled,

    /// An operation shape the engine does not know how to model.
    ///
    /// This indicates a front-end/engine version mismatch rather than a defect
    /// in the analyzed code.
    #[error("Unsupported operation shape: {0}")]
    UnsupportedOperation(String),
}
