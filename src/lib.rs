// Copyright 2025 The flowscope contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(clippy::too_many_arguments)]

//! # flowscope
//!
//! A symbolic execution engine for control-flow defect analysis.
//!
//! `flowscope` walks the control flow graph of a single method body, forking an
//! abstract state at every branch, pruning paths whose constraints contradict each
//! other, and handing every state transition to pluggable rule hooks that emit
//! findings (null dereference, guaranteed integer overflow, constant conditions,
//! operations on known-empty collections, use-after-dispose, locks not released on
//! all paths).
//!
//! The engine consumes an already-built CFG and a symbol/type oracle; it performs
//! no parsing, no binding, and no reporting of its own. Those are collaborator
//! responsibilities reached through narrow interfaces ([`cfg::ControlFlowGraph`],
//! [`oracle::SymbolOracle`], [`rules::FindingSink`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowscope::prelude::*;
//!
//! # fn cfg_for_method() -> flowscope::cfg::MethodBody { unimplemented!() }
//! let body = cfg_for_method();
//! let oracle = TableOracle::new();
//! let rules = builtin_rules();
//!
//! let mut sink = VecSink::new();
//! let engine = SymbolicEngine::new(&body, &oracle, &rules, AnalysisLimits::default())?;
//! engine.run(&mut sink)?;
//!
//! for finding in sink.findings() {
//!     println!("{} at {}", finding.rule, finding.span);
//! }
//! # Ok::<(), flowscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `flowscope` is organized into focused modules, leaves first:
//!
//! - [`cfg`] - Basic blocks, typed edges, tagged-union operations, dominators, loops
//! - [`value`] - Stable identities for trackable storage locations
//! - [`oracle`] - The external symbol/type resolution boundary
//! - [`domain`] - Independent constraint lattices (nullability, truth, range,
//!   collection size, object state, lock state) and their composition
//! - [`state`] - Immutable program-state snapshots with a relation store
//! - [`engine`] - The exploded-graph worklist driver
//! - [`rules`] - The rule-hook contract, findings, and sinks
//! - [`runner`] - Parallel cross-method driving with shared sinks
//!
//! ## Bounded by Design
//!
//! The engine is a heuristic, best-effort analyzer, not a verifier. Loop re-entry
//! is capped and widened, path splitting is budgeted, and several conservative
//! modeling choices (field invalidation on opaque calls, directional equality
//! learning, closure-capture resets) are deliberate and documented on the types
//! that implement them. They must not be "fixed": downstream rule corpora encode
//! them as expected behavior.

pub(crate) mod error;

pub mod cfg;
pub mod domain;
pub mod engine;
pub mod oracle;
pub mod rules;
pub mod runner;
pub mod state;
pub mod value;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust,no_run
/// use flowscope::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cfg::{
        BasicBlock, BlockId, ControlFlowGraph, Edge, EdgeKind, Guard, MethodBody, Operand,
        Operation, OperationKind, SourceSpan,
    };
    pub use crate::domain::{Constraint, ConstraintSet, DomainKind};
    pub use crate::engine::{AnalysisLimits, SymbolicEngine};
    pub use crate::oracle::{CallEffect, MethodInfo, SymbolOracle, TableOracle};
    pub use crate::rules::{builtin_rules, Finding, FindingSink, RuleHook, SharedSink, VecSink};
    pub use crate::runner::analyze_methods;
    pub use crate::state::ProgramState;
    pub use crate::value::{TrackableValue, ValueId, ValueTable};
    pub use crate::{Error, Result};
}

pub use error::Error;

/// Convenience alias for `Result<T, flowscope::Error>`.
///
/// All fallible operations in this crate return this type.
pub type Result<T> = std::result::Result<T, Error>;
