//! The symbol oracle: the engine's window onto callee semantics.
//!
//! The engine never inspects method names or type hierarchies. Everything it
//! knows about a callee arrives through [`SymbolOracle::method_info`]: whether
//! the call is pure or opaque, whether it can throw, whether it carries
//! dispose or lock semantics, and any conditional-nullability postcondition.
//! Dispose recognition in particular is the oracle's job, resolved from the
//! callee's interface implementations on the front-end side, so renamed or
//! wrapped dispose methods classify correctly and coincidentally-named ones do
//! not.
//!
//! Drivers and tests use [`TableOracle`], a plain map from method reference to
//! info; a production front end implements the trait over its own symbol
//! tables.

use std::collections::HashMap;

use crate::cfg::MethodRef;

/// What a call does to the state, as far as the engine models it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallEffect {
    /// Unknown side effects: heap-reachable facts are invalidated.
    #[default]
    Opaque,
    /// No observable side effects: all facts survive the call.
    Pure,
    /// Disposes its target (receiver, or first argument for static helpers).
    Dispose,
    /// Acquires a lock on its target.
    LockAcquire,
    /// Releases a lock on its target.
    LockRelease,
    /// Mutates its receiver collection: size facts on it are invalidated.
    CollectionMutator,
}

/// A `[NotNullWhen]`-style postcondition on a boolean-returning call.
///
/// Consumed at branches: front ends that lower the pattern themselves emit
/// [`Guard::NotNullWhen`](crate::cfg::Guard::NotNullWhen) directly, and the
/// engine derives the same learning for guards that test the call's result
/// value within the calling block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotNullWhen {
    /// Zero-based index of the constrained argument, resolved against the
    /// call's `ref`/`out` arguments first (the usual `TryGet`-style out
    /// parameter), then its by-value arguments.
    pub arg_index: usize,
    /// The return value for which the argument is known non-null.
    pub when: bool,
}

/// Everything the engine knows about one callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodInfo {
    /// The call's effect classification.
    pub effect: CallEffect,
    /// Whether the call can transfer control to an exception handler.
    pub can_throw: bool,
    /// Conditional nullability postcondition, if the callee declares one.
    pub not_null_when: Option<NotNullWhen>,
    /// Whether a non-void result is known non-null.
    pub returns_not_null: bool,
    /// Whether the callee throws on an empty receiver collection
    /// (`First()`, `Single()`, `Max()` and friends).
    pub requires_non_empty: bool,
}

impl Default for MethodInfo {
    /// The conservative default for an unknown callee: opaque and throwing.
    fn default() -> Self {
        Self {
            effect: CallEffect::Opaque,
            can_throw: true,
            not_null_when: None,
            returns_not_null: false,
            requires_non_empty: false,
        }
    }
}

impl MethodInfo {
    /// An opaque, possibly-throwing callee.
    #[must_use]
    pub fn opaque() -> Self {
        Self::default()
    }

    /// A callee with the given effect classification.
    #[must_use]
    pub fn with_effect(effect: CallEffect) -> Self {
        Self {
            effect,
            ..Self::default()
        }
    }

    /// A pure, non-throwing callee.
    #[must_use]
    pub fn pure() -> Self {
        Self {
            effect: CallEffect::Pure,
            can_throw: false,
            not_null_when: None,
            returns_not_null: false,
            requires_non_empty: false,
        }
    }

    /// Marks the callee as unable to throw.
    #[must_use]
    pub fn non_throwing(mut self) -> Self {
        self.can_throw = false;
        self
    }

    /// Attaches a `[NotNullWhen(when)]` postcondition for argument
    /// `arg_index`.
    #[must_use]
    pub fn not_null_when(mut self, arg_index: usize, when: bool) -> Self {
        self.not_null_when = Some(NotNullWhen { arg_index, when });
        self
    }

    /// Marks the callee's result as known non-null.
    #[must_use]
    pub fn returning_not_null(mut self) -> Self {
        self.returns_not_null = true;
        self
    }

    /// Marks the callee as throwing when its receiver collection is empty.
    #[must_use]
    pub fn requiring_non_empty(mut self) -> Self {
        self.requires_non_empty = true;
        self
    }
}

/// The engine's read-only boundary to symbol and type information.
///
/// Implementations must be cheap and deterministic: the engine may look the
/// same method up once per exploded node that steps over the call.
pub trait SymbolOracle: Sync {
    /// Returns what is known about a callee. Unknown callees must come back
    /// as [`MethodInfo::opaque`], never as an error.
    fn method_info(&self, method: MethodRef) -> MethodInfo;
}

/// A [`SymbolOracle`] backed by an explicit table.
#[derive(Debug, Clone, Default)]
pub struct TableOracle {
    methods: HashMap<MethodRef, MethodInfo>,
}

impl TableOracle {
    /// Creates an empty oracle; every lookup answers opaque.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callee's info, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, method: MethodRef, info: MethodInfo) -> Self {
        self.methods.insert(method, info);
        self
    }

    /// Registers a callee's info.
    pub fn insert(&mut self, method: MethodRef, info: MethodInfo) {
        self.methods.insert(method, info);
    }
}

impl SymbolOracle for TableOracle {
    fn method_info(&self, method: MethodRef) -> MethodInfo {
        self.methods.get(&method).copied().unwrap_or_default()
    }
}
