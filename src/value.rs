//! Stable identities for trackable program values.
//!
//! The engine does not track arbitrary expressions. It tracks *storage locations*
//! whose identity is stable across a method body: locals, parameters, fields,
//! static fields, array elements with a constant index, and deconstructed tuple
//! components. Each location gets a dense [`ValueId`] allocated from the method's
//! [`ValueTable`]; program states are keyed by these ids.
//!
//! Two trackable values are *the same* value exactly when they share a `ValueId`:
//! the front end is responsible for resolving syntactic references to the same
//! storage location to the same id (via the external symbol oracle).

use std::fmt;

/// Identifies a trackable storage location within a single method body.
///
/// Ids are dense indices into the method's [`ValueTable`]. They are meaningless
/// across methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(u32);

impl ValueId {
    /// Creates a value id from a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this id.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identifies a pending flow capture (ternary arm, null-coalescing operand,
/// pattern variable) until the enclosing operation consumes it.
///
/// Captures are not storage locations: they live in the program state's capture
/// table and disappear once consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureId(u32);

impl CaptureId {
    /// Creates a capture id from a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this id.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// The integer types the range domain can reason about.
///
/// Floating point is deliberately absent: the engine performs no floating-point
/// range reasoning at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntType {
    /// Signed 8-bit integer (`sbyte`).
    I8,
    /// Signed 16-bit integer (`short`).
    I16,
    /// Signed 32-bit integer (`int`).
    I32,
    /// Signed 64-bit integer (`long`).
    I64,
    /// Unsigned 8-bit integer (`byte`).
    U8,
    /// Unsigned 16-bit integer (`ushort`).
    U16,
    /// Unsigned 32-bit integer (`uint`).
    U32,
    /// Unsigned 64-bit integer (`ulong`).
    U64,
}

impl IntType {
    /// Returns the smallest representable value of this type.
    #[must_use]
    pub const fn min_value(self) -> i128 {
        match self {
            Self::I8 => i8::MIN as i128,
            Self::I16 => i16::MIN as i128,
            Self::I32 => i32::MIN as i128,
            Self::I64 => i64::MIN as i128,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => 0,
        }
    }

    /// Returns the largest representable value of this type.
    #[must_use]
    pub const fn max_value(self) -> i128 {
        match self {
            Self::I8 => i8::MAX as i128,
            Self::I16 => i16::MAX as i128,
            Self::I32 => i32::MAX as i128,
            Self::I64 => i64::MAX as i128,
            Self::U8 => u8::MAX as i128,
            Self::U16 => u16::MAX as i128,
            Self::U32 => u32::MAX as i128,
            Self::U64 => u64::MAX as i128,
        }
    }

    /// Returns `true` if `value` fits within this type's bounds.
    #[must_use]
    pub const fn contains(self, value: i128) -> bool {
        value >= self.min_value() && value <= self.max_value()
    }
}

/// Describes the storage location a [`ValueId`] stands for.
///
/// The distinction that matters to the engine is *heap-reachable vs. local*:
/// an invocation of an opaque method invalidates constraints on heap-reachable
/// values (fields, statics, array elements) to model arbitrary side effects and
/// concurrent mutation, while locals and parameters survive until they are
/// explicitly reassigned or passed by `ref`/`out`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackableValue {
    /// A local variable.
    Local {
        /// Source-level name, used only in diagnostics.
        name: String,
    },
    /// A method parameter.
    Parameter {
        /// Source-level name, used only in diagnostics.
        name: String,
    },
    /// An instance field (`this.f` or `obj.f` where the receiver identity is
    /// folded into the id by the front end).
    Field {
        /// Source-level name, used only in diagnostics.
        name: String,
    },
    /// A static field.
    StaticField {
        /// Source-level name, used only in diagnostics.
        name: String,
    },
    /// An array element with a compile-time-constant index.
    ArrayElement {
        /// The array value this element belongs to.
        array: ValueId,
        /// The constant index.
        index: u32,
    },
    /// A component of a deconstructed tuple.
    TupleComponent {
        /// The tuple value this component belongs to.
        tuple: ValueId,
        /// Zero-based component position.
        position: u32,
    },
}

impl TrackableValue {
    /// Returns the diagnostic name of this value, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Local { name }
            | Self::Parameter { name }
            | Self::Field { name }
            | Self::StaticField { name } => Some(name),
            Self::ArrayElement { .. } | Self::TupleComponent { .. } => None,
        }
    }
}

/// The per-method table mapping [`ValueId`]s to their storage descriptors.
///
/// Owned by the method body; the engine and rule hooks read it to decide
/// invalidation behavior and to render diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ValueTable {
    entries: Vec<TrackableValue>,
}

impl ValueTable {
    /// Creates an empty value table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new value id for the given descriptor.
    pub fn alloc(&mut self, value: TrackableValue) -> ValueId {
        let id = ValueId::new(u32::try_from(self.entries.len()).unwrap_or(u32::MAX));
        self.entries.push(value);
        id
    }

    /// Allocates a local variable slot.
    pub fn local(&mut self, name: &str) -> ValueId {
        self.alloc(TrackableValue::Local {
            name: name.to_string(),
        })
    }

    /// Allocates a parameter slot.
    pub fn parameter(&mut self, name: &str) -> ValueId {
        self.alloc(TrackableValue::Parameter {
            name: name.to_string(),
        })
    }

    /// Allocates an instance field slot.
    pub fn field(&mut self, name: &str) -> ValueId {
        self.alloc(TrackableValue::Field {
            name: name.to_string(),
        })
    }

    /// Allocates a static field slot.
    pub fn static_field(&mut self, name: &str) -> ValueId {
        self.alloc(TrackableValue::StaticField {
            name: name.to_string(),
        })
    }

    /// Returns the descriptor for a value id, or `None` if the id is foreign.
    #[must_use]
    pub fn get(&self, id: ValueId) -> Option<&TrackableValue> {
        self.entries.get(id.index())
    }

    /// Returns the number of allocated values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no values have been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if the value is heap-reachable (invalidated by opaque calls).
    ///
    /// Fields, static fields, and array elements are heap-reachable. A tuple
    /// component inherits the classification of the tuple it was deconstructed
    /// from; a component of an untracked tuple is conservatively heap-reachable.
    #[must_use]
    pub fn is_heap(&self, id: ValueId) -> bool {
        match self.get(id) {
            Some(TrackableValue::Local { .. } | TrackableValue::Parameter { .. }) => false,
            Some(
                TrackableValue::Field { .. }
                | TrackableValue::StaticField { .. }
                | TrackableValue::ArrayElement { .. },
            ) => true,
            Some(TrackableValue::TupleComponent { tuple, .. }) => self.is_heap(*tuple),
            None => true,
        }
    }

    /// Iterates over all `(id, descriptor)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ValueId, &TrackableValue)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, v)| (ValueId::new(i as u32), v))
    }
}
