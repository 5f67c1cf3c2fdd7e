//! Lifecycle management for interpreter-owned values.
//!
//! The interpreter's collector cannot see host-side references, so every
//! value the bridge hands out as a handle must carry an explicit external
//! root for exactly as long as the host holds it. [`Root`] is that contract
//! as a type: construction pins, drop unpins, and there is no other path —
//! the double-release and leaked-pin failure modes of paired retain/release
//! calls cannot be expressed.

use std::fmt;

use scrawl_engine::{HeapCell, Value};

/// RAII pin on an interpreter value.
///
/// While the guard lives, the collector treats the value as reachable.
/// Between construction and drop the value is safe to store, pass back into
/// the bridge, or ignore.
pub struct Root {
    value: Value,
    heap: HeapCell,
}

impl Root {
    /// Pin `value` against collection. The pin is released exactly once,
    /// when the guard drops.
    pub fn pin(heap: &HeapCell, value: Value) -> Self {
        heap.borrow_mut().root(&value);
        Self {
            value,
            heap: HeapCell::clone(heap),
        }
    }

    /// The pinned value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn heap(&self) -> &HeapCell {
        &self.heap
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        self.heap.borrow_mut().unroot(&self.value);
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root").field("value", &self.value).finish()
    }
}
