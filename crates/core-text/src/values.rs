//! Per-buffer heterogeneous value storage.
//!
//! Long-lived components (highlighters, completers) want to attach private,
//! incrementally maintained state to a buffer without the buffer knowing their
//! types. They allocate a process-unique [`ValueId`] once, and index the
//! buffer's value map with it; the map owns the state and drops it with the
//! buffer. Holders keep only the id, never a pointer back into the buffer.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique slot id for the per-buffer value map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(u64);

impl ValueId {
    /// Allocate a fresh, never-before-returned id.
    pub fn next() -> ValueId {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        ValueId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Heterogeneous map attached to each buffer.
pub type ValueMap = HashMap<ValueId, Box<dyn Any>, ahash::RandomState>;
