//! Refcounted, deduplicated string interning.
//!
//! Word completion keeps one multiset entry per distinct word; interning keeps
//! every copy of a word sharing one allocation. Acquiring an identical
//! sequence yields the same handle (pointer-equal `Rc`), and dropping the last
//! handle frees the string; the registry holds only weak references and
//! reclaims dead slots opportunistically.
//!
//! The registry is process-wide but thread-local: the editor core is
//! single-threaded (one event loop), so no synchronization is carried.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Handle to an interned string. Compares and hashes by content; clones are
/// pointer-equal and O(1).
#[derive(Debug, Clone)]
pub struct InternedString(Rc<str>);

impl InternedString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when both handles share the same interned allocation.
    pub fn ptr_eq(&self, other: &InternedString) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::ops::Deref for InternedString {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for InternedString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq for InternedString {
    fn eq(&self, other: &InternedString) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for InternedString {}

impl PartialOrd for InternedString {
    fn partial_cmp(&self, other: &InternedString) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InternedString {
    fn cmp(&self, other: &InternedString) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl std::hash::Hash for InternedString {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl std::fmt::Display for InternedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Default)]
struct StringRegistry {
    slots: HashMap<Box<str>, Weak<str>, ahash::RandomState>,
    sweep_at: usize,
}

impl StringRegistry {
    fn acquire(&mut self, s: &str) -> InternedString {
        if let Some(weak) = self.slots.get(s) {
            if let Some(rc) = weak.upgrade() {
                return InternedString(rc);
            }
        }
        self.maybe_sweep();
        let rc: Rc<str> = Rc::from(s);
        self.slots.insert(Box::from(s), Rc::downgrade(&rc));
        InternedString(rc)
    }

    /// Drop slots whose string is no longer referenced. Runs when the table
    /// has grown past the last sweep's watermark.
    fn maybe_sweep(&mut self) {
        if self.slots.len() < self.sweep_at.max(64) {
            return;
        }
        self.slots.retain(|_, weak| weak.strong_count() > 0);
        self.sweep_at = self.slots.len() * 2;
    }

    fn purge(&mut self) {
        self.slots.retain(|_, weak| weak.strong_count() > 0);
    }
}

thread_local! {
    static REGISTRY: RefCell<StringRegistry> = RefCell::new(StringRegistry::default());
}

/// Intern `s`, returning the shared handle.
pub fn intern(s: &str) -> InternedString {
    REGISTRY.with(|r| r.borrow_mut().acquire(s))
}

/// Eagerly reclaim slots for strings with no remaining handles.
pub fn purge() {
    REGISTRY.with(|r| r.borrow_mut().purge());
}

/// Number of slots currently held (live or awaiting sweep).
pub fn slot_count() -> usize {
    REGISTRY.with(|r| r.borrow().slots.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sequences_share_one_allocation() {
        let a = intern("needle");
        let b = intern("needle");
        assert!(a.ptr_eq(&b));
        assert_eq!(a, b);
        let c = intern("other");
        assert!(!a.ptr_eq(&c));
        assert_ne!(a, c);
    }

    #[test]
    fn orders_and_borrows_by_content() {
        let a = intern("alpha");
        let b = intern("beta");
        assert!(a < b);
        assert_eq!(a.as_str(), "alpha");
        assert!(a.starts_with("al"));
    }

    #[test]
    fn last_release_frees_the_slot() {
        let token = "__intern_release_probe__";
        let a = intern(token);
        let before = slot_count();
        drop(a);
        purge();
        assert!(slot_count() < before);
    }
}
