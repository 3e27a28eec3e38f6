//! Lock-free shared fields.
//!
//! # Responsibilities
//! - Hold one value that many threads read and replace concurrently
//! - Never expose a partially written value
//! - (De)serialize transparently as the inner value
//!
//! # Design Decisions
//! - Backed by `ArcSwap`: readers never take a lock, writers swap a whole `Arc`
//! - One box per field, so unrelated fields never contend

use arc_swap::ArcSwap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// A single value that can be read and replaced from any thread.
pub struct AtomicField<T> {
    inner: ArcSwap<T>,
}

/// String-valued field.
pub type AtomicString = AtomicField<String>;

/// Bool-valued field.
pub type AtomicFlag = AtomicField<bool>;

impl<T> AtomicField<T> {
    /// Create a field holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: ArcSwap::from_pointee(value),
        }
    }

    /// Replace the current value.
    pub fn store(&self, value: T) {
        self.inner.store(Arc::new(value));
    }

    /// Replace the current value, returning the previous one.
    pub fn swap(&self, value: T) -> Arc<T> {
        self.inner.swap(Arc::new(value))
    }

    /// Shared handle to the current value, without cloning it.
    pub fn load_full(&self) -> Arc<T> {
        self.inner.load_full()
    }
}

impl<T: Clone> AtomicField<T> {
    /// Current value.
    pub fn load(&self) -> T {
        T::clone(&self.inner.load())
    }
}

impl AtomicField<String> {
    /// True when the field holds the empty string.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Store `value` only if the field is currently empty.
    ///
    /// Returns true if the value was written. Uses compare-and-swap so a
    /// concurrent writer that fills the field first is never overwritten.
    pub fn store_if_empty(&self, value: impl Into<String>) -> bool {
        let value = Arc::new(value.into());
        let mut written = false;
        self.inner.rcu(|current| {
            if current.is_empty() {
                written = true;
                Arc::clone(&value)
            } else {
                written = false;
                Arc::clone(current)
            }
        });
        written
    }
}

impl<T: Default> Default for AtomicField<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone> Clone for AtomicField<T> {
    fn clone(&self) -> Self {
        Self::new(self.load())
    }
}

impl<T: fmt::Debug> fmt::Debug for AtomicField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self.inner.load(), f)
    }
}

impl<T> From<T> for AtomicField<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Serialize> Serialize for AtomicField<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        T::serialize(&self.inner.load(), serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for AtomicField<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_defaults_to_zero_value() {
        let s = AtomicString::default();
        let b = AtomicFlag::default();
        assert_eq!(s.load(), "");
        assert!(!b.load());
    }

    #[test]
    fn test_store_and_swap() {
        let field = AtomicString::new("a".into());
        field.store("b".into());
        assert_eq!(field.load(), "b");

        let prev = field.swap("c".into());
        assert_eq!(prev.as_str(), "b");
        assert_eq!(field.load(), "c");
    }

    #[test]
    fn test_store_if_empty() {
        let field = AtomicString::default();
        assert!(field.store_if_empty("first"));
        assert!(!field.store_if_empty("second"));
        assert_eq!(field.load(), "first");
    }

    #[test]
    fn test_concurrent_reads_only_see_written_values() {
        let field = Arc::new(AtomicString::new("init".into()));
        let writers = 4;
        let per_writer = 500;

        let mut allowed: HashSet<String> = HashSet::new();
        allowed.insert("init".into());
        for w in 0..writers {
            for i in 0..per_writer {
                allowed.insert(format!("writer-{}-value-{}-{}", w, i, "x".repeat(i % 64)));
            }
        }
        let allowed = Arc::new(allowed);

        let mut handles = Vec::new();
        for w in 0..writers {
            let field = field.clone();
            handles.push(thread::spawn(move || {
                for i in 0..per_writer {
                    field.store(format!("writer-{}-value-{}-{}", w, i, "x".repeat(i % 64)));
                }
            }));
        }
        for _ in 0..4 {
            let field = field.clone();
            let allowed = allowed.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..2_000 {
                    let seen = field.load();
                    assert!(allowed.contains(&seen), "observed unwritten value {:?}", seen);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_serde_is_transparent() {
        let field = AtomicFlag::new(true);
        assert_eq!(serde_json::to_string(&field).unwrap(), "true");

        let parsed: AtomicString = serde_json::from_str("\"node-1\"").unwrap();
        assert_eq!(parsed.load(), "node-1");
    }
}
