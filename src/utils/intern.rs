//! String interning for repeated names.

use std::collections::HashSet;
use std::sync::Arc;

/// Hands out shared `Arc<str>` handles so repeated names are stored once.
#[derive(Debug, Default)]
pub struct StringInterner {
    strings: HashSet<Arc<str>>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(s);
        self.strings.insert(Arc::clone(&shared));
        shared
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_shares_storage() {
        let mut interner = StringInterner::new();
        let a = interner.intern("Foo");
        let b = interner.intern("Foo");
        let c = interner.intern("Bar");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(interner.len(), 2);
    }
}
