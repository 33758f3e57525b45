//! Callback Registries
//!
//! Two independent instances live on every controller: one fires when a field
//! fails, the other when it passes. Both are keyed by directive name, so a
//! directive may exist purely to trigger a side effect.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::{Document, NodeId};

/// Handler invoked as `(document, field, directive argument)`
pub type CallbackFn = Rc<dyn Fn(&mut Document, NodeId, &str)>;

/// Wrap a closure as a [`CallbackFn`]
pub fn callback<F>(handler: F) -> CallbackFn
where
    F: Fn(&mut Document, NodeId, &str) + 'static,
{
    Rc::new(handler)
}

#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<String, CallbackFn>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.callbacks.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<CallbackFn> {
        self.callbacks.get(name).cloned()
    }

    /// Merge entries by name; later entries win, unrelated entries stay
    pub fn extend<I, K>(&mut self, callbacks: I)
    where
        I: IntoIterator<Item = (K, CallbackFn)>,
        K: Into<String>,
    {
        for (name, handler) in callbacks {
            self.callbacks.insert(name.into(), handler);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.callbacks.keys().collect();
        names.sort();
        f.debug_struct("CallbackRegistry")
            .field("names", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_and_invoke() {
        let mut registry = CallbackRegistry::new();
        assert!(registry.is_empty());

        registry.extend([(
            "onElementError",
            callback(|doc, field, argument| doc.add_class(field, argument)),
        )]);
        assert!(registry.has("onElementError"));
        assert!(!registry.has("required"));

        let mut doc = Document::new();
        let root = doc.root();
        let input = doc.append_element(root, "input", &[]);

        let handler = registry.get("onElementError").unwrap();
        handler(&mut doc, input, "shake");
        assert!(doc.has_class(input, "shake"));
    }

    #[test]
    fn test_debug_lists_names() {
        let mut registry = CallbackRegistry::new();
        registry.extend([
            ("b", callback(|_, _, _| {})),
            ("a", callback(|_, _, _| {})),
        ]);
        assert_eq!(
            format!("{:?}", registry),
            r#"CallbackRegistry { names: ["a", "b"] }"#
        );
    }
}
