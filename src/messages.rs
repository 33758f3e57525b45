//! Message Registry and translation hook

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Text rendered for a failing rule that has no registered message
pub const FALLBACK_MESSAGE: &str = "This field is invalid";

const DEFAULT_MESSAGES: &[(&str, &str)] = &[
    ("required", "This field is required"),
    ("email", "This field must be email"),
    ("phone", "Please type correct phone number"),
    ("url", "Please type correct url address"),
    ("number", "This field must be only number"),
    ("hostname", "Please type correct hostname"),
    ("largerThan", "This value is too large"),
];

/// Rule name → human-readable template
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRegistry {
    messages: HashMap<String, String>,
}

impl Default for MessageRegistry {
    fn default() -> Self {
        Self {
            messages: DEFAULT_MESSAGES
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
        }
    }
}

impl MessageRegistry {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.messages.get(name).map(String::as_str)
    }

    /// Message for `name`, falling back to [`FALLBACK_MESSAGE`]
    pub fn message_for(&self, name: &str) -> &str {
        self.get(name).unwrap_or(FALLBACK_MESSAGE)
    }

    /// Merge entries by name; later entries win, unrelated entries stay
    pub fn extend<I, K, V>(&mut self, messages: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, text) in messages {
            self.messages.insert(name.into(), text.into());
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Hook applied to every message before it is displayed
#[derive(Clone)]
pub struct Translator(Rc<dyn Fn(&str) -> String>);

impl Translator {
    pub fn new<F>(translate: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        Self(Rc::new(translate))
    }

    pub fn identity() -> Self {
        Self::new(str::to_string)
    }

    /// Lookup table with identity fallback for untranslated text
    pub fn from_table(table: HashMap<String, String>) -> Self {
        Self::new(move |text| table.get(text).cloned().unwrap_or_else(|| text.to_string()))
    }

    pub fn translate(&self, text: &str) -> String {
        (self.0)(text)
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Translator(..)")
    }
}
