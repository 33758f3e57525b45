//! Live input sanitization
//!
//! Fields declare `data-sanitize-on-<event>="<filter>"`. Binding scans the
//! container once; afterwards the host forwards each input event through
//! [`Sanitizer::handle_event`], which rewrites the field value in place. This
//! runs independently of validation passes.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

use tracing::debug;

use crate::dom::{Document, NodeId};

/// Namespace prefix of sanitizer bindings
pub const SANITIZE_PREFIX: &str = "data-sanitize-on-";

static NOT_LETTERS_REGEX: OnceLock<Regex> = OnceLock::new();
static NOT_DIGITS_REGEX: OnceLock<Regex> = OnceLock::new();

fn not_letters_regex() -> &'static Regex {
    NOT_LETTERS_REGEX.get_or_init(|| {
        Regex::new(r"[^\p{L}\s\-_.]").expect("Failed to compile letters-only regex")
    })
}

fn not_digits_regex() -> &'static Regex {
    NOT_DIGITS_REGEX
        .get_or_init(|| Regex::new(r"[^0-9\s]").expect("Failed to compile digits-only regex"))
}

/// Filters shipped with the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFilter {
    /// Keeps letters, whitespace, `-`, `_` and `.`
    LettersOnly,
    /// Keeps digits and whitespace
    DigitsOnly,
}

impl BuiltinFilter {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinFilter::LettersOnly => "letters-only",
            BuiltinFilter::DigitsOnly => "digits-only",
        }
    }

    pub fn apply(self, value: &str) -> String {
        let pattern = match self {
            BuiltinFilter::LettersOnly => not_letters_regex(),
            BuiltinFilter::DigitsOnly => not_digits_regex(),
        };
        pattern.replace_all(value, "").into_owned()
    }
}

pub type FilterFn = Rc<dyn Fn(&str) -> String>;

#[derive(Clone)]
pub enum Filter {
    Builtin(BuiltinFilter),
    Custom(FilterFn),
}

impl Filter {
    pub fn custom<F>(filter: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        Filter::Custom(Rc::new(filter))
    }

    pub fn apply(&self, value: &str) -> String {
        match self {
            Filter::Builtin(filter) => filter.apply(value),
            Filter::Custom(filter) => filter(value),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Builtin(filter) => f.debug_tuple("Builtin").field(filter).finish(),
            Filter::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One `(field, event, filter name)` triple found in markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeBinding {
    pub field: NodeId,
    pub event: String,
    pub filter: String,
}

#[derive(Debug, Clone)]
pub struct Sanitizer {
    filters: HashMap<String, Filter>,
    bindings: Vec<SanitizeBinding>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        let filters = [BuiltinFilter::LettersOnly, BuiltinFilter::DigitsOnly]
            .into_iter()
            .map(|filter| (filter.name().to_string(), Filter::Builtin(filter)))
            .collect();
        Self {
            filters,
            bindings: Vec::new(),
        }
    }
}

impl Sanitizer {
    /// Replace the current bindings with those declared inside `container`
    pub fn bind(&mut self, doc: &Document, container: NodeId) {
        self.bindings = doc
            .traverse(container)
            .into_iter()
            .flat_map(|field| {
                doc.attributes(field)
                    .into_iter()
                    .filter_map(move |(name, value)| {
                        let event = name.strip_prefix(SANITIZE_PREFIX)?;
                        (!event.is_empty()).then(|| SanitizeBinding {
                            field,
                            event: event.to_string(),
                            filter: value.trim().to_string(),
                        })
                    })
            })
            .collect();
        debug!(bindings = self.bindings.len(), "bound sanitizers");
    }

    pub fn unbind(&mut self) {
        self.bindings.clear();
    }

    pub fn bindings(&self) -> &[SanitizeBinding] {
        &self.bindings
    }

    /// Merge filters by name; later entries win
    pub fn extend_filters<I, K>(&mut self, filters: I)
    where
        I: IntoIterator<Item = (K, Filter)>,
        K: Into<String>,
    {
        for (name, filter) in filters {
            self.filters.insert(name.into(), filter);
        }
    }

    /// Apply every filter bound to `(field, event)`. Returns true when the
    /// field value changed.
    pub fn handle_event(&self, doc: &mut Document, field: NodeId, event: &str) -> bool {
        let mut changed = false;
        for binding in self
            .bindings
            .iter()
            .filter(|binding| binding.field == field && binding.event.eq_ignore_ascii_case(event))
        {
            let Some(filter) = self.filters.get(&binding.filter) else {
                debug!(filter = %binding.filter, "unknown sanitizer filter");
                continue;
            };
            let current = doc.value(field);
            let cleaned = filter.apply(&current);
            if cleaned != current {
                doc.set_value(field, &cleaned);
                changed = true;
            }
        }
        changed
    }
}
