//! Rule Registry
//!
//! Maps directive names to predicates. Built-in rules are a closed enum;
//! anything registered through [`RuleRegistry::extend`] lives next to them in
//! the same name-keyed table, so a later registration can shadow a built-in.

use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

use crate::dom::{Document, NodeId};

/// Class marking a field whose value comes from [`CUSTOM_VALUE_ATTR`]
pub const CUSTOM_VALUE_CLASS: &str = "bevalid-custom-value";

/// Attribute holding the override value of a custom-value field
pub const CUSTOM_VALUE_ATTR: &str = "data-bevalid-custom-value";

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();
static HOSTNAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("Failed to compile email regex")
    })
}

fn phone_regex() -> &'static Regex {
    PHONE_REGEX.get_or_init(|| {
        Regex::new(r"^\+?[0-9]{0,3}[ .-]?(?:\([0-9]{3}\)|[0-9]{3})[ .-]?[0-9]{3}[ .-]?[0-9]{4}$")
            .expect("Failed to compile phone regex")
    })
}

fn url_regex() -> &'static Regex {
    URL_REGEX.get_or_init(|| {
        Regex::new(r"https?://[\w-]+(?:\.[\w-]+)+(?:[\w.,@?^=%&:/~+#-]*[\w@?^=%&/~+#-])?")
            .expect("Failed to compile url regex")
    })
}

fn number_regex() -> &'static Regex {
    NUMBER_REGEX.get_or_init(|| Regex::new(r"^[0-9]+$").expect("Failed to compile number regex"))
}

fn hostname_regex() -> &'static Regex {
    HOSTNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9.\-]+[a-zA-Z0-9]$")
            .expect("Failed to compile hostname regex")
    })
}

/// Read-only view of one field handed to rules
#[derive(Clone, Copy)]
pub struct FieldRef<'a> {
    doc: &'a Document,
    node: NodeId,
}

impl<'a> FieldRef<'a> {
    pub fn new(doc: &'a Document, node: NodeId) -> Self {
        Self { doc, node }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn name(&self) -> Option<&'a str> {
        self.doc.attr(self.node, "name")
    }

    pub fn has_custom_value(&self) -> bool {
        self.doc.has_class(self.node, CUSTOM_VALUE_CLASS)
    }

    /// The custom override when the field is flagged, else its form value
    pub fn effective_value(&self) -> String {
        if self.has_custom_value() {
            self.doc
                .attr(self.node, CUSTOM_VALUE_ATTR)
                .unwrap_or_default()
                .to_string()
        } else {
            self.doc.value(self.node)
        }
    }

    pub fn is_checkable(&self) -> bool {
        self.doc.is_checkable(self.node)
    }

    pub fn is_checked(&self) -> bool {
        self.doc.is_checked(self.node)
    }

    /// First element named `name` inside the enclosing form (or the whole
    /// document when the field is not inside a form)
    pub fn sibling(&self, name: &str) -> Option<FieldRef<'a>> {
        let mut scope = Some(self.node);
        while let Some(node) = scope {
            if self.doc.tag(node) == Some("form") {
                break;
            }
            scope = self.doc.parent(node);
        }
        let scope = scope.unwrap_or_else(|| self.doc.root());
        self.doc
            .descendants(scope)
            .into_iter()
            .find(|&id| self.doc.attr(id, "name") == Some(name))
            .map(|id| FieldRef::new(self.doc, id))
    }
}

/// Rules shipped with the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinRule {
    Required,
    Email,
    Phone,
    Url,
    Number,
    Hostname,
    LargerThan,
}

impl BuiltinRule {
    pub const ALL: [BuiltinRule; 7] = [
        BuiltinRule::Required,
        BuiltinRule::Email,
        BuiltinRule::Phone,
        BuiltinRule::Url,
        BuiltinRule::Number,
        BuiltinRule::Hostname,
        BuiltinRule::LargerThan,
    ];

    /// Directive name the rule is registered under
    pub fn name(self) -> &'static str {
        match self {
            BuiltinRule::Required => "required",
            BuiltinRule::Email => "email",
            BuiltinRule::Phone => "phone",
            BuiltinRule::Url => "url",
            BuiltinRule::Number => "number",
            BuiltinRule::Hostname => "hostname",
            BuiltinRule::LargerThan => "largerThan",
        }
    }

    pub fn check(self, field: &FieldRef<'_>, argument: &str) -> bool {
        if self == BuiltinRule::Required {
            return if !field.has_custom_value() && field.is_checkable() {
                field.is_checked()
            } else {
                !field.effective_value().trim().is_empty()
            };
        }

        // Only `required` enforces presence.
        let value = field.effective_value();
        if value.is_empty() {
            return true;
        }

        match self {
            BuiltinRule::Required => unreachable!("handled above"),
            BuiltinRule::Email => email_regex().is_match(&value),
            BuiltinRule::Phone => phone_regex().is_match(&value),
            BuiltinRule::Url => url_regex().is_match(&value),
            BuiltinRule::Number => number_regex().is_match(&value),
            BuiltinRule::Hostname => hostname_regex().is_match(&value),
            BuiltinRule::LargerThan => match field.sibling(argument) {
                Some(other) => !is_larger(&value, &other.effective_value()),
                None => true,
            },
        }
    }
}

impl fmt::Display for BuiltinRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric comparison when both sides parse as numbers, lexicographic otherwise.
/// An empty right-hand side never makes the left side "larger".
fn is_larger(value: &str, other: &str) -> bool {
    if other.is_empty() {
        return false;
    }
    match (value.trim().parse::<f64>(), other.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b) == Some(Ordering::Greater),
        _ => value > other,
    }
}

/// Signature of a user-supplied rule: `(field, argument) -> valid`
pub type RuleFn = Rc<dyn Fn(&FieldRef<'_>, &str) -> bool>;

/// A registry entry
#[derive(Clone)]
pub enum Rule {
    Builtin(BuiltinRule),
    Custom(RuleFn),
}

impl Rule {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&FieldRef<'_>, &str) -> bool + 'static,
    {
        Rule::Custom(Rc::new(predicate))
    }

    pub fn check(&self, field: &FieldRef<'_>, argument: &str) -> bool {
        match self {
            Rule::Builtin(rule) => rule.check(field, argument),
            Rule::Custom(predicate) => predicate(field, argument),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Builtin(rule) => f.debug_tuple("Builtin").field(rule).finish(),
            Rule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<BuiltinRule> for Rule {
    fn from(rule: BuiltinRule) -> Self {
        Rule::Builtin(rule)
    }
}

/// Name-keyed rule table owned by one controller
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: HashMap<String, Rule>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        let rules = BuiltinRule::ALL
            .iter()
            .map(|&rule| (rule.name().to_string(), Rule::Builtin(rule)))
            .collect();
        Self { rules }
    }
}

impl RuleRegistry {
    /// Registry without any rules
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Run the rule registered under `name`; an unregistered name is vacuously valid
    pub fn evaluate(&self, name: &str, field: &FieldRef<'_>, argument: &str) -> bool {
        self.rules
            .get(name)
            .is_none_or(|rule| rule.check(field, argument))
    }

    /// Merge entries by name; later entries win, unrelated entries stay
    pub fn extend<I, K>(&mut self, rules: I)
    where
        I: IntoIterator<Item = (K, Rule)>,
        K: Into<String>,
    {
        for (name, rule) in rules {
            self.rules.insert(name.into(), rule);
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
