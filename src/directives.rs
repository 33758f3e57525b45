//! Directive Resolver
//!
//! Fields are elements carrying [`MARKER_ATTR`]. Every other attribute that
//! starts with [`DIRECTIVE_PREFIX`] is a directive; its suffix is converted from
//! kebab-case to lowerCamelCase so it is a direct key into the registries
//! (`data-bevalid-larger-than="price"` → `largerThan`, argument `price`).

use crate::dom::{Document, NodeId};

/// Attribute marking an element as a validated field
pub const MARKER_ATTR: &str = "data-bevalid";

/// Namespace prefix of directive attributes
pub const DIRECTIVE_PREFIX: &str = "data-bevalid-";

/// One `(name, argument)` pair declared on a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub argument: String,
}

impl Directive {
    pub fn new(name: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argument: argument.into(),
        }
    }
}

/// `container` (when marked) and every marked descendant, in document order
pub fn fields(doc: &Document, container: NodeId) -> Vec<NodeId> {
    doc.traverse(container)
        .into_iter()
        .filter(|&node| doc.has_attr(node, MARKER_ATTR))
        .collect()
}

/// Directives of `field` in markup order
pub fn directives_of(doc: &Document, field: NodeId) -> Vec<Directive> {
    doc.attributes(field)
        .into_iter()
        .filter_map(|(name, value)| {
            let suffix = name.strip_prefix(DIRECTIVE_PREFIX)?;
            let directive = kebab_to_camel(suffix);
            (!directive.is_empty()).then(|| Directive::new(directive, value))
        })
        .collect()
}

/// `larger-than` → `largerThan`
pub fn kebab_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (index, segment) in name.split('-').filter(|s| !s.is_empty()).enumerate() {
        if index == 0 {
            out.push_str(segment);
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
