//! Markup Document Model
//!
//! A mutable layer over a parsed [`scraper::Html`]. The validation engine reads
//! directives from the tree and writes error presentation back into it through
//! the tree's public `ego_tree` handles. Nodes are addressed by [`NodeId`].
//! Detached nodes stay in the tree's arena, so a `NodeId` remains a valid key
//! for the whole lifetime of its [`Document`].
//!
//! Attribute edits rebuild the element, which keeps scraper's cached id and
//! class lists in step with the attributes that selectors match against.

use ego_tree::NodeRef;
use html5ever::{Attribute, LocalName, QualName, ns};
use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node, Selector, StrTendril};

use crate::error::{BevalidError, Result};

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(ego_tree::NodeId);

/// Parse a CSS selector group
pub fn parse_selector(source: &str) -> Result<Selector> {
    Selector::parse(source).map_err(|err| BevalidError::Selector {
        selector: source.to_string(),
        details: err.to_string(),
    })
}

fn element_name(tag: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(tag.to_ascii_lowercase()))
}

fn attribute_name(name: &str) -> QualName {
    QualName::new(None, ns!(), LocalName::from(name.to_ascii_lowercase()))
}

fn build_element(name: QualName, attrs: Vec<(QualName, StrTendril)>) -> Element {
    Element::new(
        name,
        attrs
            .into_iter()
            .map(|(name, value)| Attribute { name, value })
            .collect(),
    )
}

/// Mutable markup tree
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Html> for Document {
    fn from(html: Html) -> Self {
        Self { html }
    }
}

impl Document {
    /// Create an empty document containing only the root node
    pub fn new() -> Self {
        Self {
            html: Html::new_document(),
        }
    }

    /// The underlying parsed tree
    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn into_html(self) -> Html {
        self.html
    }

    pub fn root(&self) -> NodeId {
        NodeId(self.html.tree.root().id())
    }

    /// True when `node` was allocated by this document
    pub fn contains(&self, node: NodeId) -> bool {
        self.html.tree.get(node.0).is_some()
    }

    fn node(&self, node: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(node.0)
    }

    fn orphan(&mut self, value: Node) -> NodeId {
        NodeId(self.html.tree.orphan(value).id())
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.orphan(Node::Element(build_element(element_name(tag), Vec::new())))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.orphan(Node::Text(Text {
            text: StrTendril::from(text),
        }))
    }

    /// Create an element with the given attributes and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(name, value)| (attribute_name(name), StrTendril::from(*value)))
            .collect();
        let node = self.orphan(Node::Element(build_element(element_name(tag), attrs)));
        self.append_child(parent, node);
        node
    }

    /// Create a text node and append it to `parent`
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.create_text(text);
        self.append_child(parent, node);
        node
    }

    // ---- tree structure ----

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent().map(|parent| NodeId(parent.id()))
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|node| node.children().map(|child| NodeId(child.id())).collect())
            .unwrap_or_default()
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.next_sibling().map(|next| NodeId(next.id()))
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || !self.contains(child) {
            return;
        }
        if let Some(mut parent) = self.html.tree.get_mut(parent.0) {
            parent.append_id(child.0);
        }
    }

    /// Move `node` so that it immediately follows `reference` among its siblings.
    ///
    /// A `reference` without a parent has no siblings; `node` is appended to the
    /// document root instead.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        if reference == node || !self.contains(node) {
            return;
        }
        if self.parent(reference).is_none() {
            let root = self.root();
            self.append_child(root, node);
            return;
        }
        if let Some(mut reference) = self.html.tree.get_mut(reference.0) {
            reference.insert_id_after(node.0);
        }
    }

    /// Unlink `node` from its parent. The subtree stays in the arena.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(mut node) = self.html.tree.get_mut(node.0) {
            node.detach();
        }
    }

    /// Detach every child of `node`
    pub fn clear_children(&mut self, node: NodeId) {
        for child in self.children(node) {
            self.detach(child);
        }
    }

    /// True when `node` is reachable from the document root
    pub fn is_attached(&self, node: NodeId) -> bool {
        let root = self.html.tree.root().id();
        self.node(node).is_some_and(|node| {
            node.id() == root || node.ancestors().any(|ancestor| ancestor.id() == root)
        })
    }

    /// `node` followed by all of its descendants, in document order
    pub fn traverse(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|node| node.descendants().map(|id| NodeId(id.id())).collect())
            .unwrap_or_default()
    }

    /// All descendants of `node` (excluding `node`), in document order
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        self.traverse(node).into_iter().skip(1).collect()
    }

    // ---- element data ----

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        self.node(node)?.value().as_element()
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(Element::name)
    }

    /// Attributes of an element in markup order; empty for non-elements
    pub fn attributes(&self, node: NodeId) -> Vec<(&str, &str)> {
        self.element(node)
            .map(|element| element.attrs().collect())
            .unwrap_or_default()
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attr(&name.to_ascii_lowercase())
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    fn edit_attrs(&mut self, node: NodeId, edit: impl FnOnce(&mut Vec<(QualName, StrTendril)>)) {
        let Some(mut node) = self.html.tree.get_mut(node.0) else {
            return;
        };
        let Node::Element(element) = node.value() else {
            return;
        };
        let mut attrs: Vec<(QualName, StrTendril)> = element
            .attrs
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        edit(&mut attrs);
        *element = build_element(element.name.clone(), attrs);
    }

    /// Set an attribute, keeping its position when it already exists
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        self.edit_attrs(node, |attrs| {
            match attrs
                .iter_mut()
                .find(|(key, _)| (*key.local).eq_ignore_ascii_case(name))
            {
                Some((_, existing)) => *existing = StrTendril::from(value),
                None => attrs.push((attribute_name(name), StrTendril::from(value))),
            }
        });
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if !self.has_attr(node, name) {
            return;
        }
        self.edit_attrs(node, |attrs| {
            attrs.retain(|(key, _)| !(*key.local).eq_ignore_ascii_case(name))
        });
    }

    // ---- classes ----

    pub fn classes(&self, node: NodeId) -> Vec<&str> {
        self.attr(node, "class")
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).contains(&class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if !self.is_element(node) || self.has_class(node, class) {
            return;
        }
        let mut classes: Vec<String> = self.classes(node).into_iter().map(String::from).collect();
        classes.push(class.to_string());
        self.set_attr(node, "class", &classes.join(" "));
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let remaining: Vec<String> = self
            .classes(node)
            .into_iter()
            .filter(|existing| *existing != class)
            .map(String::from)
            .collect();
        if remaining.is_empty() {
            self.remove_attr(node, "class");
        } else {
            self.set_attr(node, "class", &remaining.join(" "));
        }
    }

    // ---- text ----

    /// Concatenated text of `node` and its descendants
    pub fn text_content(&self, node: NodeId) -> String {
        let Some(node) = self.node(node) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|descendant| descendant.value().as_text())
            .map(|text| &**text)
            .collect()
    }

    /// Replace all children of `node` with a single text node
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        self.clear_children(node);
        if !text.is_empty() {
            self.append_text(node, text);
        }
    }

    // ---- selectors ----

    /// True when `node` is an element matched by `selector`
    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        self.node(node)
            .and_then(ElementRef::wrap)
            .is_some_and(|element| selector.matches(&element))
    }

    /// `node` itself or its nearest element ancestor matching `selector`
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.matches(id, selector) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Descendants of `scope` matching `selector`, in document order
    pub fn select(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| self.matches(id, selector))
            .collect()
    }

    pub fn select_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&id| self.matches(id, selector))
    }

    // ---- form controls ----

    /// Lowercased `type` attribute of an input
    pub fn input_type(&self, node: NodeId) -> Option<String> {
        self.attr(node, "type").map(|kind| kind.to_ascii_lowercase())
    }

    /// True for checkbox and radio inputs
    pub fn is_checkable(&self, node: NodeId) -> bool {
        self.tag(node) == Some("input")
            && matches!(self.input_type(node).as_deref(), Some("checkbox" | "radio"))
    }

    pub fn is_checked(&self, node: NodeId) -> bool {
        self.has_attr(node, "checked")
    }

    pub fn set_checked(&mut self, node: NodeId, checked: bool) {
        if checked {
            self.set_attr(node, "checked", "");
        } else {
            self.remove_attr(node, "checked");
        }
    }

    fn options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendants(select)
            .into_iter()
            .filter(|&id| self.tag(id) == Some("option"))
            .collect()
    }

    /// Current value of a form control
    pub fn value(&self, node: NodeId) -> String {
        match self.tag(node) {
            Some("textarea") => self.text_content(node),
            Some("select") => {
                let options = self.options(node);
                options
                    .iter()
                    .find(|&&id| self.has_attr(id, "selected"))
                    .or_else(|| options.first())
                    .map(|&option| self.option_value(option))
                    .unwrap_or_default()
            }
            _ => self.attr(node, "value").unwrap_or_default().to_string(),
        }
    }

    fn option_value(&self, option: NodeId) -> String {
        match self.attr(option, "value") {
            Some(value) => value.to_string(),
            None => self.text_content(option).trim().to_string(),
        }
    }

    /// Overwrite the value of a form control
    pub fn set_value(&mut self, node: NodeId, value: &str) {
        match self.tag(node) {
            Some("textarea") => self.set_text_content(node, value),
            Some("select") => {
                for option in self.options(node) {
                    if self.option_value(option) == value {
                        self.set_attr(option, "selected", "");
                    } else {
                        self.remove_attr(option, "selected");
                    }
                }
            }
            _ => self.set_attr(node, "value", value),
        }
    }
}
