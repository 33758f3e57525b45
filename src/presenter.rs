//! Error Presenter
//!
//! Owns the field → identity table and keeps exactly one error block per
//! failing field. A block looks like
//! `<div class="{error_class}-wrap {token}"><ul><li>message</li>...</ul></div>`
//! and sits right after the closest ancestor-or-self matching the anchor
//! selector, or right after the field when nothing matches.
//!
//! Each field's block is remembered by node, so repeated passes update the
//! block in place and a block written by an earlier controller is never
//! mistaken for one of ours.

use std::collections::HashMap;

use scraper::Selector;
use tracing::{debug, trace};

use crate::dom::{Document, NodeId};
use crate::messages::{MessageRegistry, Translator};

#[derive(Debug, Clone)]
struct Presentation {
    token: String,
    block: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ErrorPresenter {
    anchor: Selector,
    error_class: String,
    translator: Translator,
    fields: HashMap<NodeId, Presentation>,
    next_token: u64,
}

impl ErrorPresenter {
    pub fn new(anchor: Selector, error_class: impl Into<String>, translator: Translator) -> Self {
        Self {
            anchor,
            error_class: error_class.into(),
            translator,
            fields: HashMap::new(),
            next_token: 1,
        }
    }

    pub fn error_class(&self) -> &str {
        &self.error_class
    }

    /// Class carried by every error block
    pub fn wrap_class(&self) -> String {
        format!("{}-wrap", self.error_class)
    }

    /// Identity token of `field`, if it ever failed
    pub fn token(&self, field: NodeId) -> Option<&str> {
        self.fields.get(&field).map(|entry| entry.token.as_str())
    }

    /// The attached error block of `field`
    pub fn block_for(&self, doc: &Document, field: NodeId) -> Option<NodeId> {
        self.fields
            .get(&field)?
            .block
            .filter(|&block| doc.is_attached(block))
    }

    /// Display text for a failing rule
    pub fn render(&self, messages: &MessageRegistry, name: &str) -> String {
        self.translator.translate(messages.message_for(name))
    }

    fn anchor_of(&self, doc: &Document, field: NodeId) -> NodeId {
        doc.closest(field, &self.anchor).unwrap_or(field)
    }

    /// Take over markup that may already carry error presentation.
    ///
    /// Blocks sitting right after the anchors of `fields` are dropped, and the
    /// token counter moves past every `{error_class}-{n}` class in the document.
    pub fn adopt(&mut self, doc: &mut Document, fields: &[NodeId]) {
        let wrap = self.wrap_class();
        let mut stale = 0;
        for &field in fields {
            let anchor = self.anchor_of(doc, field);
            while let Some(block) = next_element(doc, anchor).filter(|&next| doc.has_class(next, &wrap)) {
                doc.detach(block);
                stale += 1;
            }
        }

        let prefix = format!("{}-", self.error_class);
        let root = doc.root();
        let highest = doc
            .descendants(root)
            .into_iter()
            .flat_map(|node| {
                doc.classes(node)
                    .into_iter()
                    .filter_map(|class| class.strip_prefix(&prefix)?.parse::<u64>().ok())
                    .collect::<Vec<_>>()
            })
            .max();
        if let Some(highest) = highest {
            self.next_token = self.next_token.max(highest + 1);
        }
        if stale > 0 || highest.is_some() {
            debug!(stale, next_token = self.next_token, "adopted annotated markup");
        }
    }

    fn entry_for(&mut self, field: NodeId) -> &mut Presentation {
        let next_token = &mut self.next_token;
        let error_class = &self.error_class;
        self.fields.entry(field).or_insert_with(|| {
            let token = format!("{}-{}", error_class, next_token);
            *next_token += 1;
            Presentation { token, block: None }
        })
    }

    /// Mark `field` invalid and render `failed` (in order) into its block
    pub fn show(
        &mut self,
        doc: &mut Document,
        field: NodeId,
        failed: &[String],
        messages: &MessageRegistry,
    ) {
        doc.add_class(field, &self.error_class);
        let items: Vec<String> = failed.iter().map(|name| self.render(messages, name)).collect();

        let block = match self.block_for(doc, field) {
            Some(block) => block,
            None => {
                let class = format!("{} {}", self.wrap_class(), self.entry_for(field).token);
                let block = doc.create_element("div");
                doc.set_attr(block, "class", &class);
                let anchor = self.anchor_of(doc, field);
                doc.insert_after(anchor, block);
                self.entry_for(field).block = Some(block);
                trace!(class = %class, "created error block");
                block
            }
        };

        doc.clear_children(block);
        let list = doc.append_element(block, "ul", &[]);
        for text in &items {
            let item = doc.append_element(list, "li", &[]);
            doc.append_text(item, text);
        }
    }

    /// Mark `field` valid and drop its block. The token is kept for reuse.
    pub fn clear(&mut self, doc: &mut Document, field: NodeId) {
        doc.remove_class(field, &self.error_class);
        if let Some(block) = self.block_for(doc, field) {
            doc.detach(block);
            trace!(token = ?self.token(field), "removed error block");
        }
        if let Some(entry) = self.fields.get_mut(&field) {
            entry.block = None;
        }
    }

    pub fn is_invalid(&self, doc: &Document, field: NodeId) -> bool {
        doc.has_class(field, &self.error_class)
    }
}

/// Next element sibling, skipping whitespace-only text
fn next_element(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = doc.next_sibling(node);
    while let Some(sibling) = current {
        if doc.is_element(sibling) {
            return Some(sibling);
        }
        if !doc.text_content(sibling).trim().is_empty() {
            return None;
        }
        current = doc.next_sibling(sibling);
    }
    None
}
