//! Field Evaluator
//!
//! Runs every directive of one field against the registries, hands the
//! ordered failure list to the presenter and fires the queued callbacks.

use serde::Serialize;
use tracing::trace;

use crate::callbacks::{CallbackFn, CallbackRegistry};
use crate::directives::directives_of;
use crate::dom::{Document, NodeId};
use crate::messages::MessageRegistry;
use crate::presenter::ErrorPresenter;
use crate::rules::{FieldRef, RuleRegistry};

/// Result of evaluating one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOutcome {
    /// The field element
    #[serde(skip)]
    pub node: NodeId,
    /// Its `name` attribute, if any
    pub name: Option<String>,
    /// Failing directive names, in markup order
    pub failed: Vec<String>,
    /// Rendered (translated) messages, parallel to `failed`
    pub messages: Vec<String>,
}

impl FieldOutcome {
    pub fn is_valid(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Borrowed view of the registries a pass needs
pub struct FieldEvaluator<'a> {
    pub rules: &'a RuleRegistry,
    pub messages: &'a MessageRegistry,
    pub error_callbacks: &'a CallbackRegistry,
    pub valid_callbacks: &'a CallbackRegistry,
}

impl FieldEvaluator<'_> {
    pub fn evaluate(
        &self,
        doc: &mut Document,
        presenter: &mut ErrorPresenter,
        field: NodeId,
    ) -> FieldOutcome {
        let mut failed = Vec::new();
        let mut on_error: Vec<(CallbackFn, String)> = Vec::new();
        let mut on_valid: Vec<(CallbackFn, String)> = Vec::new();

        {
            let view = FieldRef::new(doc, field);
            for directive in directives_of(doc, field) {
                if self.rules.has(&directive.name)
                    && !self.rules.evaluate(&directive.name, &view, &directive.argument)
                {
                    failed.push(directive.name.clone());
                }
                if let Some(handler) = self.error_callbacks.get(&directive.name) {
                    on_error.push((handler, directive.argument.clone()));
                }
                if let Some(handler) = self.valid_callbacks.get(&directive.name) {
                    on_valid.push((handler, directive.argument));
                }
            }
        }

        if failed.is_empty() {
            presenter.clear(doc, field);
            fire(doc, field, &on_valid);
        } else {
            presenter.show(doc, field, &failed, self.messages);
            fire(doc, field, &on_error);
        }

        let outcome = FieldOutcome {
            node: field,
            name: doc.attr(field, "name").map(String::from),
            messages: failed
                .iter()
                .map(|name| presenter.render(self.messages, name))
                .collect(),
            failed,
        };
        trace!(field = ?outcome.name, failed = ?outcome.failed, "evaluated field");
        outcome
    }
}

fn fire(doc: &mut Document, field: NodeId, queued: &[(CallbackFn, String)]) {
    for (handler, argument) in queued {
        handler(doc, field, argument);
    }
}
