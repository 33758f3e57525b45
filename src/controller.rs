//! Form Controller
//!
//! [`FormValidator`] is created once per container. It owns the document, the
//! registries, the error presenter (and with it the identity table) and the
//! sanitizer bindings for its whole lifetime. Every pass reads fields and
//! directives fresh from the markup, so host mutations between passes are
//! always picked up.

use std::collections::{BTreeMap, HashMap};

use scraper::Selector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::callbacks::{CallbackFn, CallbackRegistry};
use crate::directives;
use crate::dom::{Document, NodeId, parse_selector};
use crate::error::{BevalidError, Result};
use crate::evaluator::{FieldEvaluator, FieldOutcome};
use crate::messages::{MessageRegistry, Translator};
use crate::presenter::ErrorPresenter;
use crate::rules::{Rule, RuleRegistry};
use crate::sanitizer::{Filter, Sanitizer};

pub const DEFAULT_ANCHOR: &str = "label";
pub const DEFAULT_ERROR_CLASS: &str = "bevalid-error";

/// Construction-time configuration of one controller
#[derive(Debug, Clone)]
pub struct FormOptions {
    /// Error blocks go after the closest ancestor-or-self matching this
    pub anchor: Selector,
    /// Class marking an invalid field; also the prefix of block classes and tokens
    pub error_class: String,
    /// Applied to every message before it is rendered
    pub translator: Translator,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            anchor: parse_selector(DEFAULT_ANCHOR).expect("Failed to parse default anchor selector"),
            error_class: DEFAULT_ERROR_CLASS.to_string(),
            translator: Translator::identity(),
        }
    }
}

impl FormOptions {
    pub fn with_anchor(mut self, anchor: &str) -> Result<Self> {
        self.anchor = parse_selector(anchor)?;
        Ok(self)
    }

    /// The class must be one non-empty class name; tokens and block classes
    /// are derived from it.
    pub fn with_error_class(mut self, error_class: impl Into<String>) -> Result<Self> {
        let error_class = error_class.into();
        if error_class.is_empty() || error_class.contains(char::is_whitespace) {
            return Err(BevalidError::InvalidErrorClass { class: error_class });
        }
        self.error_class = error_class;
        Ok(self)
    }

    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = translator;
        self
    }
}

/// Server-side validation results: field name → rule name → message
///
/// Rules of one field are kept sorted by name, which is the order their
/// messages are rendered in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerErrors(BTreeMap<String, BTreeMap<String, String>>);

impl ServerErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn insert(
        &mut self,
        field: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> &mut Self {
        self.0
            .entry(field.into())
            .or_default()
            .insert(rule.into(), message.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, String>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Aggregated outcome of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Number of fields evaluated
    pub total_fields: usize,
    /// Number of fields without failures
    pub valid_fields: usize,
    /// Number of fields with at least one failure
    pub invalid_fields: usize,
    /// Per-field outcomes in document order
    pub field_results: Vec<FieldOutcome>,
}

impl ValidationReport {
    /// Aggregate individual field outcomes into a summary
    pub fn aggregate(field_results: Vec<FieldOutcome>) -> Self {
        let valid_fields = field_results.iter().filter(|outcome| outcome.is_valid()).count();
        Self {
            total_fields: field_results.len(),
            valid_fields,
            invalid_fields: field_results.len() - valid_fields,
            field_results,
        }
    }

    /// Form-level verdict; a pass over zero fields is valid
    pub fn is_valid(&self) -> bool {
        self.invalid_fields == 0
    }

    pub fn invalid(&self) -> impl Iterator<Item = &FieldOutcome> {
        self.field_results.iter().filter(|outcome| !outcome.is_valid())
    }

    /// Replace outcomes of the same field (or append new ones) and recount
    pub fn merge(&mut self, overrides: Vec<FieldOutcome>) {
        let mut results = std::mem::take(&mut self.field_results);
        for outcome in overrides {
            match results.iter_mut().find(|existing| existing.node == outcome.node) {
                Some(existing) => *existing = outcome,
                None => results.push(outcome),
            }
        }
        *self = Self::aggregate(results);
    }
}

pub struct FormValidator {
    document: Document,
    container: NodeId,
    rules: RuleRegistry,
    messages: MessageRegistry,
    error_callbacks: CallbackRegistry,
    valid_callbacks: CallbackRegistry,
    presenter: ErrorPresenter,
    sanitizer: Sanitizer,
}

impl FormValidator {
    /// Take ownership of `document` and bind to `container`.
    ///
    /// Error blocks left next to the container's fields by an earlier pass
    /// (for example in previously written output) are dropped.
    pub fn new(mut document: Document, container: NodeId, options: FormOptions) -> Self {
        let mut sanitizer = Sanitizer::default();
        sanitizer.bind(&document, container);
        let mut presenter = ErrorPresenter::new(options.anchor, options.error_class, options.translator);
        let fields = directives::fields(&document, container);
        presenter.adopt(&mut document, &fields);
        debug!(container = ?container, error_class = %presenter.error_class(), "attached form validator");
        Self {
            document,
            container,
            rules: RuleRegistry::default(),
            messages: MessageRegistry::default(),
            error_callbacks: CallbackRegistry::new(),
            valid_callbacks: CallbackRegistry::new(),
            presenter,
            sanitizer,
        }
    }

    /// Bind to the first element matching `container` in document order
    pub fn attach(document: Document, container: &str, options: FormOptions) -> Result<Self> {
        let selector = parse_selector(container)?;
        let node = document
            .select_first(document.root(), &selector)
            .ok_or_else(|| BevalidError::ContainerNotFound {
                selector: container.to_string(),
            })?;
        Ok(Self::new(document, node, options))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Host access for value changes between passes
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn error_class(&self) -> &str {
        self.presenter.error_class()
    }

    /// Marked fields of the container, in document order
    pub fn fields(&self) -> Vec<NodeId> {
        directives::fields(&self.document, self.container)
    }

    /// First element inside the container whose `name` attribute is `name`
    pub fn find_field(&self, name: &str) -> Option<NodeId> {
        self.document
            .traverse(self.container)
            .into_iter()
            .find(|&node| self.document.attr(node, "name") == Some(name))
    }

    pub fn is_invalid(&self, field: NodeId) -> bool {
        self.presenter.is_invalid(&self.document, field)
    }

    /// Identity token of `field`, once it has failed at least once
    pub fn token(&self, field: NodeId) -> Option<&str> {
        self.presenter.token(field)
    }

    /// The error block currently rendered for `field`
    pub fn error_block(&self, field: NodeId) -> Option<NodeId> {
        self.presenter.block_for(&self.document, field)
    }

    pub fn validate_all(&mut self) -> bool {
        self.validate_all_report().is_valid()
    }

    pub fn validate_all_report(&mut self) -> ValidationReport {
        let fields = self.fields();
        self.run(&fields)
    }

    /// Re-validate only `fields`; ids foreign to this document are skipped
    pub fn validate_subset(&mut self, fields: &[NodeId]) -> bool {
        self.run(fields).is_valid()
    }

    pub fn validate_field(&mut self, field: NodeId) -> bool {
        self.run(&[field]).is_valid()
    }

    fn run(&mut self, fields: &[NodeId]) -> ValidationReport {
        let evaluator = FieldEvaluator {
            rules: &self.rules,
            messages: &self.messages,
            error_callbacks: &self.error_callbacks,
            valid_callbacks: &self.valid_callbacks,
        };
        let mut outcomes = Vec::with_capacity(fields.len());
        for &field in fields {
            if !self.document.contains(field) || !self.document.is_element(field) {
                continue;
            }
            outcomes.push(evaluator.evaluate(&mut self.document, &mut self.presenter, field));
        }

        let report = ValidationReport::aggregate(outcomes);
        debug!(
            total = report.total_fields,
            invalid = report.invalid_fields,
            "validation pass finished"
        );
        report
    }

    pub fn extend_rules<I, K>(&mut self, rules: I)
    where
        I: IntoIterator<Item = (K, Rule)>,
        K: Into<String>,
    {
        self.rules.extend(rules);
    }

    pub fn extend_messages<I, K, V>(&mut self, messages: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.messages.extend(messages);
    }

    pub fn extend_error_callbacks<I, K>(&mut self, callbacks: I)
    where
        I: IntoIterator<Item = (K, CallbackFn)>,
        K: Into<String>,
    {
        self.error_callbacks.extend(callbacks);
    }

    pub fn extend_valid_callbacks<I, K>(&mut self, callbacks: I)
    where
        I: IntoIterator<Item = (K, CallbackFn)>,
        K: Into<String>,
    {
        self.valid_callbacks.extend(callbacks);
    }

    pub fn extend_filters<I, K>(&mut self, filters: I)
    where
        I: IntoIterator<Item = (K, Filter)>,
        K: Into<String>,
    {
        self.sanitizer.extend_filters(filters);
    }

    /// Deliver one input event to the sanitizer. Returns true when the value changed.
    pub fn dispatch_event(&mut self, field: NodeId, event: &str) -> bool {
        self.sanitizer.handle_event(&mut self.document, field, event)
    }

    /// Force the named fields invalid with exactly the payload's rules,
    /// bypassing rule evaluation. The payload messages are merged into the
    /// message registry first.
    pub fn apply_server_errors(&mut self, payload: &ServerErrors) -> Vec<FieldOutcome> {
        let mut outcomes = Vec::new();
        for (name, rules) in payload.iter() {
            self.messages
                .extend(rules.iter().map(|(rule, message)| (rule.clone(), message.clone())));

            let Some(field) = self.find_field(name) else {
                debug!(field = %name, "no field for server error, skipping");
                continue;
            };
            let failed: Vec<String> = rules.keys().cloned().collect();
            self.presenter
                .show(&mut self.document, field, &failed, &self.messages);
            outcomes.push(FieldOutcome {
                node: field,
                name: Some(name.clone()),
                messages: failed
                    .iter()
                    .map(|rule| self.presenter.render(&self.messages, rule))
                    .collect(),
                failed,
            });
        }
        debug!(applied = outcomes.len(), "applied server errors");
        outcomes
    }

    /// String-named entry point. Returns `None` for unknown names and for
    /// arguments of the wrong shape.
    pub fn call(&mut self, name: &str, argument: Option<Value>) -> Option<bool> {
        match name {
            "validateAll" | "isValid" => Some(self.validate_all()),
            "extendMessages" | "setErrorText" => {
                let messages = argument.and_then(|value| {
                    serde_json::from_value::<HashMap<String, String>>(value)
                        .inspect_err(|err| warn!(method = name, error = %err, "invalid messages"))
                        .ok()
                })?;
                self.extend_messages(messages);
                Some(true)
            }
            "applyServerErrors" => {
                let payload = argument.and_then(|value| {
                    ServerErrors::from_value(value)
                        .inspect_err(|err| warn!(method = name, error = %err, "invalid server errors"))
                        .ok()
                })?;
                self.apply_server_errors(&payload);
                Some(true)
            }
            _ => {
                let err = BevalidError::UnknownOperation {
                    name: name.to_string(),
                };
                warn!("{}", err);
                None
            }
        }
    }

    /// Release the container and hand the document back. Rendered error
    /// state stays in place.
    pub fn teardown(mut self) -> Document {
        self.sanitizer.unbind();
        debug!(container = ?self.container, "detached form validator");
        self.document
    }
}
