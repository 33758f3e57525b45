//! # bevalid
//!
//! Declarative form-field validation over an HTML document.
//!
//! Fields carry a `data-bevalid` marker and `data-bevalid-<rule>` directives.
//! A [`FormValidator`] bound to a container evaluates every field against a
//! name-keyed rule registry, marks failing fields with an error class and
//! keeps exactly one rendered error block per failing field.
//!
//! ```no_run
//! use bevalid::{FormOptions, FormValidator, parse_html};
//!
//! let html = r#"<form><label><input name="email" data-bevalid data-bevalid-email value="nope"></label></form>"#;
//! let mut validator = FormValidator::attach(parse_html(html), "form", FormOptions::default())?;
//! assert!(!validator.validate_all());
//! # Ok::<(), bevalid::BevalidError>(())
//! ```

pub mod callbacks;
pub mod cli;
pub mod config;
pub mod controller;
pub mod directives;
pub mod dom;
pub mod error;
pub mod evaluator;
pub mod markup;
pub mod messages;
pub mod output;
pub mod presenter;
pub mod rules;
pub mod sanitizer;

pub use callbacks::{CallbackFn, CallbackRegistry, callback};
pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use controller::{FormOptions, FormValidator, ServerErrors, ValidationReport};
pub use directives::{Directive, directives_of, fields};
pub use dom::{Document, NodeId, parse_selector};
pub use error::{BevalidError, Result};
pub use evaluator::{FieldEvaluator, FieldOutcome};
pub use markup::{load_html_file, parse_html, to_html};
pub use messages::{MessageRegistry, Translator};
pub use output::Output;
pub use presenter::ErrorPresenter;
pub use rules::{BuiltinRule, FieldRef, Rule, RuleRegistry};
pub use sanitizer::{BuiltinFilter, Filter, Sanitizer};
pub use scraper::Selector;
