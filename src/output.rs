//! Report rendering
//!
//! Formats a [`ValidationReport`] for the terminal or as JSON.

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::controller::ValidationReport;
use crate::evaluator::FieldOutcome;

/// Output formatter for validation reports
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Formatter that never emits ANSI escapes
    pub fn plain(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: false,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn render(
        &self,
        format: OutputFormat,
        report: &ValidationReport,
    ) -> serde_json::Result<String> {
        match format {
            OutputFormat::Human => Ok(self.format_results(report)),
            OutputFormat::Summary => Ok(self.format_summary(report)),
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(report)?;
                json.push('\n');
                Ok(json)
            }
        }
    }

    pub fn format_results(&self, report: &ValidationReport) -> String {
        let mut output = String::new();

        match self.verbosity {
            VerbosityLevel::Quiet => {
                for outcome in report.invalid() {
                    output.push_str(&self.format_field_result(outcome));
                    output.push('\n');
                }
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose | VerbosityLevel::Debug => {
                output.push_str(&self.format_summary(report));

                let shown = report.field_results.iter().filter(|outcome| {
                    !outcome.is_valid() || self.verbosity == VerbosityLevel::Debug
                });
                let mut first = true;
                for outcome in shown {
                    if first {
                        output.push('\n');
                        first = false;
                    }
                    output.push_str(&self.format_field_result(outcome));
                    output.push('\n');
                }
            }
        }

        output
    }

    pub fn format_field_result(&self, outcome: &FieldOutcome) -> String {
        let label = field_label(outcome);

        if outcome.is_valid() {
            return format!("{}  {}", self.colorize("✓ VALID", "32"), label);
        }

        let mut output = format!(
            "{}  {} - {} failed rule{}",
            self.colorize("✗ INVALID", "31"),
            label,
            outcome.failed.len(),
            if outcome.failed.len() == 1 { "" } else { "s" }
        );
        if self.verbosity >= VerbosityLevel::Normal {
            for (rule, message) in outcome.failed.iter().zip(&outcome.messages) {
                output.push_str(&format!("\n    {}: {}", rule, message));
            }
        }
        output
    }

    pub fn format_summary(&self, report: &ValidationReport) -> String {
        let mut output = String::new();
        output.push_str("Validation Summary:\n");
        output.push_str(&format!("  Total fields: {}\n", report.total_fields));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Valid:", "32"),
            report.valid_fields
        ));
        if report.invalid_fields > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Invalid:", "31"),
                report.invalid_fields
            ));
        }
        let verdict = if report.is_valid() {
            self.colorize("valid", "32")
        } else {
            self.colorize("invalid", "31")
        };
        output.push_str(&format!("  Form: {}\n", verdict));
        output
    }
}

fn field_label(outcome: &FieldOutcome) -> String {
    outcome
        .name
        .clone()
        .unwrap_or_else(|| "<unnamed field>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{FormOptions, FormValidator};
    use crate::markup::parse_html;

    fn create_test_report() -> ValidationReport {
        let html = r#"<form>
            <input name="email" data-bevalid data-bevalid-required>
            <input name="age" data-bevalid data-bevalid-number value="42">
            <input data-bevalid data-bevalid-email value="nope">
        </form>"#;
        let mut validator =
            FormValidator::attach(parse_html(html), "form", FormOptions::default()).unwrap();
        validator.validate_all_report()
    }

    #[test]
    fn test_output_summary() {
        let output = Output::plain(VerbosityLevel::Normal);
        let formatted = output.format_results(&create_test_report());

        assert!(formatted.contains("Validation Summary:"));
        assert!(formatted.contains("Total fields: 3"));
        assert!(formatted.contains("Invalid: 2"));
        assert!(formatted.contains("Form: invalid"));
        assert!(formatted.contains("✗ INVALID  email - 1 failed rule"));
        assert!(formatted.contains("required: This field is required"));
        assert!(formatted.contains("✗ INVALID  <unnamed field>"));
        assert!(!formatted.contains("✓ VALID"));
    }

    #[test]
    fn test_debug_lists_valid_fields() {
        let output = Output::plain(VerbosityLevel::Debug);
        let formatted = output.format_results(&create_test_report());
        assert!(formatted.contains("✓ VALID  age"));
    }

    #[test]
    fn test_quiet_only_lists_invalid_fields() {
        let output = Output::plain(VerbosityLevel::Quiet);
        let formatted = output.format_results(&create_test_report());

        assert!(!formatted.contains("Validation Summary:"));
        assert_eq!(formatted.lines().filter(|l| l.contains("INVALID")).count(), 2);

        assert!(output.format_results(&ValidationReport::default()).is_empty());
    }

    #[test]
    fn test_json_report() {
        let output = Output::plain(VerbosityLevel::Normal);
        let json = output
            .render(OutputFormat::Json, &create_test_report())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["total_fields"], 3);
        assert_eq!(value["invalid_fields"], 2);
        assert_eq!(value["field_results"][0]["name"], "email");
        assert_eq!(value["field_results"][0]["failed"][0], "required");
    }

    #[test]
    fn test_summary_format_has_no_field_lines() {
        let output = Output::plain(VerbosityLevel::Verbose);
        let summary = output
            .render(OutputFormat::Summary, &ValidationReport::default())
            .unwrap();
        assert!(summary.contains("Form: valid"));
        assert!(!summary.contains("INVALID"));
    }
}
