use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only report invalid fields
    Quiet,
    /// Show the summary
    #[default]
    Normal,
    /// Show every failing field with its messages
    Verbose,
    /// Also list valid fields
    Debug,
}

/// Report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Summary,
}

/// Validate the declarative form fields of an HTML page
#[derive(Parser, Debug, Clone)]
#[command(name = "bevalid")]
#[command(about = "Validate data-bevalid form fields in an HTML document")]
#[command(version)]
pub struct Cli {
    /// HTML file to validate
    #[arg(help = "HTML file containing the form")]
    pub file: PathBuf,

    /// Selector of the element whose fields are validated
    #[arg(short = 'c', long = "container")]
    pub container: Option<String>,

    /// Error blocks are placed after the closest ancestor matching this selector
    #[arg(long = "anchor")]
    pub anchor: Option<String>,

    /// Class marking invalid fields
    #[arg(long = "error-class")]
    pub error_class: Option<String>,

    /// JSON file of server-side errors: {"field": {"rule": "message"}}
    #[arg(short = 's', long = "server-errors")]
    pub server_errors: Option<PathBuf>,

    /// Write the annotated document to this file
    #[arg(short = 'w', long = "write")]
    pub write: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(short = 'f', long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (invalid fields only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.file.is_file() {
            return Err(format!("File does not exist: {}", self.file.display()));
        }
        if let Some(server_errors) = &self.server_errors
            && !server_errors.is_file()
        {
            return Err(format!(
                "Server errors file does not exist: {}",
                server_errors.display()
            ));
        }
        if let Some(container) = &self.container
            && container.trim().is_empty()
        {
            return Err("Container selector must not be empty".to_string());
        }
        Ok(())
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}
