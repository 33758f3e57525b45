use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use bevalid::cli::Cli;
use bevalid::config::ConfigManager;
use bevalid::controller::{FormValidator, ServerErrors};
use bevalid::markup::{load_html_file, to_html};
use bevalid::output::Output;

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "bevalid=debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<bool> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let config = ConfigManager::load_config(&cli)
        .await
        .context("Failed to load configuration")?;
    let options = ConfigManager::form_options(&config)?;

    let document = load_html_file(&cli.file)
        .await
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;
    let mut validator = FormValidator::attach(document, &config.presentation.container, options)?;
    validator.extend_messages(config.messages.clone());

    let mut report = validator.validate_all_report();

    if let Some(path) = &cli.server_errors {
        let payload = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let server_errors = ServerErrors::from_json(&payload)?;
        report.merge(validator.apply_server_errors(&server_errors));
    }

    let verbosity = if config.output.quiet {
        bevalid::VerbosityLevel::Quiet
    } else if config.output.verbose {
        bevalid::VerbosityLevel::Verbose
    } else {
        cli.verbosity()
    };
    let rendered = Output::new(verbosity).render(config.output.format.into(), &report)?;
    print!("{}", rendered);

    if let Some(path) = &cli.write {
        let document = validator.teardown();
        tokio::fs::write(path, to_html(&document))
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(report.is_valid())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(&cli);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
