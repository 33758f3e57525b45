use crate::cli::{Cli, OutputFormat};
use crate::controller::{DEFAULT_ANCHOR, DEFAULT_ERROR_CLASS, FormOptions};
use crate::messages::Translator;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub presentation: PresentationConfig,
    /// Rule name → message, merged over the built-in messages
    pub messages: BTreeMap<String, String>,
    /// Message text → displayed text; untranslated text is shown as is
    pub translations: BTreeMap<String, String>,
    pub output: OutputConfig,
}

/// Where and how error state is rendered
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PresentationConfig {
    /// Selector of the element whose fields are validated
    pub container: String,
    /// Error blocks go after the closest ancestor matching this selector
    pub anchor: String,
    /// Class marking invalid fields
    pub error_class: String,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormatConfig,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (invalid fields only)
    pub quiet: bool,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    Human,
    Json,
    Summary,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
            OutputFormat::Summary => OutputFormatConfig::Summary,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
            OutputFormatConfig::Summary => OutputFormat::Summary,
        }
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            container: "form".to_string(),
            anchor: DEFAULT_ANCHOR.to_string(),
            error_class: DEFAULT_ERROR_CLASS.to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormatConfig::Human,
            verbose: false,
            quiet: false,
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(cli, &SystemEnvProvider).await
    }

    /// Same as [`ConfigManager::load_config`] with a custom environment provider
    pub async fn load_config_with(cli: &Cli, env: &impl EnvProvider) -> Result<Config> {
        // Start with default configuration
        let mut config = Config::default();

        // Load from configuration file if specified
        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides_with(env, config)?;

        // CLI arguments have the highest precedence
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = ["bevalid.toml", ".bevalid.toml", "bevalid.json"];

        // Check current directory first
        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("bevalid");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(container) = env.get("BEVALID_CONTAINER") {
            config.presentation.container = container;
        }

        if let Some(anchor) = env.get("BEVALID_ANCHOR") {
            config.presentation.anchor = anchor;
        }

        if let Some(error_class) = env.get("BEVALID_ERROR_CLASS") {
            config.presentation.error_class = error_class;
        }

        if let Some(verbose) = env.get("BEVALID_VERBOSE") {
            config.output.verbose = verbose.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid BEVALID_VERBOSE value: {}", verbose))
            })?;
        }

        if let Some(quiet) = env.get("BEVALID_QUIET") {
            config.output.quiet = quiet.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid BEVALID_QUIET value: {}", quiet))
            })?;
        }

        if let Some(format) = env.get("BEVALID_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                "summary" => OutputFormatConfig::Summary,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid BEVALID_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(container) = &cli.container {
            config.presentation.container = container.clone();
        }
        if let Some(anchor) = &cli.anchor {
            config.presentation.anchor = anchor.clone();
        }
        if let Some(error_class) = &cli.error_class {
            config.presentation.error_class = error_class.clone();
        }

        if let Some(format) = cli.output_format {
            config.output.format = format.into();
        }
        if cli.verbose || cli.quiet {
            config.output.verbose = cli.verbose;
            config.output.quiet = cli.quiet;
        }

        config
    }

    /// Merge two configurations; tables are merged by key, everything else
    /// comes from `override_config`
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        base.presentation = override_config.presentation;
        base.messages.extend(override_config.messages);
        base.translations.extend(override_config.translations);
        base.output = override_config.output;
        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        let presentation = &config.presentation;

        if presentation.error_class.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Error class must not be empty".to_string(),
            ));
        }

        if presentation.error_class.contains(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "Error class must be a single class name: {}",
                presentation.error_class
            )));
        }

        for (what, selector) in [
            ("container", &presentation.container),
            ("anchor", &presentation.anchor),
        ] {
            Selector::parse(selector).map_err(|e| {
                ConfigError::Validation(format!("Invalid {} selector: {}", what, e))
            })?;
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }

    /// Build controller options from a validated configuration
    pub fn form_options(config: &Config) -> Result<FormOptions> {
        let translator = if config.translations.is_empty() {
            Translator::identity()
        } else {
            Translator::from_table(config.translations.clone().into_iter().collect())
        };

        let options = FormOptions::default()
            .with_anchor(&config.presentation.anchor)
            .and_then(|options| options.with_error_class(&config.presentation.error_class))
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(options.with_translator(translator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn new() -> Self {
            Self {
                vars: HashMap::new(),
            }
        }

        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[tokio::test]
    async fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.presentation.container, "form");
        assert_eq!(config.presentation.anchor, "label");
        assert_eq!(config.presentation.error_class, "bevalid-error");
        assert!(config.messages.is_empty());
        assert!(config.translations.is_empty());

        assert_eq!(config.output.format, OutputFormatConfig::Human);
        assert!(!config.output.verbose);
        assert!(!config.output.quiet);
    }

    #[tokio::test]
    async fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bevalid.toml");

        let toml_content = r##"
[presentation]
container = "#signup"
anchor = ".row"
error_class = "has-error"

[messages]
required = "Please fill in this field"

[translations]
"Please fill in this field" = "Будь ласка, заповніть це поле"

[output]
format = "json"
verbose = true
quiet = false
"##;

        fs::write(&config_path, toml_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.presentation.container, "#signup");
        assert_eq!(config.presentation.anchor, ".row");
        assert_eq!(config.presentation.error_class, "has-error");
        assert_eq!(
            config.messages.get("required").map(String::as_str),
            Some("Please fill in this field")
        );
        assert_eq!(config.translations.len(), 1);
        assert_eq!(config.output.format, OutputFormatConfig::Json);
        assert!(config.output.verbose);
    }

    #[tokio::test]
    async fn test_load_partial_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bevalid.json");

        fs::write(
            &config_path,
            r#"{"presentation": {"error_class": "bad"}, "output": {"format": "summary"}}"#,
        )
        .unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.presentation.error_class, "bad");
        assert_eq!(config.presentation.anchor, "label");
        assert_eq!(config.output.format, OutputFormatConfig::Summary);
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bevalid.json");
        fs::write(&config_path, "{ invalid json").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result, Err(ConfigError::JsonParsing(_))));
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bevalid.yaml");
        fs::write(&config_path, "presentation: {}").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));
    }

    #[test]
    fn test_environment_overrides() {
        let mut mock_env = MockEnvProvider::new();
        mock_env.set("BEVALID_CONTAINER", "#checkout");
        mock_env.set("BEVALID_ERROR_CLASS", "is-invalid");
        mock_env.set("BEVALID_QUIET", "true");
        mock_env.set("BEVALID_FORMAT", "SUMMARY");

        let config =
            ConfigManager::apply_environment_overrides_with(&mock_env, Config::default()).unwrap();

        assert_eq!(config.presentation.container, "#checkout");
        assert_eq!(config.presentation.anchor, "label");
        assert_eq!(config.presentation.error_class, "is-invalid");
        assert!(config.output.quiet);
        assert_eq!(config.output.format, OutputFormatConfig::Summary);
    }

    #[test]
    fn test_invalid_environment_values() {
        let mut mock_env = MockEnvProvider::new();
        mock_env.set("BEVALID_VERBOSE", "loud");

        let result = ConfigManager::apply_environment_overrides_with(&mock_env, Config::default());
        assert!(matches!(result, Err(ConfigError::Environment(_))));

        let mut mock_env = MockEnvProvider::new();
        mock_env.set("BEVALID_FORMAT", "xml");
        let result = ConfigManager::apply_environment_overrides_with(&mock_env, Config::default());
        assert!(matches!(result, Err(ConfigError::Environment(_))));
    }

    #[test]
    fn test_merge_with_cli() {
        use clap::Parser;

        let mut base_config = Config::default();
        base_config.output.format = OutputFormatConfig::Json;
        base_config.output.quiet = true;

        let cli = Cli::try_parse_from([
            "bevalid",
            "page.html",
            "--anchor",
            "fieldset",
            "--error-class",
            "oops",
        ])
        .unwrap();
        let config = ConfigManager::merge_with_cli(base_config.clone(), &cli);

        assert_eq!(config.presentation.anchor, "fieldset");
        assert_eq!(config.presentation.error_class, "oops");
        assert_eq!(config.presentation.container, "form");
        assert_eq!(config.output.format, OutputFormatConfig::Json);
        assert!(config.output.quiet);

        let cli = Cli::try_parse_from(["bevalid", "page.html", "-v", "-f", "human"]).unwrap();
        let config = ConfigManager::merge_with_cli(base_config, &cli);
        assert!(config.output.verbose);
        assert!(!config.output.quiet);
        assert_eq!(config.output.format, OutputFormatConfig::Human);
    }

    #[test]
    fn test_merge_configs() {
        let mut base = Config::default();
        base.messages.insert("required".into(), "Needed".into());
        base.messages.insert("email".into(), "Bad email".into());

        let mut override_config = Config::default();
        override_config.presentation.error_class = "oops".into();
        override_config.messages.insert("email".into(), "Not an email".into());

        let merged = ConfigManager::merge_configs(base, override_config);

        assert_eq!(merged.presentation.error_class, "oops");
        assert_eq!(merged.messages.get("required").unwrap(), "Needed");
        assert_eq!(merged.messages.get("email").unwrap(), "Not an email");
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        let mut config = Config::default();
        config.presentation.error_class = "  ".into();
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.presentation.error_class = "two classes".into();
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.presentation.anchor = "label[".into();
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.presentation.container = "".into();
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.output.verbose = true;
        config.output.quiet = true;
        assert!(ConfigManager::validate_config(&config).is_err());
    }

    #[test]
    fn test_form_options() {
        let mut config = Config::default();
        config.presentation.error_class = "oops".into();
        config
            .translations
            .insert("This field is required".into(), "Обов'язкове поле".into());

        let options = ConfigManager::form_options(&config).unwrap();

        assert_eq!(options.error_class, "oops");
        assert_eq!(options.anchor, Selector::parse("label").unwrap());
        assert_eq!(
            options.translator.translate("This field is required"),
            "Обов'язкове поле"
        );
        assert_eq!(options.translator.translate("Other"), "Other");
    }

    #[test]
    fn test_form_options_rejects_unvalidated_values() {
        let mut config = Config::default();
        config.presentation.error_class = "two classes".into();
        assert!(matches!(
            ConfigManager::form_options(&config),
            Err(ConfigError::Validation(_))
        ));

        let mut config = Config::default();
        config.presentation.anchor = ".row >".into();
        assert!(matches!(
            ConfigManager::form_options(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_output_format_conversion() {
        assert_eq!(
            OutputFormatConfig::from(OutputFormat::Json),
            OutputFormatConfig::Json
        );
        assert_eq!(
            OutputFormat::from(OutputFormatConfig::Summary),
            OutputFormat::Summary
        );
    }

    #[tokio::test]
    async fn test_load_config_integration() {
        use clap::Parser;

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        let toml_content = r#"
[presentation]
anchor = ".row"
error_class = "has-error"

[output]
format = "summary"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let mut mock_env = MockEnvProvider::new();
        mock_env.set("BEVALID_ERROR_CLASS", "from-env");
        mock_env.set("BEVALID_CONTAINER", "#signup");

        let cli = Cli::try_parse_from([
            "bevalid",
            "page.html",
            "--config",
            config_path.to_str().unwrap(),
            "--container",
            "#checkout",
        ])
        .unwrap();
        let config = ConfigManager::load_config_with(&cli, &mock_env).await.unwrap();

        // file
        assert_eq!(config.presentation.anchor, ".row");
        assert_eq!(config.output.format, OutputFormatConfig::Summary);
        // environment over file
        assert_eq!(config.presentation.error_class, "from-env");
        // CLI over environment
        assert_eq!(config.presentation.container, "#checkout");
    }
}
