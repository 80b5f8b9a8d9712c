//! Layered CLI configuration: defaults, then a config file, then
//! `ROTATOR_*` environment variables. Command-line flags are applied last
//! by the caller.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use rotator_engine::RotationConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Settings read from file and environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub dataset_group_arn: Option<String>,

    #[serde(default)]
    pub current_filter_name_template: Option<String>,

    #[serde(default)]
    pub current_filter_expression_template: Option<String>,

    #[serde(default)]
    pub delete_filter_match_template: Option<String>,

    #[serde(default)]
    pub protect_current_filter: bool,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            dataset_group_arn: None,
            current_filter_name_template: None,
            current_filter_expression_template: None,
            delete_filter_match_template: None,
            protect_current_filter: false,
            page_size: default_page_size(),
            dry_run: false,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON log lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_page_size() -> usize {
    rotator_engine::filter::MAX_PAGE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values given on the command line; `None` leaves the layered value alone
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub dataset_group_arn: Option<String>,
    pub name_template: Option<String>,
    pub expression_template: Option<String>,
    pub delete_template: Option<String>,
}

impl CliConfig {
    /// Load configuration; `path` may name a TOML, JSON or YAML file
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let mut builder = Self::defaults()?;
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        Self::finish(builder)
    }

    /// Load configuration from inline TOML
    pub fn from_toml(text: &str) -> CliResult<Self> {
        let builder = Self::defaults()?.add_source(File::from_str(text, FileFormat::Toml));
        Self::finish(builder)
    }

    fn defaults() -> CliResult<ConfigBuilder<DefaultState>> {
        Ok(Config::builder().add_source(Config::try_from(&CliConfig::default())?))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> CliResult<Self> {
        let config = builder
            .add_source(
                Environment::with_prefix("ROTATOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(arn) = &overrides.dataset_group_arn {
            self.dataset_group_arn = Some(arn.clone());
        }
        if let Some(template) = &overrides.name_template {
            self.current_filter_name_template = Some(template.clone());
        }
        if let Some(template) = &overrides.expression_template {
            self.current_filter_expression_template = Some(template.clone());
        }
        if let Some(template) = &overrides.delete_template {
            self.delete_filter_match_template = Some(template.clone());
        }
    }

    /// Build the engine configuration; the three templates/ARN must be set
    pub fn rotation(&self) -> CliResult<RotationConfig> {
        let required = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CliError::Config(format!("'{}' is not set", key)))
        };

        let mut config = RotationConfig::new(
            required(&self.dataset_group_arn, "dataset_group_arn")?,
            required(&self.current_filter_name_template, "current_filter_name_template")?,
            required(
                &self.current_filter_expression_template,
                "current_filter_expression_template",
            )?,
        )
        .with_protect_current_filter(self.protect_current_filter)
        .with_page_size(self.page_size)
        .with_dry_run(self.dry_run);
        config.delete_filter_match_template = self.delete_filter_match_template.clone();

        config.validate()?;
        Ok(config)
    }
}
