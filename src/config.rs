use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::mapping::FieldRule;

pub const YOUTRACK_TOKEN_ENV: &str = "YOUTRACK_TOKEN";
pub const AZURE_DEVOPS_TOKEN_ENV: &str = "AZURE_DEVOPS_TOKEN";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub youtrack: Option<YouTrackConfig>,
    pub azure_devops: Option<AzureDevOpsConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

#[derive(Debug, Deserialize)]
pub struct YouTrackConfig {
    /// e.g. `https://example.myjetbrains.com/youtrack`
    pub base_url: String,
    pub token: Option<String>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Deserialize)]
pub struct AzureDevOpsConfig {
    /// Organization URL, e.g. `https://dev.azure.com/contoso`
    pub organization: String,
    pub project: String,
    /// Personal access token.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_work_item_type")]
    pub work_item_type: String,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_work_item_type() -> String {
    "Task".into()
}

fn default_log_level() -> String {
    "info".into()
}

pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".yt2ado")
        .join("config.toml")
}

/// Load the config file at `path` (or the default location), then apply
/// token overrides from the environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        parse_config(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        AppConfig::default()
    };
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    Ok(toml::from_str(contents)?)
}

impl AppConfig {
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let (Some(yt), Some(token)) = (self.youtrack.as_mut(), var(YOUTRACK_TOKEN_ENV)) {
            yt.token = Some(token);
        }
        if let (Some(ado), Some(token)) = (self.azure_devops.as_mut(), var(AZURE_DEVOPS_TOKEN_ENV)) {
            ado.token = token;
        }
    }

    pub fn youtrack(&self) -> Result<&YouTrackConfig> {
        self.youtrack
            .as_ref()
            .context("Missing [youtrack] section in config")
    }

    pub fn azure_devops(&self) -> Result<&AzureDevOpsConfig> {
        let ado = self
            .azure_devops
            .as_ref()
            .context("Missing [azure_devops] section in config")?;
        if ado.token.is_empty() {
            anyhow::bail!(
                "No Azure DevOps token configured. Set azure_devops.token or {AZURE_DEVOPS_TOKEN_ENV}"
            );
        }
        Ok(ado)
    }
}
