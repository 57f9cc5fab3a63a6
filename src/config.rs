use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::version::{DEFAULT_CHECK_INTERVAL, DEFAULT_VERSION_ENDPOINT};

pub const CONFIG_FILE_NAME: &str = "rzd.config.json";
pub const VERSION_FILE_NAME: &str = "app-version.json";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    #[default]
    ReactScripts,
    Vite,
    Webpack,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::ReactScripts => "react-scripts",
            AdapterKind::Vite => "vite",
            AdapterKind::Webpack => "webpack",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "react-scripts" => Ok(AdapterKind::ReactScripts),
            "vite" => Ok(AdapterKind::Vite),
            "webpack" => Ok(AdapterKind::Webpack),
            _ => Err(anyhow!("unknown build adapter '{value}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RzdConfig {
    pub adapter: AdapterKind,
    /// Falls back to the adapter's own default when unset.
    pub output_dir: Option<String>,
    /// Milliseconds between version checks.
    pub check_interval: u64,
    pub version_endpoint: String,
    pub debug: bool,
    pub build_command: Option<String>,
    pub env: BTreeMap<String, String>,
}

impl Default for RzdConfig {
    fn default() -> Self {
        Self {
            adapter: AdapterKind::default(),
            output_dir: None,
            check_interval: DEFAULT_CHECK_INTERVAL.as_millis() as u64,
            version_endpoint: DEFAULT_VERSION_ENDPOINT.to_string(),
            debug: false,
            build_command: None,
            env: BTreeMap::new(),
        }
    }
}

impl RzdConfig {
    pub fn path_in(project_root: &Path) -> PathBuf {
        project_root.join(CONFIG_FILE_NAME)
    }

    /// Reads `rzd.config.json` from `project_root`. A missing file is not an
    /// error; a malformed one is.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = Self::path_in(project_root);
        if !path.exists() {
            warn!("Config file not found at {}. Using defaults.", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: RzdConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", path.display()))?;

        if config.debug {
            info!("Loaded config: {config:?}");
        }
        Ok(config)
    }

    /// Loads the config file, then applies `RZD_*` environment overrides.
    pub fn load_with_env(project_root: &Path) -> Result<Self> {
        let mut config = Self::load(project_root)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("RZD_CHECK_INTERVAL") {
            self.check_interval = value
                .trim()
                .parse()
                .with_context(|| format!("RZD_CHECK_INTERVAL is not a number: '{value}'"))?;
        }

        if let Some(value) = lookup("RZD_VERSION_ENDPOINT") {
            self.version_endpoint = value;
        }

        if lookup("RZD_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        {
            self.debug = true;
        }

        Ok(())
    }

    /// Template written by `rzd init`.
    pub fn template() -> Self {
        Self {
            output_dir: Some("build".to_string()),
            ..Self::default()
        }
    }
}
