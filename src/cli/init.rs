use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use log::info;
use serde_json::{Map, Value};

use crate::config::RzdConfig;

pub const WRAPPED_BUILD_SCRIPT: &str = "rzd build";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct InitOutcome {
    pub config_created: bool,
    pub original_script_saved: bool,
}

/// Writes the config template and routes `npm run build` through rzd.
pub fn init_project(project_root: &Path) -> Result<InitOutcome> {
    let package_path = project_root.join("package.json");
    if !package_path.exists() {
        bail!(
            "package.json not found in {}. Make sure you are in a valid project directory.",
            project_root.display()
        );
    }

    let mut outcome = InitOutcome::default();

    let config_path = RzdConfig::path_in(project_root);
    if config_path.exists() {
        info!("{} already exists, skipping", config_path.display());
    } else {
        let template = serde_json::to_string_pretty(&RzdConfig::template())?;
        fs::write(&config_path, template + "\n")
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        info!("Created {}", config_path.display());
        outcome.config_created = true;
    }

    let contents = fs::read_to_string(&package_path)
        .with_context(|| format!("Failed to read {}", package_path.display()))?;
    let mut package: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid JSON in {}", package_path.display()))?;
    let Some(root) = package.as_object_mut() else {
        bail!("{} is not a JSON object", package_path.display());
    };

    let scripts = root
        .entry("scripts")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(scripts) = scripts.as_object_mut() else {
        bail!("\"scripts\" in package.json is not an object");
    };

    if let Some(existing) = scripts.get("build").cloned() {
        if existing != Value::from(WRAPPED_BUILD_SCRIPT) && !scripts.contains_key("build:original") {
            scripts.insert("build:original".to_string(), existing);
            info!("Original build script saved as \"build:original\"");
            outcome.original_script_saved = true;
        }
    }
    scripts.insert("build".to_string(), Value::from(WRAPPED_BUILD_SCRIPT));

    fs::write(&package_path, serde_json::to_string_pretty(&package)? + "\n")
        .with_context(|| format!("Failed to write {}", package_path.display()))?;
    info!("Updated package.json build script");

    Ok(outcome)
}
