use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::{config::VERSION_FILE_NAME, version::VersionRecord};

const FALLBACK_VERSION: &str = "0.0.0";

/// Creates the identity of a fresh build: package version, a new build id,
/// the build time and whatever git can tell about HEAD.
pub fn generate_identity(project_root: &Path, now: DateTime<Utc>) -> VersionRecord {
    VersionRecord {
        version: package_version(project_root).unwrap_or_else(|| FALLBACK_VERSION.to_string()),
        commit: git(project_root, &["rev-parse", "HEAD"]),
        commit_author: git(project_root, &["log", "-1", "--format=%an"]),
        commit_message: git(project_root, &["log", "-1", "--format=%s"]),
        build_time: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        build_id: Uuid::new_v4().simple().to_string(),
    }
}

pub fn write_manifest(output_dir: &Path, record: &VersionRecord) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let path = output_dir.join(VERSION_FILE_NAME);
    let serialized = serde_json::to_string_pretty(record)?;
    fs::write(&path, serialized)
        .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(path)
}

pub fn read_manifest(path: &Path) -> Result<VersionRecord> {
    let contents =
        fs::read(path).with_context(|| format!("Failed to read manifest {}", path.display()))?;
    crate::version::fetcher::parse_manifest(&contents)
        .with_context(|| format!("Invalid manifest {}", path.display()))
}

/// Variables handed to the bundler so the new bundle can embed its own
/// identity. Each value is exported bare and with the prefixes CRA and Vite
/// expose to client code.
pub fn identity_env(record: &VersionRecord) -> Vec<(String, String)> {
    let fields = [
        ("VERSION", Some(record.version.as_str())),
        ("BUILD_ID", Some(record.build_id.as_str())),
        ("BUILD_TIME", Some(record.build_time.as_str())),
        ("COMMIT", record.commit.as_deref()),
        ("COMMIT_AUTHOR", record.commit_author.as_deref()),
        ("COMMIT_MESSAGE", record.commit_message.as_deref()),
    ];

    let mut vars = Vec::new();
    for (name, value) in fields {
        let value = value.unwrap_or_default();
        for prefix in ["", "REACT_APP_", "VITE_"] {
            vars.push((format!("{prefix}RZD_{name}"), value.to_string()));
        }
    }
    vars
}

fn package_version(project_root: &Path) -> Option<String> {
    let contents = fs::read_to_string(project_root.join("package.json")).ok()?;
    let package: Value = serde_json::from_str(&contents).ok()?;
    package["version"].as_str().map(str::to_string)
}

fn git(project_root: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(project_root)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
