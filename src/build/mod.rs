//! Build wrapper: runs the project's bundler into a scratch directory, merges
//! the result over the live output without removing old chunks, and publishes
//! `app-version.json` for running clients to poll.

pub mod adapters;
pub mod manifest;
pub mod merge;

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{bail, Context, Result};
use chrono::Utc;

use crate::{config::RzdConfig, version::VersionRecord};

pub use adapters::{adapter_for, BuildAdapter, BuildPlan};
pub use manifest::{generate_identity, identity_env, read_manifest, write_manifest};
pub use merge::merge_into;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub identity: VersionRecord,
    pub output_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub files_merged: usize,
}

pub fn build(config: &RzdConfig, project_root: &Path) -> Result<BuildReport> {
    let adapter = adapter_for(config.adapter);
    if config.build_command.is_none() && !adapter.validate(project_root) {
        log_warn!(
            "{} is not listed in package.json; running the build anyway",
            adapter.package()
        );
    }

    let now = Utc::now();
    let identity = generate_identity(project_root, now);
    let scratch_dir = project_root.join(format!("build-tmp-{}", now.timestamp_millis()));
    let output_dir = project_root.join(adapter.output_dir(config));

    let plan = adapter.plan(config, Some(&scratch_dir));
    log_info!(
        "Building {} ({}) with {} into {}",
        identity.version,
        identity.build_id,
        adapter.kind(),
        scratch_dir.display()
    );

    let result = run_and_publish(&plan, &identity, project_root, &scratch_dir, &output_dir);

    if scratch_dir.exists() {
        if let Err(err) = fs::remove_dir_all(&scratch_dir) {
            log_warn!("Failed to remove {}: {err}", scratch_dir.display());
        }
    }

    let (manifest_path, files_merged) = result?;
    log_info!(
        "Merged {files_merged} files into {}; old chunks preserved",
        output_dir.display()
    );

    Ok(BuildReport {
        identity,
        output_dir,
        manifest_path,
        files_merged,
    })
}

fn run_and_publish(
    plan: &BuildPlan,
    identity: &VersionRecord,
    project_root: &Path,
    scratch_dir: &Path,
    output_dir: &Path,
) -> Result<(PathBuf, usize)> {
    run_command(plan, identity, project_root)?;

    if !scratch_dir.exists() {
        bail!(
            "build finished but produced nothing at {}",
            scratch_dir.display()
        );
    }

    let files_merged = merge_into(scratch_dir, output_dir)?;
    // Written last so clients never see a manifest for assets not yet in place.
    let manifest_path = write_manifest(output_dir, identity)?;
    Ok((manifest_path, files_merged))
}

fn run_command(plan: &BuildPlan, identity: &VersionRecord, project_root: &Path) -> Result<()> {
    let mut command = shell(&plan.command);
    command
        .current_dir(project_root)
        .envs(identity_env(identity))
        .envs(&plan.env);

    let status = command
        .status()
        .with_context(|| format!("Failed to spawn `{}`", plan.command))?;

    if !status.success() {
        log_error!("`{}` exited with {status}", plan.command);
        bail!("Build failed with {status}");
    }
    Ok(())
}

#[cfg(windows)]
fn shell(script: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", script]);
    command
}

#[cfg(not(windows))]
fn shell(script: &str) -> Command {
    let mut command = Command::new("sh");
    command.args(["-c", script]);
    command
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::AdapterKind;

    fn config(command: &str) -> RzdConfig {
        RzdConfig {
            adapter: AdapterKind::ReactScripts,
            build_command: Some(command.to_string()),
            ..RzdConfig::default()
        }
    }

    #[test]
    fn builds_merges_and_publishes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("package.json"), r#"{ "version": "1.1.0" }"#).unwrap();
        fs::create_dir_all(root.join("build/static")).unwrap();
        fs::write(root.join("build/static/old.js"), "old").unwrap();

        let script = r#"mkdir -p "$BUILD_PATH/static" && echo "$RZD_BUILD_ID" > "$BUILD_PATH/static/new.js" && echo ok > "$BUILD_PATH/index.html""#;
        let report = build(&config(script), root).unwrap();

        assert_eq!(report.files_merged, 2);
        assert_eq!(report.identity.version, "1.1.0");
        assert!(root.join("build/static/old.js").exists());
        assert_eq!(
            fs::read_to_string(root.join("build/static/new.js")).unwrap().trim(),
            report.identity.build_id
        );

        let published = read_manifest(&report.manifest_path).unwrap();
        assert_eq!(published.build_id, report.identity.build_id);

        let leftovers = fs::read_dir(root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("build-tmp-"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn failed_build_leaves_live_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::write(root.join("build/index.html"), "live").unwrap();

        let script = r#"mkdir -p "$BUILD_PATH" && echo broken > "$BUILD_PATH/index.html" && exit 3"#;
        assert!(build(&config(script), root).is_err());

        assert_eq!(fs::read_to_string(root.join("build/index.html")).unwrap(), "live");
        assert!(!root.join("build/app-version.json").exists());
    }

    #[test]
    fn empty_build_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(build(&config("true"), dir.path()).is_err());
    }
}
