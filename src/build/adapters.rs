use std::{collections::BTreeMap, fs, path::Path};

use serde_json::Value;

use crate::config::{AdapterKind, RzdConfig};

/// How a bundler is told to write somewhere other than its usual output dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRedirect {
    Flag(&'static str),
    Env(&'static str),
}

/// Fully resolved command line plus the extra environment for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub command: String,
    pub env: BTreeMap<String, String>,
}

pub trait BuildAdapter: Send + Sync {
    fn kind(&self) -> AdapterKind;
    /// npm package whose presence in package.json identifies the toolchain.
    fn package(&self) -> &'static str;
    fn default_command(&self) -> &'static str;
    fn default_output_dir(&self) -> &'static str;
    fn redirect(&self) -> OutputRedirect;

    fn output_dir(&self, config: &RzdConfig) -> String {
        config
            .output_dir
            .clone()
            .unwrap_or_else(|| self.default_output_dir().to_string())
    }

    fn plan(&self, config: &RzdConfig, output_override: Option<&Path>) -> BuildPlan {
        let mut command = config
            .build_command
            .clone()
            .unwrap_or_else(|| self.default_command().to_string());
        let mut env = config.env.clone();

        if let Some(dir) = output_override {
            let dir = dir.to_string_lossy();
            match self.redirect() {
                OutputRedirect::Flag(flag) => {
                    command = format!("{command} {flag} \"{dir}\"");
                }
                OutputRedirect::Env(key) => {
                    env.insert(key.to_string(), dir.into_owned());
                }
            }
        }

        BuildPlan { command, env }
    }

    /// True when package.json lists the adapter's package.
    fn validate(&self, project_root: &Path) -> bool {
        let Ok(contents) = fs::read_to_string(project_root.join("package.json")) else {
            return false;
        };
        let Ok(package) = serde_json::from_str::<Value>(&contents) else {
            return false;
        };

        ["dependencies", "devDependencies"]
            .iter()
            .any(|section| package[*section].get(self.package()).is_some())
    }
}

pub struct ReactScriptsAdapter;
pub struct ViteAdapter;
pub struct WebpackAdapter;

impl BuildAdapter for ReactScriptsAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::ReactScripts
    }
    fn package(&self) -> &'static str {
        "react-scripts"
    }
    fn default_command(&self) -> &'static str {
        "npx react-scripts build"
    }
    fn default_output_dir(&self) -> &'static str {
        "build"
    }
    fn redirect(&self) -> OutputRedirect {
        OutputRedirect::Env("BUILD_PATH")
    }
}

impl BuildAdapter for ViteAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Vite
    }
    fn package(&self) -> &'static str {
        "vite"
    }
    fn default_command(&self) -> &'static str {
        "npx vite build"
    }
    fn default_output_dir(&self) -> &'static str {
        "dist"
    }
    fn redirect(&self) -> OutputRedirect {
        OutputRedirect::Flag("--outDir")
    }
}

impl BuildAdapter for WebpackAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Webpack
    }
    fn package(&self) -> &'static str {
        "webpack"
    }
    fn default_command(&self) -> &'static str {
        "npx webpack --mode production"
    }
    fn default_output_dir(&self) -> &'static str {
        "dist"
    }
    fn redirect(&self) -> OutputRedirect {
        OutputRedirect::Flag("--output-path")
    }
}

pub fn adapter_for(kind: AdapterKind) -> Box<dyn BuildAdapter> {
    match kind {
        AdapterKind::ReactScripts => Box::new(ReactScriptsAdapter),
        AdapterKind::Vite => Box::new(ViteAdapter),
        AdapterKind::Webpack => Box::new(WebpackAdapter),
    }
}
