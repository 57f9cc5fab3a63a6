//! Passive update prompts.
//!
//! A presenter turns [`PromptProps`] into a [`PromptView`] (or nothing when
//! hidden). Views hold no state: pressing a button means handing its
//! [`PromptAction`] back to the watcher.

pub mod banner;
pub mod prompt;

use std::fmt;

use serde::Serialize;

use crate::version::record::short_hash;

pub use banner::{BannerPosition, UpdateBanner};
pub use prompt::UpdatePrompt;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PromptAction {
    Reload,
    HardReload,
    Dismiss,
}

#[derive(Debug, Clone, Default)]
pub struct PromptProps {
    pub show: bool,
    /// Whether the caller wired a dismiss action.
    pub dismissible: bool,
    pub message: Option<String>,
    pub commit_author: Option<String>,
    pub commit_message: Option<String>,
    pub build_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromptButton {
    pub label: &'static str,
    pub action: PromptAction,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PromptStyle {
    Banner(BannerPosition),
    Modal,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromptView {
    pub style: PromptStyle,
    pub title: Option<String>,
    pub body: String,
    pub buttons: Vec<PromptButton>,
}

impl PromptView {
    pub fn button(&self, label: &str) -> Option<PromptAction> {
        self.buttons
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.action)
    }
}

impl fmt::Display for PromptView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buttons = self
            .buttons
            .iter()
            .map(|b| format!("[{}]", b.label))
            .collect::<Vec<_>>()
            .join(" ");

        match self.style {
            PromptStyle::Banner(_) => write!(f, "● {}  {}", self.body, buttons),
            PromptStyle::Modal => {
                if let Some(title) = &self.title {
                    writeln!(f, "== {title} ==")?;
                }
                writeln!(f, "{}", self.body)?;
                write!(f, "{buttons}")
            }
        }
    }
}

/// Anything able to render the update prompt. Implement this to replace the
/// built-in banner and modal.
pub trait UpdatePresenter: Send + Sync {
    fn render(&self, props: &PromptProps) -> Option<PromptView>;
}

/// Placeholder-aware text pieces shared by the built-in presenters.
pub(crate) struct DefaultText {
    pub author: String,
    pub hash: String,
    pub message: String,
}

impl DefaultText {
    pub fn from_props(props: &PromptProps) -> Self {
        Self {
            author: non_empty(props.commit_author.as_deref())
                .unwrap_or("Someone")
                .to_string(),
            hash: props
                .build_id
                .as_deref()
                .and_then(short_hash)
                .unwrap_or_else(|| "a new build".to_string()),
            message: non_empty(props.commit_message.as_deref())
                .map(|m| format!("\"{m}\""))
                .unwrap_or_else(|| "something new".to_string()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
