use serde::Serialize;

use super::{
    DefaultText, PromptAction, PromptButton, PromptProps, PromptStyle, PromptView, UpdatePresenter,
};

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BannerPosition {
    #[default]
    Top,
    Bottom,
}

/// Persistent, non-blocking strip announcing the new build.
#[derive(Debug, Clone, Default)]
pub struct UpdateBanner {
    pub position: BannerPosition,
}

impl UpdateBanner {
    pub fn new(position: BannerPosition) -> Self {
        Self { position }
    }
}

impl UpdatePresenter for UpdateBanner {
    fn render(&self, props: &PromptProps) -> Option<PromptView> {
        if !props.show {
            return None;
        }

        let body = match &props.message {
            Some(message) => message.clone(),
            None => {
                let text = DefaultText::from_props(props);
                format!(
                    "Update available: {} ({}) - {}",
                    text.author, text.hash, text.message
                )
            }
        };

        Some(PromptView {
            style: PromptStyle::Banner(self.position),
            title: None,
            body,
            buttons: vec![
                PromptButton {
                    label: "Refresh",
                    action: PromptAction::Reload,
                },
                PromptButton {
                    label: "Clear Cache",
                    action: PromptAction::HardReload,
                },
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_banner_renders_nothing() {
        assert!(UpdateBanner::default().render(&PromptProps::default()).is_none());
    }

    #[test]
    fn banner_describes_the_commit() {
        let view = UpdateBanner::new(BannerPosition::Bottom)
            .render(&PromptProps {
                show: true,
                commit_author: Some("Ana".into()),
                commit_message: Some("Faster search".into()),
                build_id: Some("xyz789abc".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(view.style, PromptStyle::Banner(BannerPosition::Bottom));
        assert_eq!(
            view.body,
            "Update available: Ana (#xyz789a) - \"Faster search\""
        );
        assert_eq!(view.button("Refresh"), Some(PromptAction::Reload));
        assert_eq!(view.button("Clear Cache"), Some(PromptAction::HardReload));
    }

    #[test]
    fn banner_has_no_dismiss_button() {
        let view = UpdateBanner::default()
            .render(&PromptProps {
                show: true,
                dismissible: true,
                message: Some("Deploy finished".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(view.body, "Deploy finished");
        assert_eq!(view.buttons.len(), 2);
        assert!(view.to_string().starts_with("● Deploy finished"));
    }
}
