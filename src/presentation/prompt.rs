use super::{
    DefaultText, PromptAction, PromptButton, PromptProps, PromptStyle, PromptView, UpdatePresenter,
};

/// Blocking modal asking the user to refresh.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdatePrompt;

impl UpdatePresenter for UpdatePrompt {
    fn render(&self, props: &PromptProps) -> Option<PromptView> {
        if !props.show {
            return None;
        }

        let body = match &props.message {
            Some(message) => message.clone(),
            None => {
                let text = DefaultText::from_props(props);
                format!(
                    "{} commit {} and {} is coming.\nPlease refresh to continue.",
                    text.author, text.hash, text.message
                )
            }
        };

        let mut buttons = vec![
            PromptButton {
                label: "Refresh Now",
                action: PromptAction::Reload,
            },
            PromptButton {
                label: "Clear Cache & Refresh",
                action: PromptAction::HardReload,
            },
        ];
        if props.dismissible {
            buttons.push(PromptButton {
                label: "Dismiss",
                action: PromptAction::Dismiss,
            });
        }

        Some(PromptView {
            style: PromptStyle::Modal,
            title: Some("Update Required".to_string()),
            body,
            buttons,
        })
    }
}
