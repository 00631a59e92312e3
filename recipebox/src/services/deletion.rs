//! Deletion confirmation gate
//!
//! Removing a saved recipe cannot be undone, so a removal is a two-step
//! exchange: `request` produces the prompt to show, and only a `Confirm`
//! response to that prompt lets the deletion through.

use crate::config::{DELETE_CANCEL_LABEL, DELETE_CONFIRM_LABEL, DELETE_PROMPT_HEADING};
use crate::database::{DisplayContext, Recipe};
use crate::error::{AppError, Result};
use serde::Serialize;

/// Prompt content for the rendering layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletePrompt {
    pub remote_id: String,
    pub display_title: String,
    pub heading: &'static str,
    pub message: String,
    pub confirm_label: &'static str,
    pub cancel_label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResponse {
    Confirm,
    Cancel,
    /// Prompt closed without choosing
    Dismiss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Proceed(String),
    Abandoned,
    NoPendingRequest,
}

#[derive(Debug, Default)]
pub struct DeletionGate {
    pending: Option<DeletePrompt>,
}

impl DeletionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a removal. A newer request replaces an unanswered one.
    pub fn request(&mut self, recipe: &Recipe) -> Result<DeletePrompt> {
        let remote_id = recipe
            .remote_id
            .clone()
            .ok_or_else(|| AppError::validation("remote_id", "Recipe has not been saved yet"))?;

        let display_title = recipe
            .display_title(DisplayContext::PersonalCollection)
            .to_string();

        let prompt = DeletePrompt {
            message: format!(
                "Are you sure you want to remove \"{}\" from your saved recipes?",
                display_title
            ),
            remote_id,
            display_title,
            heading: DELETE_PROMPT_HEADING,
            confirm_label: DELETE_CONFIRM_LABEL,
            cancel_label: DELETE_CANCEL_LABEL,
        };

        tracing::debug!("Confirming removal of {}", prompt.display_title);
        self.pending = Some(prompt.clone());
        Ok(prompt)
    }

    pub fn pending(&self) -> Option<&DeletePrompt> {
        self.pending.as_ref()
    }

    /// Answer the pending prompt. The gate is idle again afterwards.
    pub fn respond(&mut self, response: ConfirmResponse) -> GateDecision {
        match (self.pending.take(), response) {
            (None, _) => GateDecision::NoPendingRequest,
            (Some(prompt), ConfirmResponse::Confirm) => GateDecision::Proceed(prompt.remote_id),
            (Some(_), ConfirmResponse::Cancel | ConfirmResponse::Dismiss) => {
                GateDecision::Abandoned
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(id: &str, title: &str, custom_title: &str) -> Recipe {
        Recipe {
            remote_id: Some(id.to_string()),
            title: title.to_string(),
            custom_title: custom_title.to_string(),
            ..Recipe::new_custom()
        }
    }

    #[test]
    fn test_prompt_uses_display_title() {
        let mut gate = DeletionGate::new();

        let prompt = gate
            .request(&saved("r1", "Tomato Soup", "Grandma's Soup"))
            .unwrap();
        assert_eq!(prompt.display_title, "Grandma's Soup");
        assert_eq!(prompt.heading, "Remove Recipe");
        assert_eq!(
            prompt.message,
            "Are you sure you want to remove \"Grandma's Soup\" from your saved recipes?"
        );

        let prompt = gate.request(&saved("r2", "Tomato Soup", "")).unwrap();
        assert_eq!(prompt.display_title, "Tomato Soup");
        assert_eq!(gate.pending().unwrap().remote_id, "r2");
    }

    #[test]
    fn test_only_confirm_proceeds() {
        let mut gate = DeletionGate::new();
        let recipe = saved("r1", "Pasta", "");

        gate.request(&recipe).unwrap();
        assert_eq!(gate.respond(ConfirmResponse::Cancel), GateDecision::Abandoned);
        assert!(gate.pending().is_none());

        gate.request(&recipe).unwrap();
        assert_eq!(gate.respond(ConfirmResponse::Dismiss), GateDecision::Abandoned);

        gate.request(&recipe).unwrap();
        assert_eq!(
            gate.respond(ConfirmResponse::Confirm),
            GateDecision::Proceed("r1".to_string())
        );
        assert_eq!(
            gate.respond(ConfirmResponse::Confirm),
            GateDecision::NoPendingRequest
        );
    }

    #[test]
    fn test_unsaved_recipe_cannot_be_requested() {
        let mut gate = DeletionGate::new();
        let err = gate.request(&Recipe::new_custom()).unwrap_err();

        assert!(matches!(err, AppError::Validation { field: "remote_id", .. }));
        assert!(gate.pending().is_none());
    }
}
