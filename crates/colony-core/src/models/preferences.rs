use serde::{Deserialize, Serialize};

/// Notification delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub enabled: bool,
    pub sound: bool,
    /// When set, only critical-priority attentions notify.
    pub critical_only: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: false,
            critical_only: false,
        }
    }
}

/// User preferences persisted across restarts. Everything else in the core
/// is process-scoped.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub notifications: NotificationPreferences,
    #[serde(default)]
    pub favorite_models: Vec<String>,
}

impl UserPreferences {
    /// Toggle a model in the favorites list. Returns true if the model is
    /// favorited after the call.
    pub fn toggle_favorite_model(&mut self, model_id: &str) -> bool {
        if let Some(pos) = self.favorite_models.iter().position(|m| m == model_id) {
            self.favorite_models.remove(pos);
            false
        } else {
            self.favorite_models.push(model_id.to_string());
            true
        }
    }
}
