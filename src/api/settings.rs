use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::notifications::templates;
use crate::settings::{self, EmailFormat, NotificationConfig};
use crate::AppState;

/// Settings for the pending order email, with defaults applied
#[derive(Debug, Serialize)]
pub struct EmailSettingsResponse {
    pub enabled: bool,
    /// Comma-separated recipient list (the admin fallback when unset)
    pub recipient: String,
    pub subject: String,
    pub heading: String,
    pub additional_content: String,
    pub email_type: EmailFormat,
    pub email_type_options: Vec<&'static str>,
}

impl EmailSettingsResponse {
    fn from_config(config: NotificationConfig) -> Self {
        Self {
            enabled: config.enabled,
            recipient: config.recipients.join(", "),
            subject: config
                .subject
                .unwrap_or_else(|| templates::DEFAULT_SUBJECT.to_string()),
            heading: config
                .heading
                .unwrap_or_else(|| templates::DEFAULT_HEADING.to_string()),
            additional_content: config
                .additional_content
                .unwrap_or_else(|| templates::DEFAULT_ADDITIONAL_CONTENT.to_string()),
            email_type: config.format,
            email_type_options: vec!["plain", "html", "multipart"],
        }
    }
}

/// Partial update of the pending order email settings
#[derive(Debug, Deserialize)]
pub struct UpdateEmailSettingsRequest {
    pub enabled: Option<bool>,
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub heading: Option<String>,
    pub additional_content: Option<String>,
    pub email_type: Option<EmailFormat>,
}

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EmailSettingsResponse>, ApiError> {
    let config = NotificationConfig::load(
        state.settings.as_ref(),
        state.config.site.admin_email.as_deref(),
    )
    .await;

    Ok(Json(EmailSettingsResponse::from_config(config)))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateEmailSettingsRequest>,
) -> Result<Json<EmailSettingsResponse>, ApiError> {
    let store = state.settings.as_ref();

    if let Some(enabled) = request.enabled {
        store
            .set(settings::ENABLED, if enabled { "yes" } else { "no" })
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
    }
    if let Some(ref recipient) = request.recipient {
        store
            .set(settings::RECIPIENT, recipient)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
    }
    if let Some(ref subject) = request.subject {
        store
            .set(settings::SUBJECT, subject)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
    }
    if let Some(ref heading) = request.heading {
        store
            .set(settings::HEADING, heading)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
    }
    if let Some(ref additional_content) = request.additional_content {
        store
            .set(settings::ADDITIONAL_CONTENT, additional_content)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
    }
    if let Some(email_type) = request.email_type {
        store
            .set(settings::EMAIL_TYPE, &email_type.to_string())
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
    }

    let config = NotificationConfig::load(store, state.config.site.admin_email.as_deref()).await;

    Ok(Json(EmailSettingsResponse::from_config(config)))
}
