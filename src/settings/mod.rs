//! Per-email notification settings, backed by a key-value store.
//!
//! The store holds the admin-editable settings for the pending order email:
//! whether it is enabled, who receives it, subject/heading overrides, the
//! additional content block and the delivery format. Defaults are applied
//! here when a key is unset, not by the store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::DbPool;

/// Setting keys for the pending order email
pub const ENABLED: &str = "enabled";
pub const RECIPIENT: &str = "recipient";
pub const SUBJECT: &str = "subject";
pub const HEADING: &str = "heading";
pub const ADDITIONAL_CONTENT: &str = "additional_content";
pub const EMAIL_TYPE: &str = "email_type";

/// Key-value store for notification settings
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Get a setting value, or None if it was never written
    async fn get(&self, key: &str) -> Option<String>;

    /// Persist a setting value
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// SQLite-backed settings store
pub struct SqliteSettings {
    db: DbPool,
}

impl SqliteSettings {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SettingsStore for SqliteSettings {
    async fn get(&self, key: &str) -> Option<String> {
        let result: Result<Option<(String,)>, sqlx::Error> =
            sqlx::query_as("SELECT value FROM email_settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.db)
                .await;

        match result {
            Ok(row) => row.map(|(value,)| value),
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Settings lookup failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO email_settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

/// In-memory settings store for tests and ephemeral runs
#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with the given key/value pairs
    pub fn with_values(pairs: &[(&str, &str)]) -> Self {
        let store = Self::new();
        {
            let mut values = store.values.lock().unwrap();
            for (key, value) in pairs {
                values.insert(key.to_string(), value.to_string());
            }
        }
        store
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Email delivery formats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailFormat {
    Plain,
    Html,
    Multipart,
}

impl std::fmt::Display for EmailFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Html => write!(f, "html"),
            Self::Multipart => write!(f, "multipart"),
        }
    }
}

impl std::str::FromStr for EmailFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "html" => Ok(Self::Html),
            "multipart" => Ok(Self::Multipart),
            _ => Err(format!("Unknown email format: {}", s)),
        }
    }
}

impl From<String> for EmailFormat {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Self::Html)
    }
}

/// Resolved settings for one notification attempt.
///
/// Loaded once per trigger invocation and not re-read afterwards, so a
/// concurrent settings update never produces a half-old, half-new email.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub recipients: Vec<String>,
    pub subject: Option<String>,
    pub heading: Option<String>,
    pub additional_content: Option<String>,
    pub format: EmailFormat,
}

impl NotificationConfig {
    /// Load settings from the store, applying defaults.
    ///
    /// The recipient setting is a comma-separated list; when it resolves to
    /// nothing, `fallback_recipient` (the site admin address) is used. With
    /// no fallback either, the recipient list stays empty and the email is
    /// gated off.
    pub async fn load(store: &dyn SettingsStore, fallback_recipient: Option<&str>) -> Self {
        let enabled = store
            .get(ENABLED)
            .await
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        let mut recipients = store
            .get(RECIPIENT)
            .await
            .map(|v| parse_recipients(&v))
            .unwrap_or_default();
        if recipients.is_empty() {
            if let Some(fallback) = fallback_recipient {
                recipients.push(fallback.to_string());
            }
        }

        let subject = store.get(SUBJECT).await.filter(|v| !v.trim().is_empty());
        let heading = store.get(HEADING).await.filter(|v| !v.trim().is_empty());
        let additional_content = store.get(ADDITIONAL_CONTENT).await;

        let format = store
            .get(EMAIL_TYPE)
            .await
            .map(EmailFormat::from)
            .unwrap_or(EmailFormat::Html);

        Self {
            enabled,
            recipients,
            subject,
            heading,
            additional_content,
            format,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "yes" | "true" | "1")
}

/// Split a comma-separated recipient list, dropping empty entries
pub fn parse_recipients(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_defaults_from_empty_store() {
        let store = MemorySettings::new();
        let config = NotificationConfig::load(&store, Some("admin@example.com")).await;

        assert!(config.enabled);
        assert_eq!(config.recipients, vec!["admin@example.com".to_string()]);
        assert!(config.subject.is_none());
        assert!(config.heading.is_none());
        assert!(config.additional_content.is_none());
        assert_eq!(config.format, EmailFormat::Html);
    }

    #[tokio::test]
    async fn test_load_no_fallback_leaves_recipients_empty() {
        let store = MemorySettings::new();
        let config = NotificationConfig::load(&store, None).await;
        assert!(config.recipients.is_empty());
    }

    #[tokio::test]
    async fn test_load_explicit_values() {
        let store = MemorySettings::with_values(&[
            (ENABLED, "no"),
            (RECIPIENT, "a@x.com, b@x.com"),
            (SUBJECT, "Order {order_number} is in"),
            (EMAIL_TYPE, "multipart"),
        ]);
        let config = NotificationConfig::load(&store, Some("admin@example.com")).await;

        assert!(!config.enabled);
        assert_eq!(
            config.recipients,
            vec!["a@x.com".to_string(), "b@x.com".to_string()]
        );
        assert_eq!(config.subject.as_deref(), Some("Order {order_number} is in"));
        assert_eq!(config.format, EmailFormat::Multipart);
    }

    #[tokio::test]
    async fn test_blank_subject_falls_back_to_default() {
        let store = MemorySettings::with_values(&[(SUBJECT, "   ")]);
        let config = NotificationConfig::load(&store, None).await;
        assert!(config.subject.is_none());
    }

    #[tokio::test]
    async fn test_unknown_format_falls_back_to_html() {
        let store = MemorySettings::with_values(&[(EMAIL_TYPE, "carrier-pigeon")]);
        let config = NotificationConfig::load(&store, None).await;
        assert_eq!(config.format, EmailFormat::Html);
    }

    #[test]
    fn test_parse_recipients() {
        assert_eq!(
            parse_recipients("a@x.com,b@x.com , c@x.com"),
            vec!["a@x.com", "b@x.com", "c@x.com"]
        );
        assert!(parse_recipients("").is_empty());
        assert!(parse_recipients(" , ,").is_empty());
    }

    #[test]
    fn test_email_format_round_trip() {
        assert_eq!("plain".parse::<EmailFormat>().unwrap(), EmailFormat::Plain);
        assert_eq!(EmailFormat::Multipart.to_string(), "multipart");
        assert!("smoke-signal".parse::<EmailFormat>().is_err());
    }
}
