//! Pending order email notifications.
//!
//! This module bridges an "order created" event to a dispatched email:
//! resolve the order, load the notification settings, decide whether the
//! email should go out at all, render subject/heading/body and hand the
//! result to a [`Mailer`]. Everything the pipeline touches is an injected
//! trait, so the whole decision path is testable with in-memory fakes.

pub mod smtp;
pub mod templates;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::orders::{Order, OrderRepository};
use crate::settings::{EmailFormat, NotificationConfig, SettingsStore};

/// Errors surfaced by mail dispatch
#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to build message: {0}")]
    Message(String),
    #[error("failed to read attachment {0}")]
    Attachment(String),
    #[error("delivery failed: {0}")]
    Transport(String),
}

/// A fully rendered email ready for dispatch
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub attachments: Vec<PathBuf>,
}

/// Mail dispatch abstraction.
///
/// Delivery is fire-and-forget from the trigger's point of view; retries and
/// failure reporting are the implementation's concern.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// Sends admins an email when a new order comes in.
///
/// Stateless per-event handler: nothing persists between invocations beyond
/// the externally-owned settings, and re-triggering the same order sends the
/// email again.
pub struct PendingOrderEmail {
    settings: Arc<dyn SettingsStore>,
    orders: Arc<dyn OrderRepository>,
    mailer: Arc<dyn Mailer>,
    site_title: String,
    fallback_recipient: Option<String>,
}

impl PendingOrderEmail {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        orders: Arc<dyn OrderRepository>,
        mailer: Arc<dyn Mailer>,
        site_title: String,
        fallback_recipient: Option<String>,
    ) -> Self {
        Self {
            settings,
            orders,
            mailer,
            site_title,
            fallback_recipient,
        }
    }

    /// Handle an "order created" event.
    ///
    /// All failure paths are silent no-ops: an order that cannot be resolved
    /// (a storefront can deliver the event before the order row is visible),
    /// a disabled email or an empty recipient list simply drop the event.
    /// Nothing is reported back to the event source.
    pub async fn on_order_created(&self, order_id: &str, order: Option<Order>) {
        let order = match order {
            Some(order) => order,
            None => match self.orders.resolve(order_id).await {
                Some(order) => order,
                None => {
                    tracing::debug!(order_id = %order_id, "Order not found, skipping notification");
                    return;
                }
            },
        };

        let config =
            NotificationConfig::load(self.settings.as_ref(), self.fallback_recipient.as_deref())
                .await;

        let placeholders = templates::order_placeholders(&order, &self.site_title);

        if !config.enabled {
            tracing::debug!(order_id = %order.id, "Pending order email disabled, skipping");
            return;
        }
        if config.recipients.is_empty() {
            tracing::debug!(order_id = %order.id, "No recipients configured, skipping");
            return;
        }

        let subject = templates::substitute(
            config.subject.as_deref().unwrap_or(templates::DEFAULT_SUBJECT),
            &placeholders,
        );
        let heading = templates::substitute(
            config.heading.as_deref().unwrap_or(templates::DEFAULT_HEADING),
            &placeholders,
        );
        let additional_content = templates::substitute(
            config
                .additional_content
                .as_deref()
                .unwrap_or(templates::DEFAULT_ADDITIONAL_CONTENT),
            &placeholders,
        );

        let html_body = match config.format {
            EmailFormat::Html | EmailFormat::Multipart => Some(templates::render_order_html(
                &order,
                &heading,
                &additional_content,
            )),
            EmailFormat::Plain => None,
        };
        let text_body = match config.format {
            EmailFormat::Plain | EmailFormat::Multipart => Some(templates::render_order_text(
                &order,
                &heading,
                &additional_content,
            )),
            EmailFormat::Html => None,
        };

        let email = OutgoingEmail {
            to: config.recipients,
            subject,
            html_body,
            text_body,
            attachments: Vec::new(),
        };

        match self.mailer.send(&email).await {
            Ok(()) => {
                tracing::info!(
                    order_id = %order.id,
                    order_number = %order.number,
                    recipients = email.to.len(),
                    format = %config.format,
                    "Pending order email sent"
                );
            }
            Err(e) => {
                tracing::error!(
                    order_id = %order.id,
                    order_number = %order.number,
                    error = %e,
                    "Failed to send pending order email"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{self, MemorySettings};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    impl RecordingMailer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<OutgoingEmail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    struct FakeOrders {
        orders: HashMap<String, Order>,
    }

    impl FakeOrders {
        fn empty() -> Arc<Self> {
            Arc::new(Self {
                orders: HashMap::new(),
            })
        }

        fn with(order: Order) -> Arc<Self> {
            let mut orders = HashMap::new();
            orders.insert(order.id.clone(), order);
            Arc::new(Self { orders })
        }
    }

    #[async_trait]
    impl OrderRepository for FakeOrders {
        async fn resolve(&self, order_id: &str) -> Option<Order> {
            self.orders.get(order_id).cloned()
        }
    }

    fn sample_order() -> Order {
        Order {
            id: "o-7".to_string(),
            number: "1007".to_string(),
            status: "pending".to_string(),
            customer_name: "Jane Doe".to_string(),
            customer_email: "jane@example.com".to_string(),
            currency: "USD".to_string(),
            total: "59.00".to_string(),
            items: r#"[{"name":"Widget","quantity":2,"line_total":"59.00"}]"#.to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn trigger(
        store: MemorySettings,
        orders: Arc<FakeOrders>,
        mailer: Arc<RecordingMailer>,
    ) -> PendingOrderEmail {
        PendingOrderEmail::new(
            Arc::new(store),
            orders,
            mailer,
            "Acme".to_string(),
            Some("admin@example.com".to_string()),
        )
    }

    #[tokio::test]
    async fn test_sends_exactly_once_for_valid_order() {
        let mailer = RecordingMailer::new();
        let email = trigger(
            MemorySettings::with_values(&[(settings::RECIPIENT, "a@x.com")]),
            FakeOrders::empty(),
            mailer.clone(),
        );

        email.on_order_created("o-7", Some(sample_order())).await;

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["a@x.com".to_string()]);
        assert_eq!(sent[0].subject, "[Acme]: New order #1007");
        assert!(sent[0].html_body.is_some());
        assert!(sent[0].text_body.is_none());
        assert!(sent[0].attachments.is_empty());
    }

    #[tokio::test]
    async fn test_resolves_order_by_id_when_not_supplied() {
        let mailer = RecordingMailer::new();
        let email = trigger(
            MemorySettings::new(),
            FakeOrders::with(sample_order()),
            mailer.clone(),
        );

        email.on_order_created("o-7", None).await;

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        // No recipient setting: falls back to the admin address
        assert_eq!(sent[0].to, vec!["admin@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_unresolved_order_sends_nothing() {
        let mailer = RecordingMailer::new();
        let email = trigger(MemorySettings::new(), FakeOrders::empty(), mailer.clone());

        email.on_order_created("missing", None).await;

        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_sends_nothing() {
        let mailer = RecordingMailer::new();
        let email = trigger(
            MemorySettings::with_values(&[(settings::ENABLED, "no")]),
            FakeOrders::empty(),
            mailer.clone(),
        );

        email.on_order_created("o-7", Some(sample_order())).await;

        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_no_recipients_and_no_fallback_sends_nothing() {
        let mailer = RecordingMailer::new();
        let email = PendingOrderEmail::new(
            Arc::new(MemorySettings::new()),
            FakeOrders::empty(),
            mailer.clone(),
            "Acme".to_string(),
            None,
        );

        email.on_order_created("o-7", Some(sample_order())).await;

        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_retrigger_sends_again() {
        let mailer = RecordingMailer::new();
        let email = trigger(MemorySettings::new(), FakeOrders::empty(), mailer.clone());

        email.on_order_created("o-7", Some(sample_order())).await;
        email.on_order_created("o-7", Some(sample_order())).await;

        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_multipart_renders_both_bodies() {
        let mailer = RecordingMailer::new();
        let email = trigger(
            MemorySettings::with_values(&[(settings::EMAIL_TYPE, "multipart")]),
            FakeOrders::empty(),
            mailer.clone(),
        );

        email.on_order_created("o-7", Some(sample_order())).await;

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].html_body.is_some());
        assert!(sent[0].text_body.is_some());
    }

    #[tokio::test]
    async fn test_plain_format_renders_text_only() {
        let mailer = RecordingMailer::new();
        let email = trigger(
            MemorySettings::with_values(&[(settings::EMAIL_TYPE, "plain")]),
            FakeOrders::empty(),
            mailer.clone(),
        );

        email.on_order_created("o-7", Some(sample_order())).await;

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].html_body.is_none());
        let text = sent[0].text_body.as_deref().unwrap();
        assert!(text.contains("New Order: #1007"));
        assert!(text.contains("Congrats on the order."));
    }

    #[tokio::test]
    async fn test_subject_override_with_placeholders() {
        let mailer = RecordingMailer::new();
        let email = trigger(
            MemorySettings::with_values(&[(
                settings::SUBJECT,
                "Order {order_number} placed on {order_date}",
            )]),
            FakeOrders::empty(),
            mailer.clone(),
        );

        email.on_order_created("o-7", Some(sample_order())).await;

        let sent = mailer.sent();
        assert_eq!(sent[0].subject, "Order 1007 placed on January 1, 2024");
    }

    #[tokio::test]
    async fn test_custom_additional_content_in_body() {
        let mailer = RecordingMailer::new();
        let email = trigger(
            MemorySettings::with_values(&[
                (settings::ADDITIONAL_CONTENT, "Ship order {order_number} fast."),
                (settings::EMAIL_TYPE, "plain"),
            ]),
            FakeOrders::empty(),
            mailer.clone(),
        );

        email.on_order_created("o-7", Some(sample_order())).await;

        let text = mailer.sent()[0].text_body.clone().unwrap();
        assert!(text.contains("Ship order 1007 fast."));
    }
}
