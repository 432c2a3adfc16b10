//! SMTP delivery for rendered emails.
//!
//! Wraps lettre's `AsyncSmtpTransport`, building a multipart/alternative
//! message when both HTML and plain bodies are present and a single part
//! message otherwise. Attachments switch the message to multipart/mixed.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{MailError, Mailer, OutgoingEmail};
use crate::config::SmtpConfig;

/// Mailer backed by an SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from the SMTP section of the config file.
    ///
    /// Fails when `host` or `from_address` is missing; callers should check
    /// `SmtpConfig::is_configured` first and fall back to [`LogMailer`].
    pub fn from_config(config: &SmtpConfig) -> anyhow::Result<Self> {
        let host = config
            .host
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("SMTP host not configured"))?;
        let from_address = config
            .from_address
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("From address not configured"))?;

        let from: Mailbox = format!("{} <{}>", config.from_name, from_address).parse()?;

        let mailer = if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        }
        .port(config.port);

        let mailer = if let (Some(username), Some(password)) = (&config.username, &config.password)
        {
            mailer.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer
        };

        Ok(Self {
            transport: mailer.build(),
            from,
        })
    }

    /// Assemble the lettre message for one recipient
    async fn build_message(&self, to: Mailbox, email: &OutgoingEmail) -> Result<Message, MailError> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone());

        let content = match (&email.html_body, &email.text_body) {
            (Some(html), Some(text)) => BodyContent::Alternative(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.clone()),
                    ),
            ),
            (Some(html), None) => BodyContent::Single(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(html.clone()),
            ),
            (None, Some(text)) => BodyContent::Single(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(text.clone()),
            ),
            (None, None) => {
                return Err(MailError::Message("email has no body".to_string()));
            }
        };

        if email.attachments.is_empty() {
            return match content {
                BodyContent::Single(part) => builder.singlepart(part),
                BodyContent::Alternative(parts) => builder.multipart(parts),
            }
            .map_err(|e| MailError::Message(e.to_string()));
        }

        // Attachments wrap the body in multipart/mixed
        let mut mixed = match content {
            BodyContent::Single(part) => MultiPart::mixed().singlepart(part),
            BodyContent::Alternative(parts) => MultiPart::mixed().multipart(parts),
        };
        for path in &email.attachments {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| MailError::Attachment(format!("{}: {}", path.display(), e)))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "attachment".to_string());
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            let content_type = ContentType::parse(mime.as_ref())
                .map_err(|e| MailError::Attachment(format!("{}: {}", path.display(), e)))?;
            mixed = mixed.singlepart(Attachment::new(filename).body(bytes, content_type));
        }

        builder
            .multipart(mixed)
            .map_err(|e| MailError::Message(e.to_string()))
    }
}

/// Message body before attachment handling
enum BodyContent {
    Single(SinglePart),
    Alternative(MultiPart),
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        for to_address in &email.to {
            let to: Mailbox = match to_address.parse() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(
                        address = %to_address,
                        error = %e,
                        "Invalid email address, skipping"
                    );
                    continue;
                }
            };

            let message = self.build_message(to, email).await?;

            self.transport
                .send(message)
                .await
                .map_err(|e| MailError::Transport(e.to_string()))?;

            tracing::debug!(to = %to_address, subject = %email.subject, "Email delivered");
        }

        Ok(())
    }
}

/// Mailer used when SMTP is not configured: logs the email and drops it,
/// so the service still runs in development setups without a relay.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = ?email.to,
            subject = %email.subject,
            "SMTP not configured, dropping email"
        );
        Ok(())
    }
}
