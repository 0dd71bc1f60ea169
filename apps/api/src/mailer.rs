use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

use crate::config::Config;

/// Outbound SMTP mail. Delivery is fire-and-forget: `send` spawns a task
/// after the triggering transaction has committed and never reports back
/// into persisted state.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.mail_host)
            .context("invalid MAIL_HOST")?
            .port(config.mail_port)
            .credentials(Credentials::new(
                config.mail_sender.clone(),
                config.mail_password.clone(),
            ))
            .build();

        Ok(Mailer {
            transport,
            sender: config.mail_sender.clone(),
        })
    }

    /// Queues an HTML email. Errors are logged, never surfaced to the caller.
    pub fn send(&self, to: &str, subject: &str, body: String) {
        let message = Message::builder()
            .from(match self.sender.parse() {
                Ok(mbox) => mbox,
                Err(e) => {
                    error!("Invalid sender address '{}': {e}", self.sender);
                    return;
                }
            })
            .to(match to.parse() {
                Ok(mbox) => mbox,
                Err(e) => {
                    error!("Invalid recipient address '{to}': {e}");
                    return;
                }
            })
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body);

        let message = match message {
            Ok(m) => m,
            Err(e) => {
                error!("Failed to build email: {e}");
                return;
            }
        };

        let transport = self.transport.clone();
        let to = to.to_string();
        tokio::spawn(async move {
            match transport.send(message).await {
                Ok(_) => info!("Sent email to {to}"),
                Err(e) => error!("Failed to send email to {to}: {e}"),
            }
        });
    }
}
