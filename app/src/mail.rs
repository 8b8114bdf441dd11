//! SMTP mail transport using Lettre.
//!
//! With credentials configured the relay is reached over STARTTLS; without
//! them the connection is plaintext and unauthenticated, which suits local
//! catch-all servers such as `MailHog`.

use crate::config::SmtpConfig;
use hotel_booking_core::notification::{MailTransport, NotificationError};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::future::Future;
use std::pin::Pin;

/// HTML mail sent through an SMTP relay.
#[derive(Clone)]
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailTransport {
    /// Build a transport from configuration. No connection is opened yet.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Transport`] if the sender address is
    /// invalid or the relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, NotificationError> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::Transport(format!("Invalid from address: {e}")))?;

        let builder = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| NotificationError::Transport(format!("SMTP relay error: {e}")))?
                    .credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };

        let mailer = builder
            .port(config.port)
            .timeout(Some(config.timeout))
            .build();

        tracing::info!(host = %config.host, port = config.port, "SMTP transport configured");
        Ok(Self { mailer, from })
    }

    /// Build the message without sending it.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Transport`] if there are no recipients or
    /// an address does not parse.
    pub fn message(&self, to: &[String], subject: &str, body: &str) -> Result<Message, NotificationError> {
        if to.is_empty() {
            return Err(NotificationError::Transport("No recipients".to_string()));
        }

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML);
        for address in to {
            let mailbox = address.trim().parse::<Mailbox>().map_err(|e| {
                NotificationError::Transport(format!("Invalid to address '{address}': {e}"))
            })?;
            builder = builder.to(mailbox);
        }

        builder
            .body(body.to_string())
            .map_err(|e| NotificationError::Transport(format!("Failed to build email: {e}")))
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>> {
        let message = self.message(to, subject, body);
        let recipients = to.len();

        Box::pin(async move {
            self.mailer
                .send(message?)
                .await
                .map_err(|e| NotificationError::Transport(format!("Failed to send email: {e}")))?;
            tracing::debug!(recipients, "Email sent");
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            username: None,
            password: None,
            from_email: "bookings@example.com".to_string(),
            from_name: "Hotel Booking".to_string(),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn builds_html_message() {
        let transport = SmtpMailTransport::new(&config()).unwrap();
        let message = transport
            .message(
                &["ada@example.com".to_string()],
                "Your booking is confirmed",
                "<p>Hello</p>",
            )
            .unwrap();

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Hotel Booking"));
        assert!(formatted.contains("<bookings@example.com>"));
        assert!(formatted.contains("To: ada@example.com"));
        assert!(formatted.contains("Subject: Your booking is confirmed"));
        assert!(formatted.contains("Content-Type: text/html"));
        assert!(formatted.contains("<p>Hello</p>"));
    }

    #[test]
    fn accepts_authenticated_relay() {
        let mut config = config();
        config.username = Some("mailer".to_string());
        config.password = Some("secret".to_string());
        assert!(SmtpMailTransport::new(&config).is_ok());
    }

    #[test]
    fn rejects_bad_addresses() {
        let transport = SmtpMailTransport::new(&config()).unwrap();

        let err = transport.message(&["not an address".to_string()], "s", "b").unwrap_err();
        assert!(matches!(err, NotificationError::Transport(_)));

        let err = transport.message(&[], "s", "b").unwrap_err();
        assert_eq!(err, NotificationError::Transport("No recipients".to_string()));

        let mut config = config();
        config.from_email = "nobody".to_string();
        assert!(SmtpMailTransport::new(&config).is_err());
    }

    #[tokio::test]
    async fn unreachable_relay_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = config();
        config.host = "127.0.0.1".to_string();
        config.port = port;
        let transport = SmtpMailTransport::new(&config).unwrap();

        let result = transport
            .send(&["ada@example.com".to_string()], "s", "<p>b</p>")
            .await;
        assert!(matches!(result, Err(NotificationError::Transport(_))));
    }
}
