//! Template rendering and mail transport.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Variables substituted into a template, keyed by placeholder name.
pub type TemplateVars = BTreeMap<String, String>;

/// Errors produced while rendering or sending a notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The template is unknown or could not be rendered
    #[error("Render failed for template '{template}': {reason}")]
    Render {
        /// Template identifier
        template: String,
        /// What went wrong
        reason: String,
    },

    /// The mail server rejected or never received the message
    #[error("Mail transport error: {0}")]
    Transport(String),
}

/// Renders a named template into a message body.
pub trait Renderer: Send + Sync {
    /// Render `template_id` with `vars`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Render`] if the template does not exist.
    fn render(&self, template_id: &str, vars: &TemplateVars) -> Result<String, NotificationError>;
}

/// Sends a rendered message.
pub trait MailTransport: Send + Sync {
    /// Send `body` to every address in `to`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Transport`] if delivery fails.
    fn send(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>>;
}
