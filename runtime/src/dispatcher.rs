//! Turns a booking event into a sent confirmation.

use hotel_booking_core::event::BookingCreatedEvent;
use hotel_booking_core::notification::{MailTransport, NotificationError, Renderer, TemplateVars};
use std::sync::Arc;

/// Template used for booking confirmations.
pub const DEFAULT_TEMPLATE: &str = "booking_confirmation";

/// Subject line used for booking confirmations.
pub const DEFAULT_SUBJECT: &str = "Your booking is confirmed";

/// Renders the confirmation template for an event and sends it to the booker.
#[derive(Clone)]
pub struct NotificationDispatcher {
    renderer: Arc<dyn Renderer>,
    transport: Arc<dyn MailTransport>,
    template_id: String,
    subject: String,
}

impl NotificationDispatcher {
    /// Create a dispatcher with the default template and subject.
    #[must_use]
    pub fn new(renderer: Arc<dyn Renderer>, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            renderer,
            transport,
            template_id: DEFAULT_TEMPLATE.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
        }
    }

    /// Use a different template.
    #[must_use]
    pub fn with_template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = template_id.into();
        self
    }

    /// Use a different subject line.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Template variables for `event`.
    ///
    /// `Amount` is always formatted with two decimal places.
    #[must_use]
    pub fn template_vars(event: &BookingCreatedEvent) -> TemplateVars {
        TemplateVars::from([
            ("UserName".to_string(), event.user_name.clone()),
            ("BookingID".to_string(), event.booking_id.to_string()),
            ("UserEmail".to_string(), event.user_email.clone()),
            ("Amount".to_string(), format!("{:.2}", event.amount)),
        ])
    }

    /// Render and send the confirmation for `event`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Render`] if the template cannot be
    /// rendered, or [`NotificationError::Transport`] if sending fails.
    pub async fn dispatch(&self, event: &BookingCreatedEvent) -> Result<(), NotificationError> {
        let vars = Self::template_vars(event);
        let body = self.renderer.render(&self.template_id, &vars)?;
        self.transport
            .send(std::slice::from_ref(&event.user_email), &self.subject, &body)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use hotel_booking_core::BookingId;
    use hotel_booking_core::NaiveDate;

    fn event(amount: f64) -> BookingCreatedEvent {
        BookingCreatedEvent {
            booking_id: BookingId::new(9),
            user_email: "ada@example.com".into(),
            user_name: "Ada".into(),
            amount,
            check_in: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
        }
    }

    #[test]
    fn amount_has_two_decimals() {
        let vars = NotificationDispatcher::template_vars(&event(300.0));
        assert_eq!(vars["Amount"], "300.00");

        let vars = NotificationDispatcher::template_vars(&event(99.999));
        assert_eq!(vars["Amount"], "100.00");
    }

    #[test]
    fn vars_cover_the_fixed_set() {
        let vars = NotificationDispatcher::template_vars(&event(12.5));
        let keys: Vec<&str> = vars.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Amount", "BookingID", "UserEmail", "UserName"]);
        assert_eq!(vars["BookingID"], "9");
    }
}
