//! Recording renderer, mail transport and dead-letter sink.

use hotel_booking_core::dead_letter::{DeadLetter, DeadLetterSink};
use hotel_booking_core::notification::{
    MailTransport, NotificationError, Renderer, TemplateVars,
};
use hotel_booking_core::repository::RepositoryError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Renderer that records its inputs and renders `template|Key=Value|...`.
#[derive(Clone, Debug, Default)]
pub struct RecordingRenderer {
    rendered: Arc<Mutex<Vec<(String, TemplateVars)>>>,
    failure: Arc<Mutex<Option<NotificationError>>>,
}

impl RecordingRenderer {
    /// Create a renderer that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every render with `error`, or stop failing with `None`.
    pub fn fail_with(&self, error: Option<NotificationError>) {
        *self.failure.lock().unwrap() = error;
    }

    /// Every `(template, vars)` pair rendered so far.
    #[must_use]
    pub fn rendered(&self) -> Vec<(String, TemplateVars)> {
        self.rendered.lock().unwrap().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, template_id: &str, vars: &TemplateVars) -> Result<String, NotificationError> {
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.rendered
            .lock()
            .unwrap()
            .push((template_id.to_string(), vars.clone()));

        let mut body = template_id.to_string();
        for (key, value) in vars {
            body.push('|');
            body.push_str(key);
            body.push('=');
            body.push_str(value);
        }
        Ok(body)
    }
}

/// A message handed to [`RecordingTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMail {
    /// Recipients
    pub to: Vec<String>,
    /// Subject line
    pub subject: String,
    /// Rendered body
    pub body: String,
}

#[derive(Debug, Default)]
struct TransportState {
    sent: Vec<SentMail>,
    attempts: usize,
    failures_left: usize,
    always_fail: bool,
    delay: Option<Duration>,
}

/// Transport that records sent mail, with failure and latency injection.
#[derive(Clone, Debug, Default)]
pub struct RecordingTransport {
    state: Arc<Mutex<TransportState>>,
    activity: Arc<Notify>,
}

impl RecordingTransport {
    /// Create a transport that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` sends.
    pub fn fail_next(&self, count: usize) {
        self.state.lock().unwrap().failures_left = count;
    }

    /// Fail every send.
    pub fn fail_always(&self, fail: bool) {
        self.state.lock().unwrap().always_fail = fail;
    }

    /// Take `delay` to send each message.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().unwrap().delay = delay;
    }

    /// Messages sent successfully.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMail> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Send attempts, successful or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    /// Wait until at least `count` send attempts were made. Returns `false` on timeout.
    pub async fn wait_for_attempts(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let activity = self.activity.notified();
            tokio::pin!(activity);
            activity.as_mut().enable();

            if self.attempts() >= count {
                return true;
            }
            if tokio::time::timeout_at(deadline, activity).await.is_err() {
                return self.attempts() >= count;
            }
        }
    }
}

impl MailTransport for RecordingTransport {
    fn send(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>> {
        let mail = SentMail {
            to: to.to_vec(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        Box::pin(async move {
            let delay = self.state.lock().unwrap().delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let result = {
                let mut state = self.state.lock().unwrap();
                state.attempts += 1;
                if state.always_fail {
                    Err(NotificationError::Transport("connection refused".into()))
                } else if state.failures_left > 0 {
                    state.failures_left -= 1;
                    Err(NotificationError::Transport("temporary failure".into()))
                } else {
                    state.sent.push(mail);
                    Ok(())
                }
            };
            self.activity.notify_waiters();
            result
        })
    }
}

/// Dead-letter sink that keeps letters in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordingDeadLetters {
    letters: Arc<Mutex<Vec<DeadLetter>>>,
}

impl RecordingDeadLetters {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Letters recorded so far.
    #[must_use]
    pub fn letters(&self) -> Vec<DeadLetter> {
        self.letters.lock().unwrap().clone()
    }
}

impl DeadLetterSink for RecordingDeadLetters {
    fn record(
        &self,
        letter: DeadLetter,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>> {
        Box::pin(async move {
            self.letters.lock().unwrap().push(letter);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transport_fails_then_recovers() {
        let transport = RecordingTransport::new();
        transport.fail_next(1);
        let to = vec!["ada@example.com".to_string()];

        assert!(transport.send(&to, "subject", "body").await.is_err());
        assert!(transport.send(&to, "subject", "body").await.is_ok());
        assert_eq!(transport.attempts(), 2);
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn renderer_output_lists_vars_in_key_order() {
        let renderer = RecordingRenderer::new();
        let vars = TemplateVars::from([
            ("UserName".to_string(), "Ada".to_string()),
            ("Amount".to_string(), "300.00".to_string()),
        ]);

        let body = renderer.render("booking_confirmation", &vars).unwrap();
        assert_eq!(body, "booking_confirmation|Amount=300.00|UserName=Ada");
    }
}
