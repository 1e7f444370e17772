use async_trait::async_trait;
use std::sync::Arc;

use crate::entities::VerificationChannel;
use crate::error::AppResult;

/// Outbound message to an email address or a phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel: VerificationChannel,
    pub destination: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn verification_code(
        channel: VerificationChannel,
        destination: &str,
        code: &str,
        expires_in_secs: i64,
    ) -> Self {
        let subject = match channel {
            VerificationChannel::Email => "Email Verification Code",
            VerificationChannel::Mobile => "Mobile Verification Code",
        };
        Self {
            channel,
            destination: destination.to_string(),
            subject: subject.to_string(),
            body: format!(
                "Your verification code is: {code}\nThis code will expire in {} minutes.",
                (expires_in_secs / 60).max(1)
            ),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> AppResult<()>;
}

/// Development substitute for real delivery: writes the message to the log.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        log::info!(
            "[{}] to {}: {} | {}",
            notification.channel,
            notification.destination,
            notification.subject,
            notification.body.replace('\n', " ")
        );
        Ok(())
    }
}

/// Routes each notification to the transport configured for its channel.
#[derive(Clone)]
pub struct ChannelNotifier {
    email: Arc<dyn Notifier>,
    sms: Arc<dyn Notifier>,
}

impl ChannelNotifier {
    pub fn new(email: Arc<dyn Notifier>, sms: Arc<dyn Notifier>) -> Self {
        Self { email, sms }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        match notification.channel {
            VerificationChannel::Email => self.email.send(notification).await,
            VerificationChannel::Mobile => self.sms.send(notification).await,
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Captures every notification; optionally fails after capturing.
    #[derive(Clone, Default)]
    pub struct RecordingNotifier {
        sent: Arc<Mutex<Vec<Notification>>>,
        fail: bool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                sent: Arc::default(),
                fail: true,
            }
        }

        pub fn sent(&self) -> Vec<Notification> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, notification: &Notification) -> AppResult<()> {
            self.sent.lock().unwrap().push(notification.clone());
            if self.fail {
                return Err(crate::error::AppError::ExternalApiError(
                    "delivery refused".to_string(),
                ));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingNotifier;
    use super::*;

    #[test]
    fn test_verification_message_text() {
        let n = Notification::verification_code(VerificationChannel::Email, "a@x.com", "012345", 300);
        assert_eq!(n.subject, "Email Verification Code");
        assert_eq!(
            n.body,
            "Your verification code is: 012345\nThis code will expire in 5 minutes."
        );
    }

    #[tokio::test]
    async fn test_channel_notifier_routes_by_channel() {
        let email = RecordingNotifier::default();
        let sms = RecordingNotifier::default();
        let router = ChannelNotifier::new(Arc::new(email.clone()), Arc::new(sms.clone()));

        router
            .send(&Notification::verification_code(VerificationChannel::Mobile, "+15550001111", "1", 60))
            .await
            .unwrap();

        assert!(email.sent().is_empty());
        assert_eq!(sms.sent().len(), 1);
        assert_eq!(sms.sent()[0].destination, "+15550001111");
    }
}
