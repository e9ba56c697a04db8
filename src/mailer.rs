use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::sync::Arc;
use std::sync::Mutex;

use crate::config::MailConfig;
use crate::errors::ApiError;

// 1. Mailer Contract
/// Mailer
///
/// Defines the abstract contract for the mail collaborator. This trait allows us
/// to swap the concrete implementation—from the real SMTPS client (SmtpMailer) in
/// production to the in-memory Mock (MockMailer) during testing—without affecting
/// the calling handlers.
///
/// Delivery failures are non-fatal by design: callers log the `Delivery` error and
/// surface it as a warning, they never roll back the operation that triggered the
/// send.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Dispatches the post-registration confirmation email.
    async fn send_confirmation(&self, to_email: &str, first_name: &str) -> Result<(), ApiError>;

    /// Dispatches a password-recovery email carrying the one-time reset token.
    /// The token appears only here; the store keeps just its hash.
    async fn send_password_reset(
        &self,
        to_email: &str,
        first_name: &str,
        token: &str,
    ) -> Result<(), ApiError>;
}

/// MailerState
///
/// The concrete type used to share the mail service access across the application state.
pub type MailerState = Arc<dyn Mailer>;

// 2. The Real Implementation (SMTPS)
/// SmtpMailer
///
/// The concrete implementation using lettre's async SMTP transport over implicit
/// TLS (SMTPS, port 465 by default), matching the upstream mail provider's
/// endpoint.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl SmtpMailer {
    /// new
    ///
    /// Constructs the SMTPS transport from the mail section of AppConfig.
    pub fn new(config: &MailConfig) -> Result<Self, ApiError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| ApiError::Delivery(format!("create SMTP transport: {e}")))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            sender: config.sender.clone(),
        })
    }

    /// send
    ///
    /// Shared message assembly and dispatch. Any failure collapses into a
    /// `Delivery` error for the caller to log.
    async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        body: String,
    ) -> Result<(), ApiError> {
        let from = self
            .sender
            .parse::<Mailbox>()
            .map_err(|e| ApiError::Delivery(format!("parse sender address: {e}")))?;

        let to = format!("{to_name} <{to_email}>")
            .parse::<Mailbox>()
            .map_err(|e| ApiError::Delivery(format!("parse recipient address: {e}")))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| ApiError::Delivery(format!("build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ApiError::Delivery(format!("send email: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_confirmation(&self, to_email: &str, first_name: &str) -> Result<(), ApiError> {
        let body = format!(
            "Hello {first_name},\n\n\
             Your account has been created. You can now log in with your email address.\n\n\
             If you did not register this account, please contact support."
        );
        self.send(to_email, first_name, "Welcome - account created", body)
            .await
    }

    async fn send_password_reset(
        &self,
        to_email: &str,
        first_name: &str,
        token: &str,
    ) -> Result<(), ApiError> {
        let body = format!(
            "Hello {first_name},\n\n\
             We received a request to reset your password. If you didn't make this\n\
             request, you can safely ignore this email.\n\n\
             Your reset token is:\n\n    {token}\n\n\
             Submit it together with your new password within 30 minutes."
        );
        self.send(to_email, first_name, "Password Reset Request", body)
            .await
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockMailer
///
/// A mock implementation of `Mailer` used exclusively for unit and integration
/// testing. Sent messages are recorded in memory so tests can assert on dispatch
/// without a network connection, and failure injection exercises the non-fatal
/// delivery-error path.
#[derive(Default)]
pub struct MockMailer {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    /// Every (recipient, subject-kind, token) dispatched through the mock.
    pub sent: Mutex<Vec<SentMail>>,
}

/// SentMail
///
/// Record of a single message captured by the mock.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to_email: String,
    pub kind: MailKind,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MailKind {
    Confirmation,
    PasswordReset,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// last_reset_token
    ///
    /// Convenience accessor for recovery-flow tests: the token from the most
    /// recently captured reset email.
    pub fn last_reset_token(&self) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.kind == MailKind::PasswordReset)
            .and_then(|m| m.token.clone())
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_confirmation(&self, to_email: &str, _first_name: &str) -> Result<(), ApiError> {
        if self.should_fail {
            return Err(ApiError::Delivery("mock failure requested".to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to_email: to_email.to_string(),
            kind: MailKind::Confirmation,
            token: None,
        });
        Ok(())
    }

    async fn send_password_reset(
        &self,
        to_email: &str,
        _first_name: &str,
        token: &str,
    ) -> Result<(), ApiError> {
        if self.should_fail {
            return Err(ApiError::Delivery("mock failure requested".to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to_email: to_email.to_string(),
            kind: MailKind::PasswordReset,
            token: Some(token.to_string()),
        });
        Ok(())
    }
}
