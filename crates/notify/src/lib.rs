//! Order-summary notification: formats the confirmed order and dispatches
//! it to the customer and the store owner over an SMS transport.
//!
//! Dispatch is fire-and-forget. The dialogue engine's terminal turn must
//! answer the caller immediately, so sends are spawned onto the runtime
//! and failures are logged with the call id rather than surfaced.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, info, warn};

use storeline_core::config::SmsConfig;
use storeline_core::dialogue::prompts::order_summary;
use storeline_core::{CallSession, OrderDispatch};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("message request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("message request timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("message service answered with status {status}")]
    Rejected { status: u16 },
}

#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}

/// Twilio-style messages endpoint: form-encoded POST with basic auth.
pub struct HttpSmsTransport {
    http: reqwest::Client,
    api_base_url: String,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    timeout: Duration,
}

impl HttpSmsTransport {
    pub fn new(config: &SmsConfig) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone().unwrap_or_else(|| String::new().into()),
            from_number: config.from_number.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl MessageTransport for HttpSmsTransport {
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base_url, self.account_sid
        );
        let form = [("To", to), ("From", self.from_number.as_str()), ("Body", body)];

        let request = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&form);

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| NotifyError::Timeout { secs: self.timeout.as_secs() })??;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected { status: status.as_u16() });
        }
        Ok(())
    }
}

/// Transport used when SMS is disabled; logs instead of sending.
pub struct NoopTransport;

#[async_trait]
impl MessageTransport for NoopTransport {
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        debug!(
            event_name = "notify.noop_send",
            to = %to,
            body_len = body.len(),
            "sms transport disabled; message not sent"
        );
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Recipients {
    pub customer_number: String,
    pub owner_number: String,
}

pub struct OrderNotifier {
    transport: Arc<dyn MessageTransport>,
    recipients: Recipients,
}

impl OrderNotifier {
    pub fn new(transport: Arc<dyn MessageTransport>, recipients: Recipients) -> Self {
        Self { transport, recipients }
    }

    /// Plain-text summary sent to both recipient roles.
    pub fn format_summary(session: &CallSession) -> String {
        let customer = session.customer_name.as_deref().unwrap_or("Customer");
        format!(
            "Order confirmation\nCustomer: {customer}\nItems: {}",
            order_summary(&session.order_lines)
        )
    }

    /// Sends the summary to both recipients, awaiting the outcome. Used by
    /// the spawned dispatch path and directly in tests.
    pub async fn send_all(&self, session: &CallSession, correlation_id: &str) {
        let body = Self::format_summary(session);
        let targets = [
            ("customer", self.recipients.customer_number.as_str()),
            ("owner", self.recipients.owner_number.as_str()),
        ];

        for (role, to) in targets {
            match self.transport.send(to, &body).await {
                Ok(()) => info!(
                    event_name = "notify.sent",
                    call_id = %session.call_id,
                    correlation_id = %correlation_id,
                    role,
                    "order summary dispatched"
                ),
                Err(error) => warn!(
                    event_name = "notify.send_failed",
                    call_id = %session.call_id,
                    correlation_id = %correlation_id,
                    role,
                    error = %error,
                    "order summary dispatch failed"
                ),
            }
        }
    }
}

impl OrderDispatch for OrderNotifier {
    fn dispatch(&self, session: &CallSession, correlation_id: &str) {
        let sender = Self::new(Arc::clone(&self.transport), self.recipients.clone());
        let session = session.clone();
        let correlation_id = correlation_id.to_string();
        tokio::spawn(async move {
            sender.send_all(&session, &correlation_id).await;
        });
    }
}
