//! SMTP transport - lettre-backed implementation of the send contract

use super::{MessageTransport, SendOutcome, SendRequest};
use async_trait::async_trait;
use chrono::Utc;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use preheat_common::config::SmtpConfig;
use std::time::Duration as StdDuration;
use tracing::debug;
use uuid::Uuid;

/// SMTP transport for warmup sends
pub struct SmtpTransport {
    config: SmtpConfig,
}

impl SmtpTransport {
    /// Create a new SMTP transport
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn mailbox(address: &str, name: &Option<String>) -> Result<Mailbox, String> {
        let formatted = match name {
            Some(n) => format!("{} <{}>", n, address),
            None => address.to_string(),
        };
        formatted
            .parse()
            .map_err(|e| format!("Invalid address {}: {}", address, e))
    }

    fn build_mailer(
        &self,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, String> {
        let builder = if self.config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
                .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
        } else if self.config.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
                .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.host)
        };

        let mut builder = builder.port(self.config.port);

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.timeout(Some(StdDuration::from_secs(30))).build())
    }
}

#[async_trait]
impl MessageTransport for SmtpTransport {
    async fn send(&self, request: &SendRequest) -> SendOutcome {
        let from = match Self::mailbox(&request.from, &request.from_name) {
            Ok(m) => m,
            Err(e) => return SendOutcome::failed(e),
        };

        let to = match Self::mailbox(&request.to, &request.to_name) {
            Ok(m) => m,
            Err(e) => return SendOutcome::failed(e),
        };

        let tracking_id = format!("<{}.{}@preheat>", Uuid::new_v4(), Utc::now().timestamp());

        let email = match Message::builder()
            .from(from)
            .to(to)
            .subject(&request.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(request.content.clone())
        {
            Ok(e) => e,
            Err(e) => return SendOutcome::failed(format!("Failed to build email: {}", e)),
        };

        let mailer = match self.build_mailer() {
            Ok(m) => m,
            Err(e) => return SendOutcome::failed(e),
        };

        match mailer.send(email).await {
            Ok(response) => {
                debug!(to = %request.to, "Warmup email accepted: {:?}", response);
                SendOutcome::sent(tracking_id)
            }
            Err(e) => SendOutcome::failed(e.to_string()),
        }
    }
}
