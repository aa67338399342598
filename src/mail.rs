use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::MailConfig;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, link: &str) -> anyhow::Result<()>;
}

pub fn reset_email_html(link: &str) -> String {
    format!(
        "<p>Click this link to reset your password:</p>\n<a href=\"{link}\">{link}</a>"
    )
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(cfg: &MailConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
            .with_context(|| format!("smtp relay {}", cfg.smtp_host))?
            .port(cfg.smtp_port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .timeout(Some(SEND_TIMEOUT))
            .build();
        Ok(Self {
            transport,
            from: cfg.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_password_reset(&self, to: &str, link: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.parse().context("parse from address")?)
            .to(to.parse().context("parse recipient address")?)
            .subject("Password Reset")
            .header(ContentType::TEXT_HTML)
            .body(reset_email_html(link))
            .context("build reset email")?;

        tokio::time::timeout(SEND_TIMEOUT, self.transport.send(email))
            .await
            .context("smtp send timed out")?
            .context("smtp send")?;
        info!(to = %to, "password reset email sent");
        Ok(())
    }
}
