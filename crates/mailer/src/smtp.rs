use crate::{Email, Mailer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .with_context(|| format!("Invalid SMTP relay: {}", config.host))?
            .port(config.port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        let message = build_message(email)?;
        self.transport
            .send(message)
            .await
            .with_context(|| format!("SMTP send failed: {}", email.subject))?;
        info!("Mail sent: {} -> {:?}", email.subject, email.to);
        Ok(())
    }
}

pub(crate) fn build_message(email: &Email) -> Result<Message> {
    let from: Mailbox = email
        .from
        .parse()
        .with_context(|| format!("Invalid from address: {}", email.from))?;

    let mut builder = Message::builder().from(from).subject(email.subject.clone());

    if let Some(ref reply_to) = email.reply_to {
        let mailbox: Mailbox = reply_to
            .parse()
            .with_context(|| format!("Invalid reply-to address: {reply_to}"))?;
        builder = builder.reply_to(mailbox);
    }

    for to in &email.to {
        let mailbox: Mailbox = to
            .parse()
            .with_context(|| format!("Invalid recipient address: {to}"))?;
        builder = builder.to(mailbox);
    }

    let message = match &email.html_body {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            email.text_body.clone(),
            html.clone(),
        ))?,
        None => builder.body(email.text_body.clone())?,
    };

    Ok(message)
}
