use crate::{Email, Mailer};
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Development backend: logs the message instead of delivering it.
#[derive(Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        info!(
            "Mail (console): subject={:?} to={:?} from={}",
            email.subject, email.to, email.from
        );
        info!("Mail body: {}", email.text_body);
        Ok(())
    }
}
