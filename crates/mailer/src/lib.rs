mod console;
mod memory;
mod smtp;

pub use console::ConsoleMailer;
pub use memory::MemoryMailer;
pub use smtp::{SmtpConfig, SmtpMailer};

use anyhow::Result;
use async_trait::async_trait;

/// One outbound notification. `html_body`, when present, is attached as an
/// alternative to the plain-text body.
#[derive(Debug, Clone)]
pub struct Email {
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
    pub from: String,
    pub reply_to: Option<String>,
    pub to: Vec<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<()>;
}
