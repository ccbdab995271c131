mod config;
mod http;
mod state;
mod workflow;

use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;

use config::{MailSettings, Settings};
use http::router::build_router;
use mailer::{ConsoleMailer, Mailer, SmtpConfig, SmtpMailer};
use state::AppState;
use storage::Db;
use workflow::{CommentWorkflow, NotifyConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::new().context("Failed to load configuration")?;

    let db = Db::new(&settings.database.url).await?;

    let mailer: Arc<dyn Mailer> = match &settings.mail {
        MailSettings::Console => {
            info!("Mail backend: console (log only)");
            Arc::new(ConsoleMailer)
        }
        MailSettings::Smtp {
            host,
            port,
            username,
            password,
        } => {
            info!("Mail backend: smtp via {}:{}", host, port);
            Arc::new(SmtpMailer::new(&SmtpConfig {
                host: host.clone(),
                port: *port,
                username: username.clone(),
                password: password.clone(),
            })?)
        }
    };

    let notify = NotifyConfig {
        operator_email: settings.notify.operator_email.clone(),
        public_host: settings.notify.public_host.clone(),
    };

    let workflow = CommentWorkflow::new(db.clone(), mailer.clone(), notify.clone());

    let state = AppState {
        db,
        workflow,
        mailer,
        notify,
    };

    let app = build_router(state, &settings.server.cors_origins);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
