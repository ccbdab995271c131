use axum::{extract::State, http::StatusCode, Form, Json};
use domain::ContactForm;
use mailer::Email;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::AppState;

#[derive(Deserialize)]
pub struct ContactPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ContactResponse {
    Thanks { name: String },
    Form,
}

/// Contact form on the site root: one mail to the operator, reply-to set to
/// the submitter. Invalid submissions fall back to the blank form.
pub async fn submit(
    State(state): State<AppState>,
    Form(payload): Form<ContactPayload>,
) -> Result<Json<ContactResponse>, (StatusCode, String)> {
    let form = ContactForm {
        name: payload.name,
        email: payload.email,
        message: payload.message,
    };
    if form.validate().is_err() {
        info!("Dropping invalid contact submission");
        return Ok(Json(ContactResponse::Form));
    }

    let sender = form.email.trim().to_string();
    let mail = Email {
        subject: "Hello".to_string(),
        text_body: form.message.trim().to_string(),
        html_body: None,
        from: sender.clone(),
        reply_to: Some(sender),
        to: vec![state.notify.operator_email.clone()],
    };
    state
        .mailer
        .send(&mail)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ContactResponse::Thanks {
        name: form.name.trim().to_string(),
    }))
}
