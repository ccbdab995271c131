use axum::{
    extract::{Path, State},
    http::StatusCode,
    Form, Json,
};
use domain::UnsubscribeForm;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::workflow::{UnsubscribeOutcome, WorkflowError, NOT_SUBSCRIBED_MESSAGE};

#[derive(Deserialize)]
pub struct UnsubscribePayload {
    #[serde(default)]
    pub email: String,
}

/// The three rendered states of the unsubscribe flow: the form as-is, the
/// form with an error message, or the success confirmation.
#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnsubscribeResponse {
    Form { error: Option<String> },
    Success,
}

pub async fn from_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Form(payload): Form<UnsubscribePayload>,
) -> Result<Json<UnsubscribeResponse>, (StatusCode, String)> {
    let Ok(comment_id) = comment_id.parse::<i64>() else {
        return Err(not_found());
    };
    let form = UnsubscribeForm {
        email: payload.email,
    };
    match state
        .workflow
        .unsubscribe_from_comment(comment_id, form.cleaned_email())
        .await
    {
        Ok(outcome) => Ok(respond(outcome)),
        Err(WorkflowError::CommentNotFound(_)) => Err(not_found()),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

pub async fn from_all_posts(
    State(state): State<AppState>,
    Form(payload): Form<UnsubscribePayload>,
) -> Result<Json<UnsubscribeResponse>, (StatusCode, String)> {
    let form = UnsubscribeForm {
        email: payload.email,
    };
    state
        .workflow
        .unsubscribe_from_all(form.cleaned_email())
        .await
        .map(respond)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

fn respond(outcome: UnsubscribeOutcome) -> Json<UnsubscribeResponse> {
    match outcome {
        UnsubscribeOutcome::Removed => Json(UnsubscribeResponse::Success),
        UnsubscribeOutcome::NotSubscribed => Json(UnsubscribeResponse::Form {
            error: Some(NOT_SUBSCRIBED_MESSAGE.to_string()),
        }),
        UnsubscribeOutcome::Unchanged => Json(UnsubscribeResponse::Form { error: None }),
    }
}

fn not_found() -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        "No comment matches the given query.".to_string(),
    )
}
