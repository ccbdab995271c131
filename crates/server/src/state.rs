use axum::extract::FromRef;
use mailer::Mailer;
use std::sync::Arc;
use storage::Db;

use crate::workflow::{CommentWorkflow, NotifyConfig};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub workflow: CommentWorkflow,
    pub mailer: Arc<dyn Mailer>,
    pub notify: NotifyConfig,
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
