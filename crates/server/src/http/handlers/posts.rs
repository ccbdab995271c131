use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Form, Json,
};
use domain::{classify_parent, Category, Comment, CommentForm, ParentRef, Post};
use serde::{Deserialize, Serialize};
use storage::Db;
use tracing::{info, warn};

use crate::state::AppState;
use crate::workflow::WorkflowError;

const PER_PAGE: i64 = 5;

// --- DTOs ---

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Serialize)]
pub struct PostIndexResponse {
    pub posts: Vec<Post>,
    pub page: i64,
    pub pages: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    pub post: Post,
    pub categories: Vec<Category>,
    pub comments: Vec<CommentThread>,
    pub comments_count: i64,
    /// A reply form only exists once the post has at least one comment.
    pub reply_form: bool,
}

#[derive(Deserialize)]
pub struct CommentPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub comment: String,
    pub parent_comment_id: Option<String>,
}

// --- Handlers ---

pub async fn index(
    State(db): State<Db>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PostIndexResponse>, (StatusCode, String)> {
    let page = resolve_page(&query);
    let (posts, total) = db
        .list_posts(PER_PAGE, (page - 1) * PER_PAGE)
        .await
        .map_err(internal)?;
    Ok(Json(PostIndexResponse {
        posts,
        page,
        pages: page_count(total),
        total,
    }))
}

pub async fn category_index(
    State(db): State<Db>,
    Path(category): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PostIndexResponse>, (StatusCode, String)> {
    let page = resolve_page(&query);
    let (posts, total) = db
        .list_posts_by_category(&category, PER_PAGE, (page - 1) * PER_PAGE)
        .await
        .map_err(internal)?;
    Ok(Json(PostIndexResponse {
        posts,
        page,
        pages: page_count(total),
        total,
    }))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetailResponse>, (StatusCode, String)> {
    let post = load_post(&state.db, &slug).await?;
    detail_document(&state.db, post)
        .await
        .map(Json)
        .map_err(internal)
}

/// The POST side of the detail page: classify, run the workflow, then
/// re-render the page with updated data whatever the validation outcome.
/// Invalid submissions are dropped without a user-visible error here, unlike
/// the unsubscribe flow.
pub async fn submit(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Form(payload): Form<CommentPayload>,
) -> Result<Json<PostDetailResponse>, (StatusCode, String)> {
    let post = load_post(&state.db, &slug).await?;

    let parent_comment_id = match classify_parent(payload.parent_comment_id.as_deref()) {
        ParentRef::Reply(id) => Some(id),
        ParentRef::TopLevel => None,
        ParentRef::Malformed => {
            warn!(
                "Malformed parent_comment_id {:?} on {}; treating as top-level comment",
                payload.parent_comment_id, slug
            );
            None
        }
    };

    let form = CommentForm {
        name: payload.name,
        email: payload.email,
        comment: payload.comment,
    };

    match state.workflow.submit(&post, &form, parent_comment_id).await {
        Ok(_) => {}
        Err(WorkflowError::Invalid(errors)) => {
            info!("Dropping invalid submission on {}: {:?}", slug, errors);
        }
        Err(WorkflowError::CommentNotFound(id)) => {
            warn!("Dropping reply to nonexistent comment {} on {}", id, slug);
        }
        Err(e) => return Err(internal(e)),
    }

    detail_document(&state.db, post)
        .await
        .map(Json)
        .map_err(internal)
}

// --- Helpers ---

async fn load_post(db: &Db, slug: &str) -> Result<Post, (StatusCode, String)> {
    db.get_post_by_slug(slug)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                "No post matches the given query.".to_string(),
            )
        })
}

async fn detail_document(db: &Db, post: Post) -> anyhow::Result<PostDetailResponse> {
    let top_level = db.list_post_comments(post.id).await?;
    let mut comments = Vec::with_capacity(top_level.len());
    for comment in top_level {
        let replies = db.list_replies(comment.id).await?;
        comments.push(CommentThread { comment, replies });
    }
    let categories = db.list_categories_for_post(post.id).await?;
    let comments_count = comments.len() as i64;
    Ok(PostDetailResponse {
        post,
        categories,
        reply_form: comments_count > 0,
        comments,
        comments_count,
    })
}

fn resolve_page(query: &PageQuery) -> i64 {
    query
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

fn page_count(total: i64) -> i64 {
    if total == 0 {
        1
    } else {
        (total + PER_PAGE - 1) / PER_PAGE
    }
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
