use chrono::NaiveDateTime;
use domain::{Category, Comment, Post, Recipient, Slug};
use sqlx::FromRow;

#[derive(FromRow)]
pub struct SqlPost {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub slug: String,
    pub created_at: NaiveDateTime,
}

impl From<SqlPost> for Post {
    fn from(sql: SqlPost) -> Self {
        Post {
            id: sql.id,
            title: sql.title,
            body: sql.body,
            slug: Slug::new_unchecked(sql.slug),
            created_at: sql.created_at,
        }
    }
}

#[derive(FromRow)]
pub struct SqlComment {
    pub id: i64,
    pub post_id: Option<i64>,
    pub parent_comment_id: Option<i64>,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

impl From<SqlComment> for Comment {
    fn from(sql: SqlComment) -> Self {
        Comment {
            id: sql.id,
            post_id: sql.post_id,
            parent_comment_id: sql.parent_comment_id,
            name: sql.name,
            email: sql.email,
            body: sql.body,
            created_at: sql.created_at,
        }
    }
}

#[derive(FromRow)]
pub struct SqlCategory {
    pub id: i64,
    pub name: String,
}

impl From<SqlCategory> for Category {
    fn from(sql: SqlCategory) -> Self {
        Category {
            id: sql.id,
            name: sql.name,
        }
    }
}

#[derive(FromRow)]
pub struct SqlRecipient {
    pub id: i64,
    pub email: String,
}

impl From<SqlRecipient> for Recipient {
    fn from(sql: SqlRecipient) -> Self {
        Recipient {
            id: sql.id,
            email: sql.email,
        }
    }
}
