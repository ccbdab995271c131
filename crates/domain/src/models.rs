use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn new(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        if s.is_empty() {
            return Err("Slug cannot be empty.".to_string());
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(
                "Slug contains invalid characters. Use lowercase letters, digits and hyphens ('-')."
                    .to_string(),
            );
        }
        if s.len() > 64 {
            return Err("Slug is too long (max 64 chars).".to_string());
        }
        Ok(Self(s))
    }

    pub fn new_unchecked(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub slug: Slug,
    pub created_at: NaiveDateTime,
}

impl Post {
    /// Site-relative URL of this post's detail page.
    pub fn url_path(&self) -> String {
        format!("/blog/{}", self.slug)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// 一条评论要么属于文章（顶层评论），要么属于另一条评论（回复）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: Option<i64>,
    pub parent_comment_id: Option<i64>,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }
}

/// Payload for inserting a comment. Exactly one of `post_id` /
/// `parent_comment_id` must be set; storage rejects anything else.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Option<i64>,
    pub parent_comment_id: Option<i64>,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: i64,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_accepts_lowercase_digits_hyphens() {
        assert!(Slug::new("my-first-post-2").is_ok());
    }

    #[test]
    fn slug_rejects_uppercase_and_underscores() {
        assert!(Slug::new("My-Post").is_err());
        assert!(Slug::new("my_post").is_err());
        assert!(Slug::new("").is_err());
    }
}
