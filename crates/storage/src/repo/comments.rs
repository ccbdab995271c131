use crate::{models::SqlComment, Db};
use domain::{Comment, NewComment};

impl Db {
    pub async fn insert_comment(&self, new: &NewComment) -> anyhow::Result<Comment> {
        // 不变量：必须且只能有一个父对象（文章或评论）
        if new.post_id.is_some() == new.parent_comment_id.is_some() {
            anyhow::bail!("comment must have exactly one of post_id / parent_comment_id");
        }

        let result = sqlx::query(
            r#"
            INSERT INTO comments (post_id, parent_comment_id, name, email, body, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.post_id)
        .bind(new.parent_comment_id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.body)
        .bind(new.created_at)
        .execute(&self.pool)
        .await?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            post_id: new.post_id,
            parent_comment_id: new.parent_comment_id,
            name: new.name.clone(),
            email: new.email.clone(),
            body: new.body.clone(),
            created_at: new.created_at,
        })
    }

    pub async fn get_comment(&self, comment_id: i64) -> anyhow::Result<Option<Comment>> {
        let row = sqlx::query_as::<_, SqlComment>(
            r#"
            SELECT id, post_id, parent_comment_id, name, email, body, created_at
            FROM comments
            WHERE id = ?
            "#,
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    // 某篇文章下的顶层评论，从旧到新
    pub async fn list_post_comments(&self, post_id: i64) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, SqlComment>(
            r#"
            SELECT id, post_id, parent_comment_id, name, email, body, created_at
            FROM comments
            WHERE post_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_replies(&self, parent_comment_id: i64) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, SqlComment>(
            r#"
            SELECT id, post_id, parent_comment_id, name, email, body, created_at
            FROM comments
            WHERE parent_comment_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(parent_comment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn count_post_comments(&self, post_id: i64) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn delete_comment(&self, comment_id: i64) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
