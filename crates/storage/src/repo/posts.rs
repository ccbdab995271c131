use crate::{
    models::{SqlCategory, SqlPost},
    Db,
};
use chrono::Utc;
use domain::{Category, Post, Slug};

impl Db {
    pub async fn insert_post(&self, title: &str, body: &str, slug: &Slug) -> anyhow::Result<Post> {
        let created_at = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            INSERT INTO posts (title, body, slug, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(title)
        .bind(body)
        .bind(slug.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Post {
            id: result.last_insert_rowid(),
            title: title.to_string(),
            body: body.to_string(),
            slug: slug.clone(),
            created_at,
        })
    }

    pub async fn get_post_by_slug(&self, slug: &str) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query_as::<_, SqlPost>(
            r#"
            SELECT id, title, body, slug, created_at
            FROM posts
            WHERE slug = ?
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    // 首页列表：从新到旧
    pub async fn list_posts(&self, limit: i64, offset: i64) -> anyhow::Result<(Vec<Post>, i64)> {
        let rows = sqlx::query_as::<_, SqlPost>(
            r#"
            SELECT id, title, body, slug, created_at
            FROM posts
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    pub async fn list_posts_by_category(
        &self,
        category: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<Post>, i64)> {
        let rows = sqlx::query_as::<_, SqlPost>(
            r#"
            SELECT p.id, p.title, p.body, p.slug, p.created_at
            FROM posts p
            JOIN post_categories pc ON pc.post_id = p.id
            JOIN categories c ON c.id = pc.category_id
            WHERE LOWER(c.name) = LOWER(?)
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM posts p
            JOIN post_categories pc ON pc.post_id = p.id
            JOIN categories c ON c.id = pc.category_id
            WHERE LOWER(c.name) = LOWER(?)
            "#,
        )
        .bind(category)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    pub async fn delete_post(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_category(&self, name: &str) -> anyhow::Result<Category> {
        let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(Category {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    pub async fn tag_post(&self, post_id: i64, category_id: i64) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO post_categories (post_id, category_id)
            VALUES (?, ?)
            ON CONFLICT(post_id, category_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(category_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_categories_for_post(&self, post_id: i64) -> anyhow::Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, SqlCategory>(
            r#"
            SELECT c.id, c.name
            FROM categories c
            JOIN post_categories pc ON pc.category_id = c.id
            WHERE pc.post_id = ?
            ORDER BY c.name ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
