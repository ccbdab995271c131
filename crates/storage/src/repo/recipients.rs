use crate::{models::SqlRecipient, Db};
use domain::Recipient;

impl Db {
    /// Recipient set of one comment's thread, in attachment order.
    pub async fn list_recipients(&self, comment_id: i64) -> anyhow::Result<Vec<Recipient>> {
        let rows = sqlx::query_as::<_, SqlRecipient>(
            r#"
            SELECT r.id, r.email
            FROM recipients r
            JOIN comment_recipients cr ON cr.recipient_id = r.id
            WHERE cr.comment_id = ?
            ORDER BY r.id ASC
            "#,
        )
        .bind(comment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Unconditionally create a Recipient row and attach it to the comment.
    pub async fn attach_recipient(&self, comment_id: i64, email: &str) -> anyhow::Result<Recipient> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO recipients (email) VALUES (?)")
            .bind(email)
            .execute(&mut *tx)
            .await?;
        let recipient_id = result.last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO comment_recipients (comment_id, recipient_id)
            VALUES (?, ?)
            "#,
        )
        .bind(comment_id)
        .bind(recipient_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Recipient {
            id: recipient_id,
            email: email.to_string(),
        })
    }

    /// Attach a new Recipient only if no recipient with this exact address is
    /// already on the comment. The check and the insert share one transaction,
    /// so two concurrent replies cannot both add the same address.
    /// Returns whether a recipient was added.
    pub async fn attach_recipient_if_absent(
        &self,
        comment_id: i64,
        email: &str,
    ) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT r.id
            FROM recipients r
            JOIN comment_recipients cr ON cr.recipient_id = r.id
            WHERE cr.comment_id = ? AND r.email = ?
            LIMIT 1
            "#,
        )
        .bind(comment_id)
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            tx.commit().await?;
            return Ok(false);
        }

        let result = sqlx::query("INSERT INTO recipients (email) VALUES (?)")
            .bind(email)
            .execute(&mut *tx)
            .await?;
        let recipient_id = result.last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO comment_recipients (comment_id, recipient_id)
            VALUES (?, ?)
            "#,
        )
        .bind(comment_id)
        .bind(recipient_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Detach every recipient with this exact address from one comment's set.
    /// The Recipient rows themselves stay around (no orphan cleanup).
    /// Returns the number of detached attachments.
    pub async fn detach_recipient(&self, comment_id: i64, email: &str) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM comment_recipients
            WHERE comment_id = ?
              AND recipient_id IN (SELECT id FROM recipients WHERE email = ?)
            "#,
        )
        .bind(comment_id)
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn recipient_email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let row: Option<i64> = sqlx::query_scalar("SELECT id FROM recipients WHERE email = ? LIMIT 1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Delete every Recipient row with this address, across all threads.
    /// Attachments go with them via the FK cascade.
    pub async fn delete_recipients_with_email(&self, email: &str) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM recipients WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
