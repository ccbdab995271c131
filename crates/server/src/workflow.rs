use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use domain::{Comment, CommentForm, FieldError, NewComment, Post};
use mailer::{Email, Mailer};
use storage::Db;
use thiserror::Error;
use tracing::info;

pub const COMMENT_SUBJECT: &str = "A new comment from Voila";
pub const REPLY_SUBJECT: &str = "A new reply from Voila";
pub const NOT_SUBSCRIBED_MESSAGE: &str = "The email you entered is not subscribed to any post.";

/// Passed in at construction; the engine has no ambient configuration.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub operator_email: String,
    pub public_host: String,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid submission")]
    Invalid(Vec<FieldError>),
    #[error("comment {0} not found")]
    CommentNotFound(i64),
    #[error("mail dispatch failed: {0}")]
    Mail(#[source] anyhow::Error),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    /// Blank/malformed email: re-render the form as-is, no message.
    Unchanged,
    /// The address was not on the recipient list.
    NotSubscribed,
    Removed,
}

/// The comment/reply/recipient notification workflow. One submission runs to
/// completion inline: validation, persistence, recipient maintenance and mail
/// dispatch, in that order, before the response is produced.
#[derive(Clone)]
pub struct CommentWorkflow {
    db: Db,
    mailer: Arc<dyn Mailer>,
    config: NotifyConfig,
}

impl CommentWorkflow {
    pub fn new(db: Db, mailer: Arc<dyn Mailer>, config: NotifyConfig) -> Self {
        Self { db, mailer, config }
    }

    /// Handle one validated-or-not submission against `post`. A present
    /// `parent_comment_id` makes it a reply to that comment, otherwise it is a
    /// top-level comment. Callers resolve malformed parent ids to `None`
    /// before getting here.
    pub async fn submit(
        &self,
        post: &Post,
        form: &CommentForm,
        parent_comment_id: Option<i64>,
    ) -> Result<Comment, WorkflowError> {
        form.validate().map_err(WorkflowError::Invalid)?;
        let name = form.name.trim().to_string();
        let email = form.email.trim().to_string();
        let body = form.comment.trim().to_string();

        match parent_comment_id {
            None => self.submit_comment(post, name, email, body).await,
            Some(parent_id) => self.submit_reply(post, parent_id, name, email, body).await,
        }
    }

    async fn submit_comment(
        &self,
        post: &Post,
        name: String,
        email: String,
        body: String,
    ) -> Result<Comment, WorkflowError> {
        let comment = self
            .db
            .insert_comment(&NewComment {
                post_id: Some(post.id),
                parent_comment_id: None,
                name,
                email: email.clone(),
                body,
                created_at: Utc::now().naive_utc(),
            })
            .await?;

        // 评论入库之后，作者成为该话题的第一个收件人
        self.db.attach_recipient(comment.id, &email).await?;

        // 每条新顶层评论都通知站长，发送失败会让整个请求失败
        let mail = Email {
            subject: COMMENT_SUBJECT.to_string(),
            text_body: format!("Someone commented on {}", post.url_path()),
            html_body: None,
            from: self.config.operator_email.clone(),
            reply_to: None,
            to: vec![self.config.operator_email.clone()],
        };
        self.mailer.send(&mail).await.map_err(WorkflowError::Mail)?;

        info!("New comment {} on post {}", comment.id, post.slug);
        Ok(comment)
    }

    async fn submit_reply(
        &self,
        post: &Post,
        parent_id: i64,
        name: String,
        email: String,
        body: String,
    ) -> Result<Comment, WorkflowError> {
        let parent = self
            .db
            .get_comment(parent_id)
            .await?
            .ok_or(WorkflowError::CommentNotFound(parent_id))?;

        // 通知集合基于加入作者之前的收件人列表，且不含作者本人
        let notify_set: BTreeSet<String> = self
            .db
            .list_recipients(parent.id)
            .await?
            .into_iter()
            .map(|r| r.email)
            .filter(|address| address != &email)
            .collect();

        if !notify_set.is_empty() {
            self.notify_recipients(&notify_set, post, &name, parent.id)
                .await?;
        }

        self.db.attach_recipient_if_absent(parent.id, &email).await?;

        let comment = self
            .db
            .insert_comment(&NewComment {
                post_id: None,
                parent_comment_id: Some(parent.id),
                name,
                email,
                body,
                created_at: Utc::now().naive_utc(),
            })
            .await?;

        info!("New reply {} to comment {}", comment.id, parent.id);
        Ok(comment)
    }

    async fn notify_recipients(
        &self,
        recipients: &BTreeSet<String>,
        post: &Post,
        author_name: &str,
        parent_comment_id: i64,
    ) -> Result<(), WorkflowError> {
        let html = self.reply_email_html(post, author_name, parent_comment_id);
        for address in recipients {
            let mail = Email {
                subject: REPLY_SUBJECT.to_string(),
                text_body: "Someone replied to your comment.".to_string(),
                html_body: Some(html.clone()),
                from: self.config.operator_email.clone(),
                reply_to: None,
                to: vec![address.clone()],
            };
            self.mailer.send(&mail).await.map_err(WorkflowError::Mail)?;
        }
        Ok(())
    }

    fn reply_email_html(&self, post: &Post, author_name: &str, parent_comment_id: i64) -> String {
        let post_url = format!(
            "{}{}#comment-{}",
            self.config.public_host,
            post.url_path(),
            parent_comment_id
        );
        let unsubscribe_url = format!(
            "{}/blog/unsubscribe/{}",
            self.config.public_host, parent_comment_id
        );
        format!(
            "<html><body>\
             <p><strong>{author}</strong> replied to your comment on \
             <a href=\"{post_url}\">{title}</a>.</p>\
             <p><a href=\"{unsubscribe_url}\">Unsubscribe from this thread</a></p>\
             </body></html>",
            author = escape_html(author_name),
            title = escape_html(&post.title),
        )
    }

    /// Remove `email` from one comment's recipient set. The comment is looked
    /// up first, so a bad id is `CommentNotFound` even when the email is
    /// blank. Address comparison is exact, not case-folded.
    pub async fn unsubscribe_from_comment(
        &self,
        comment_id: i64,
        email: Option<&str>,
    ) -> Result<UnsubscribeOutcome, WorkflowError> {
        let comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or(WorkflowError::CommentNotFound(comment_id))?;

        let Some(email) = email else {
            return Ok(UnsubscribeOutcome::Unchanged);
        };

        let removed = self.db.detach_recipient(comment.id, email).await?;
        if removed == 0 {
            Ok(UnsubscribeOutcome::NotSubscribed)
        } else {
            info!("Unsubscribed {} from comment {}", email, comment.id);
            Ok(UnsubscribeOutcome::Removed)
        }
    }

    /// Remove `email` from every thread by deleting its Recipient rows. The
    /// address is lowercased before comparison.
    pub async fn unsubscribe_from_all(
        &self,
        email: Option<&str>,
    ) -> Result<UnsubscribeOutcome, WorkflowError> {
        let Some(email) = email else {
            return Ok(UnsubscribeOutcome::Unchanged);
        };
        let email = email.to_lowercase();

        if !self.db.recipient_email_exists(&email).await? {
            return Ok(UnsubscribeOutcome::NotSubscribed);
        }
        let deleted = self.db.delete_recipients_with_email(&email).await?;
        info!("Unsubscribed {} everywhere ({} recipients)", email, deleted);
        Ok(UnsubscribeOutcome::Removed)
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use domain::Slug;
    use mailer::MemoryMailer;

    const OPERATOR: &str = "owner@voila.local";

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _email: &Email) -> anyhow::Result<()> {
            Err(anyhow!("smtp down"))
        }
    }

    fn notify_config() -> NotifyConfig {
        NotifyConfig {
            operator_email: OPERATOR.to_string(),
            public_host: "http://localhost:8000".to_string(),
        }
    }

    async fn setup() -> (Db, MemoryMailer, CommentWorkflow, Post) {
        let db = Db::new("sqlite::memory:").await.unwrap();
        let mailbox = MemoryMailer::new();
        let workflow =
            CommentWorkflow::new(db.clone(), Arc::new(mailbox.clone()), notify_config());
        let post = db
            .insert_post("First post", "body", &Slug::new("first-post").unwrap())
            .await
            .unwrap();
        (db, mailbox, workflow, post)
    }

    fn form(name: &str, email: &str, comment: &str) -> CommentForm {
        CommentForm {
            name: name.to_string(),
            email: email.to_string(),
            comment: comment.to_string(),
        }
    }

    fn recipient_emails(recipients: &[domain::Recipient]) -> Vec<&str> {
        recipients.iter().map(|r| r.email.as_str()).collect()
    }

    #[tokio::test]
    async fn top_level_comment_attaches_author_and_mails_operator() {
        let (db, mailbox, workflow, post) = setup().await;

        let comment = workflow
            .submit(&post, &form("Ada", "a@x.com", "nice post"), None)
            .await
            .unwrap();

        assert_eq!(comment.post_id, Some(post.id));
        assert_eq!(comment.parent_comment_id, None);

        let recipients = db.list_recipients(comment.id).await.unwrap();
        assert_eq!(recipient_emails(&recipients), vec!["a@x.com"]);

        let sent = mailbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, COMMENT_SUBJECT);
        assert_eq!(sent[0].to, vec![OPERATOR.to_string()]);
        assert!(sent[0].text_body.contains("/blog/first-post"));
        assert!(sent[0].html_body.is_none());
    }

    #[tokio::test]
    async fn reply_notifies_prior_recipients_and_adds_author() {
        let (db, mailbox, workflow, post) = setup().await;
        let parent = workflow
            .submit(&post, &form("Ada", "a@x.com", "nice post"), None)
            .await
            .unwrap();
        mailbox.clear();

        let reply = workflow
            .submit(&post, &form("Bob", "b@x.com", "me too"), Some(parent.id))
            .await
            .unwrap();

        assert_eq!(reply.post_id, None);
        assert_eq!(reply.parent_comment_id, Some(parent.id));
        assert_eq!(db.list_replies(parent.id).await.unwrap().len(), 1);

        let recipients = db.list_recipients(parent.id).await.unwrap();
        assert_eq!(recipient_emails(&recipients), vec!["a@x.com", "b@x.com"]);

        let sent = mailbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, REPLY_SUBJECT);
        assert_eq!(sent[0].to, vec!["a@x.com".to_string()]);
        assert_eq!(sent[0].text_body, "Someone replied to your comment.");
        let html = sent[0].html_body.as_deref().unwrap();
        assert!(html.contains(&format!("/blog/unsubscribe/{}", parent.id)));
        assert!(html.contains("First post"));
    }

    #[tokio::test]
    async fn repeat_reply_adds_no_recipient_and_skips_author() {
        let (db, mailbox, workflow, post) = setup().await;
        let parent = workflow
            .submit(&post, &form("Ada", "a@x.com", "nice post"), None)
            .await
            .unwrap();
        workflow
            .submit(&post, &form("Bob", "b@x.com", "me too"), Some(parent.id))
            .await
            .unwrap();
        mailbox.clear();

        workflow
            .submit(&post, &form("Bob", "b@x.com", "again"), Some(parent.id))
            .await
            .unwrap();

        // 收件人集合不变，通知只发给 a@x.com
        let recipients = db.list_recipients(parent.id).await.unwrap();
        assert_eq!(recipient_emails(&recipients), vec!["a@x.com", "b@x.com"]);
        assert_eq!(db.list_replies(parent.id).await.unwrap().len(), 2);

        let sent = mailbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["a@x.com".to_string()]);
    }

    #[tokio::test]
    async fn lone_self_reply_sends_nothing() {
        let (db, mailbox, workflow, post) = setup().await;
        let parent = workflow
            .submit(&post, &form("Ada", "a@x.com", "nice post"), None)
            .await
            .unwrap();
        mailbox.clear();

        workflow
            .submit(&post, &form("Ada", "a@x.com", "replying to myself"), Some(parent.id))
            .await
            .unwrap();

        assert!(mailbox.sent().is_empty());
        let recipients = db.list_recipients(parent.id).await.unwrap();
        assert_eq!(recipient_emails(&recipients), vec!["a@x.com"]);
    }

    #[tokio::test]
    async fn reply_to_missing_comment_is_not_found() {
        let (db, mailbox, workflow, post) = setup().await;

        let err = workflow
            .submit(&post, &form("Bob", "b@x.com", "hello?"), Some(999))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::CommentNotFound(999)));
        assert!(mailbox.sent().is_empty());
        assert_eq!(db.count_post_comments(post.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_submission_reports_field_errors() {
        let (db, mailbox, workflow, post) = setup().await;

        let err = workflow
            .submit(&post, &form("", "nope", "hi"), None)
            .await
            .unwrap_err();
        let WorkflowError::Invalid(errors) = err else {
            panic!("expected Invalid");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "email"]);
        assert!(mailbox.sent().is_empty());
        assert_eq!(db.count_post_comments(post.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mail_failure_is_fatal_but_comment_persists() {
        let db = Db::new("sqlite::memory:").await.unwrap();
        let workflow =
            CommentWorkflow::new(db.clone(), Arc::new(FailingMailer), notify_config());
        let post = db
            .insert_post("P", "body", &Slug::new("p").unwrap())
            .await
            .unwrap();

        let err = workflow
            .submit(&post, &form("Ada", "a@x.com", "hi"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Mail(_)));
        assert_eq!(db.count_post_comments(post.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_from_thread_is_exact_and_idempotent() {
        let (db, _mailbox, workflow, post) = setup().await;
        let parent = workflow
            .submit(&post, &form("Ada", "a@x.com", "nice post"), None)
            .await
            .unwrap();

        // 大小写不同：精确比较，视为未订阅
        let outcome = workflow
            .unsubscribe_from_comment(parent.id, Some("A@x.com"))
            .await
            .unwrap();
        assert_eq!(outcome, UnsubscribeOutcome::NotSubscribed);

        let outcome = workflow
            .unsubscribe_from_comment(parent.id, Some("ghost@x.com"))
            .await
            .unwrap();
        assert_eq!(outcome, UnsubscribeOutcome::NotSubscribed);
        let outcome = workflow
            .unsubscribe_from_comment(parent.id, Some("ghost@x.com"))
            .await
            .unwrap();
        assert_eq!(outcome, UnsubscribeOutcome::NotSubscribed);
        assert_eq!(db.list_recipients(parent.id).await.unwrap().len(), 1);

        let outcome = workflow
            .unsubscribe_from_comment(parent.id, Some("a@x.com"))
            .await
            .unwrap();
        assert_eq!(outcome, UnsubscribeOutcome::Removed);
        assert!(db.list_recipients(parent.id).await.unwrap().is_empty());

        let outcome = workflow
            .unsubscribe_from_comment(parent.id, None)
            .await
            .unwrap();
        assert_eq!(outcome, UnsubscribeOutcome::Unchanged);

        let err = workflow
            .unsubscribe_from_comment(999, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::CommentNotFound(999)));
    }

    #[tokio::test]
    async fn unsubscribe_from_all_lowercases_and_round_trips() {
        let (db, _mailbox, workflow, post) = setup().await;
        let parent = workflow
            .submit(&post, &form("Ada", "a@x.com", "nice post"), None)
            .await
            .unwrap();
        workflow
            .submit(&post, &form("Bob", "b@x.com", "me too"), Some(parent.id))
            .await
            .unwrap();

        let outcome = workflow
            .unsubscribe_from_all(Some("B@X.COM"))
            .await
            .unwrap();
        assert_eq!(outcome, UnsubscribeOutcome::Removed);
        let recipients = db.list_recipients(parent.id).await.unwrap();
        assert_eq!(recipient_emails(&recipients), vec!["a@x.com"]);

        let outcome = workflow
            .unsubscribe_from_all(Some("b@x.com"))
            .await
            .unwrap();
        assert_eq!(outcome, UnsubscribeOutcome::NotSubscribed);

        // 重新回复后，该地址恰好被重新加入一次
        workflow
            .submit(&post, &form("Bob", "b@x.com", "back again"), Some(parent.id))
            .await
            .unwrap();
        let recipients = db.list_recipients(parent.id).await.unwrap();
        assert_eq!(recipient_emails(&recipients), vec!["a@x.com", "b@x.com"]);
    }
}
