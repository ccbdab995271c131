use thiserror::Error;

pub const MAX_NAME_LEN: usize = 60;

/// A single field-level validation failure, suitable for redisplaying a form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// The comment/reply submission form: all three fields are required.
#[derive(Debug, Clone)]
pub struct CommentForm {
    pub name: String,
    pub email: String,
    pub comment: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "This field is required."));
        } else if self.name.len() > MAX_NAME_LEN {
            errors.push(FieldError::new("name", "Name is too long (max 60 chars)."));
        }
        if self.email.trim().is_empty() {
            errors.push(FieldError::new("email", "This field is required."));
        } else if !is_valid_email(self.email.trim()) {
            errors.push(FieldError::new("email", "Enter a valid email address."));
        }
        if self.comment.trim().is_empty() {
            errors.push(FieldError::new("comment", "This field is required."));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// The contact form on the site root.
#[derive(Debug, Clone)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "This field is required."));
        }
        if self.email.trim().is_empty() {
            errors.push(FieldError::new("email", "This field is required."));
        } else if !is_valid_email(self.email.trim()) {
            errors.push(FieldError::new("email", "Enter a valid email address."));
        }
        if self.message.trim().is_empty() {
            errors.push(FieldError::new("message", "This field is required."));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// The unsubscribe form holds a single email field. A blank or malformed
/// address yields `None`, which callers surface as "re-render unchanged".
#[derive(Debug, Clone)]
pub struct UnsubscribeForm {
    pub email: String,
}

impl UnsubscribeForm {
    pub fn cleaned_email(&self) -> Option<&str> {
        let email = self.email.trim();
        if email.is_empty() || !is_valid_email(email) {
            return None;
        }
        Some(email)
    }
}

/// Minimal syntactic email check: one '@', a non-empty local part and a
/// dotted, non-empty domain, no whitespace anywhere.
pub fn is_valid_email(s: &str) -> bool {
    if s.chars().any(|c| c.is_whitespace()) {
        return false;
    }
    let Some((local, dom)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || dom.is_empty() || dom.contains('@') {
        return false;
    }
    if !dom.contains('.') || dom.starts_with('.') || dom.ends_with('.') {
        return false;
    }
    true
}

/// Classification of the optional `parent_comment_id` form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// No parent id submitted: a top-level comment.
    TopLevel,
    /// A well-formed id: a reply to that comment.
    Reply(i64),
    /// Submitted but not a positive integer. Callers fall back to the
    /// top-level path, loudly.
    Malformed,
}

pub fn classify_parent(raw: Option<&str>) -> ParentRef {
    let Some(raw) = raw else {
        return ParentRef::TopLevel;
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return ParentRef::TopLevel;
    }
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => ParentRef::Reply(id),
        _ => ParentRef::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, comment: &str) -> CommentForm {
        CommentForm {
            name: name.to_string(),
            email: email.to_string(),
            comment: comment.to_string(),
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(form("Ada", "ada@example.com", "hello").validate().is_ok());
    }

    #[test]
    fn blank_fields_are_reported_per_field() {
        let errors = form("", "ada@example.com", "").validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "comment"]);
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["plainaddress", "a@b", "a b@x.com", "a@@x.com", "a@.com", "a@x.com."] {
            assert!(
                form("Ada", bad, "hello").validate().is_err(),
                "accepted {bad:?}"
            );
        }
        assert!(form("Ada", "a@x.com", "hello").validate().is_ok());
    }

    #[test]
    fn unsubscribe_form_cleans_blank_and_malformed() {
        assert_eq!(
            UnsubscribeForm { email: "  ".into() }.cleaned_email(),
            None
        );
        assert_eq!(
            UnsubscribeForm {
                email: "not-an-email".into()
            }
            .cleaned_email(),
            None
        );
        assert_eq!(
            UnsubscribeForm {
                email: " A@x.com ".into()
            }
            .cleaned_email(),
            Some("A@x.com")
        );
    }

    #[test]
    fn parent_classification() {
        assert_eq!(classify_parent(None), ParentRef::TopLevel);
        assert_eq!(classify_parent(Some("")), ParentRef::TopLevel);
        assert_eq!(classify_parent(Some("42")), ParentRef::Reply(42));
        assert_eq!(classify_parent(Some(" 7 ")), ParentRef::Reply(7));
        assert_eq!(classify_parent(Some("abc")), ParentRef::Malformed);
        assert_eq!(classify_parent(Some("0")), ParentRef::Malformed);
        assert_eq!(classify_parent(Some("-3")), ParentRef::Malformed);
    }
}
