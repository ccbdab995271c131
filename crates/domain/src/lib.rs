mod forms;
mod models;

pub use forms::{
    classify_parent, CommentForm, ContactForm, FieldError, ParentRef, UnsubscribeForm,
};
pub use models::{Category, Comment, NewComment, Post, Recipient, Slug};
