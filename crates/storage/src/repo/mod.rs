mod comments;
mod posts;
mod recipients;
