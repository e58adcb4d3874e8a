use crate::domain::Event;
use serde::Serialize;
use thiserror::Error;

/// Name of the single form field carrying the JSON envelope.
pub const FORM_FIELD: &str = "post";

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Batch is empty")]
    EmptyBatch,
}

/// One transmission: `{"item_id":..,"client_key":..,"posts":[..]}`.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub item_id: &'a str,
    pub client_key: &'a str,
    pub posts: &'a [Event],
}

impl<'a> Envelope<'a> {
    pub fn new(item_id: &'a str, client_key: &'a str, posts: &'a [Event]) -> Self {
        Self {
            item_id,
            client_key,
            posts,
        }
    }

    pub fn to_json(&self) -> Result<String, SerializationError> {
        if self.posts.is_empty() {
            return Err(SerializationError::EmptyBatch);
        }
        Ok(serde_json::to_string(self)?)
    }
}

/// Encodes `post=<envelope>` as `application/x-www-form-urlencoded`.
pub fn form_body(envelope_json: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair(FORM_FIELD, envelope_json)
        .finish()
}
