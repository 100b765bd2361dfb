use thiserror::Error;

/// Failures reported by the forum API client.
#[derive(Debug, Error)]
pub enum ForumError {
    /// The resource is missing or the credentials are not allowed to see it (401/404).
    #[error("resource not found: {path}")]
    NotFound { path: String },

    /// The post was changed by someone else since it was loaded (409).
    #[error("someone else edited the same content meanwhile")]
    Conflict,

    /// The request never produced a response (connection failure, timeout).
    #[error("cannot perform request on {path}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request got a response but its body could not be read.
    #[error("cannot read response (status {status})")]
    Body {
        status: u16,
        #[source]
        source: reqwest::Error,
    },

    /// Any other non-200 status, with the server's own message when it sent one.
    #[error("cannot perform request: {message}")]
    Server { message: String },

    /// The draft endpoint answered, but did not accept the draft.
    #[error("cannot update draft: {message:?}")]
    DraftRejected { message: String },

    #[error("cannot decode response from {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("internal error: cannot marshal request body")]
    Encode(#[source] serde_json::Error),

    #[error("internal error: topic {topic_id} has no posts")]
    MissingPost { topic_id: u64 },

    #[error("cannot create HTTP client")]
    Client(#[source] reqwest::Error),
}

impl ForumError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the failure came from the network rather than from the server's answer.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Body { .. })
    }
}
