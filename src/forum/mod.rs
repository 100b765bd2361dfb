//! Client for the Discourse topic, post and draft APIs.
//!
//! Every request is authenticated with an `Api-Username` / `Api-Key` pair
//! and either succeeds once or reports a [`ForumError`]; nothing here
//! retries.

mod error;
pub mod models;

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Credentials;
use crate::constants::{
    DRAFT_COMPOSER_TIME, DRAFT_TYPING_TIME, REQUEST_TIMEOUT, USER_AGENT,
};
pub use error::ForumError;
pub use models::{Draft, DraftConflict, DraftData, Post, Topic};

use models::{nullable, to_html_safe_json};

/// Topic metadata plus its post stream, as returned by `/t/<id>.json`.
#[derive(Debug, Deserialize)]
struct TopicResponse {
    id: u64,
    #[serde(default, deserialize_with = "nullable")]
    slug: String,
    #[serde(default, deserialize_with = "nullable")]
    title: String,
    #[serde(default)]
    category_id: Option<u64>,
    #[serde(default)]
    bumped_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    draft_sequence: u64,
    #[serde(default)]
    post_stream: PostStream,
}

#[derive(Debug, Default, Deserialize)]
struct PostStream {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct DraftResponse {
    #[serde(default, deserialize_with = "models::double_encoded::deserialize_option")]
    draft: Option<DraftData>,
    #[serde(default, deserialize_with = "nullable")]
    draft_sequence: u64,
}

#[derive(Debug, Deserialize)]
struct DraftSaveResponse {
    #[serde(default, deserialize_with = "nullable")]
    success: String,
    #[serde(default, deserialize_with = "nullable")]
    draft_sequence: u64,
}

#[derive(Debug, Serialize)]
struct PostUpdate<'a> {
    post: PostUpdateFields<'a>,
}

#[derive(Debug, Serialize)]
struct PostUpdateFields<'a> {
    raw: &'a str,
    raw_old: &'a str,
}

#[derive(Debug, Deserialize)]
struct PostUpdateResponse {
    post: Post,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

/// Authenticated connection to one Discourse forum.
#[derive(Clone)]
pub struct Forum {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl Forum {
    /// Create a client for the forum at `base_url` (no trailing slash).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, ForumError> {
        Self::with_timeout(base_url, credentials, REQUEST_TIMEOUT)
    }

    /// Like [`Forum::new`], with a custom per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ForumError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ForumError::Client)?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            credentials,
        })
    }

    /// Fetch a topic together with its first post, in raw form.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::NotFound`] for missing or inaccessible topics and
    /// [`ForumError::MissingPost`] if the topic came back without posts.
    pub async fn load_topic(&self, topic_id: u64) -> Result<Topic, ForumError> {
        info!("Loading topic {topic_id}...");

        let path = format!("/t/{topic_id}.json?include_raw=true");
        let response: TopicResponse = self.get(&path).await?;

        let post = response
            .post_stream
            .posts
            .into_iter()
            .next()
            .ok_or(ForumError::MissingPost { topic_id })?;

        Ok(Topic {
            id: response.id,
            slug: response.slug,
            title: response.title,
            category_id: response.category_id,
            bumped_at: response.bumped_at,
            draft_sequence: response.draft_sequence,
            post,
            draft: None,
        })
    }

    /// Fetch the pending edit draft for `topic`, if the server holds one.
    ///
    /// The topic's draft sequence is refreshed either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn load_draft<'t>(&self, topic: &'t mut Topic) -> Result<Option<&'t Draft>, ForumError> {
        info!("Loading draft for topic {}...", topic.id);

        let key = Draft::key_for(topic.id);
        let path = format!("/draft.json?draft_key={key}");
        let response: DraftResponse = self.get(&path).await?;

        topic.draft_sequence = response.draft_sequence;
        if let Some(data) = response.draft {
            topic.draft = Some(Draft {
                key,
                topic_id: topic.id,
                sequence: response.draft_sequence,
                data,
            });
        }
        Ok(topic.draft.as_ref())
    }

    /// Replace the raw content of the topic's first post.
    ///
    /// The previously known text is sent as `raw_old` so the server can
    /// refuse the update if the post changed meanwhile. On success the topic
    /// adopts the returned post and drops its draft.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::Conflict`] if someone else edited the post.
    pub async fn save_topic(&self, topic: &mut Topic, text: &str) -> Result<(), ForumError> {
        info!("Saving topic {topic} ...");

        // Discourse strips surrounding whitespace, so keep the local copy in
        // the same shape as what the server stores.
        let raw = text.trim();
        let body = PostUpdate {
            post: PostUpdateFields {
                raw,
                raw_old: topic.original_text(),
            },
        };

        let path = format!("/posts/{}.json", topic.post.id);
        let response: PostUpdateResponse = self.send(Method::PUT, &path, &body).await?;

        info!("Saved {topic}.");

        topic.post = response.post;
        topic.post.raw = raw.to_string();
        topic.draft = None;
        topic.draft_sequence = topic.post.draft_sequence;
        Ok(())
    }

    /// Store `text` as the topic's server-side draft.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::DraftRejected`] if the server does not answer
    /// `"OK"`, or any request failure.
    pub async fn save_draft(&self, topic: &mut Topic, text: &str) -> Result<(), ForumError> {
        info!("Saving draft for {topic} ...");

        let draft = Draft {
            key: Draft::key_for(topic.id),
            topic_id: topic.id,
            sequence: topic.draft_sequence,
            data: DraftData {
                action: "edit".to_string(),
                title: topic.title.clone(),
                reply: text.to_string(),
                original_text: topic.original_text().to_string(),
                composer_time: DRAFT_COMPOSER_TIME,
                typing_time: DRAFT_TYPING_TIME,
                post_id: topic.post.id,
                whisper: false,
            },
        };

        let response: DraftSaveResponse = self.send(Method::POST, "/draft.json", &draft).await?;

        if response.success != "OK" {
            let message = if response.success.is_empty() {
                "unknown error".to_string()
            } else {
                response.success
            };
            return Err(ForumError::DraftRejected { message });
        }

        topic.draft = Some(draft);
        topic.draft_sequence = response.draft_sequence;

        info!("Saved draft for {topic}.");
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ForumError> {
        debug!("GET on {path}");
        let request = self.http.get(format!("{}{path}", self.base_url));
        self.execute(request, path).await
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ForumError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let data = to_html_safe_json(body).map_err(ForumError::Encode)?;
        debug!("{method} on {path} with {}", String::from_utf8_lossy(&data));

        let request = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(data);
        self.execute(request, path).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, ForumError> {
        let response = request
            .header("Api-Username", &self.credentials.username)
            .header("Api-Key", &self.credentials.key)
            .send()
            .await
            .map_err(|source| ForumError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        let data = response.bytes().await.map_err(|source| ForumError::Body {
            status: status.as_u16(),
            source,
        })?;

        debug!(
            "Got response {} with {}",
            status.as_u16(),
            String::from_utf8_lossy(&data)
        );

        match status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => {
                return Err(ForumError::NotFound {
                    path: path.to_string(),
                });
            }
            StatusCode::CONFLICT => return Err(ForumError::Conflict),
            _ => {
                let message = serde_json::from_slice::<ErrorResponse>(&data)
                    .ok()
                    .and_then(|body| body.errors.into_iter().next())
                    .unwrap_or_else(|| format!("got {} status", status.as_u16()));
                return Err(ForumError::Server { message });
            }
        }

        serde_json::from_slice(&data).map_err(|source| ForumError::Decode {
            path: path.to_string(),
            source,
        })
    }
}
