use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A discussion thread whose first post is the document being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: u64,
    pub slug: String,
    pub title: String,
    pub category_id: Option<u64>,
    pub bumped_at: Option<DateTime<Utc>>,
    /// Server-side draft version counter, sent back with every draft save.
    pub draft_sequence: u64,
    /// The committed content of the topic's first post.
    pub post: Post,
    /// An in-progress edit held by the server, if any.
    pub draft: Option<Draft>,
}

impl Topic {
    /// The text the editor should start from: the draft's reply when a draft
    /// exists, otherwise the post's raw content.
    #[must_use]
    pub fn edit_text(&self) -> &str {
        match &self.draft {
            Some(draft) => draft.edit_text(),
            None => self.post.edit_text(),
        }
    }

    /// The committed text the current edit is based on.
    #[must_use]
    pub fn original_text(&self) -> &str {
        match &self.draft {
            Some(draft) => draft.original_text(),
            None => self.post.original_text(),
        }
    }

    /// Whether the loaded draft was started from content other than the post's
    /// current raw text.
    #[must_use]
    pub fn draft_is_stale(&self) -> bool {
        self.draft
            .as_ref()
            .is_some_and(|draft| draft.original_text() != self.post.original_text())
    }

    /// Refuse a draft that was started before the post last changed.
    ///
    /// # Errors
    ///
    /// Returns [`DraftConflict`] if the draft is stale.
    pub fn check_draft(&self) -> Result<(), DraftConflict> {
        if self.draft_is_stale() {
            return Err(DraftConflict);
        }
        Ok(())
    }

    /// Browser URL of the topic on the given forum.
    #[must_use]
    pub fn forum_url(&self, base_url: &str) -> String {
        format!("{base_url}/t/{}/{}", self.slug, self.id)
    }

    /// When the content was last touched. Search results carry no
    /// `updated_at`, so the bump time is the fallback.
    #[must_use]
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.post.updated_at.or(self.bumped_at)
    }

    #[must_use]
    pub fn blurb(&self) -> &str {
        &self.post.blurb
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.slug, self.id)
    }
}

/// A committed forum post as returned by the Discourse API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub id: u64,
    #[serde(deserialize_with = "nullable")]
    pub username: String,
    /// Rendered HTML.
    #[serde(deserialize_with = "nullable")]
    pub cooked: String,
    /// Markdown source, the server's last committed version.
    #[serde(deserialize_with = "nullable")]
    pub raw: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub topic_id: u64,
    #[serde(deserialize_with = "nullable")]
    pub blurb: String,
    #[serde(deserialize_with = "nullable")]
    pub draft_sequence: u64,
}

impl Post {
    #[must_use]
    pub fn edit_text(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn original_text(&self) -> &str {
        &self.raw
    }
}

/// A server-held edit in progress, keyed by `topic_<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(rename = "draft_key")]
    pub key: String,
    pub topic_id: u64,
    pub sequence: u64,
    #[serde(with = "double_encoded")]
    pub data: DraftData,
}

impl Draft {
    /// The draft key Discourse uses for edits of a topic's first post.
    #[must_use]
    pub fn key_for(topic_id: u64) -> String {
        format!("topic_{topic_id}")
    }

    #[must_use]
    pub fn edit_text(&self) -> &str {
        &self.data.reply
    }

    #[must_use]
    pub fn original_text(&self) -> &str {
        &self.data.original_text
    }
}

/// The composer state stored inside a draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DraftData {
    pub action: String,
    pub title: String,
    pub reply: String,
    pub original_text: String,
    pub composer_time: u64,
    pub typing_time: u64,
    pub post_id: u64,
    pub whisper: bool,
}

/// The loaded draft was started from content that has since changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("content was changed after existing draft started (see --ignore-draft and --force-draft)")]
pub struct DraftConflict;

/// Compact JSON that writes `<`, `>`, `&`, U+2028 and U+2029 inside strings
/// as `\uXXXX` escapes.
struct HtmlSafeFormatter;

impl serde_json::ser::Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W: ?Sized + std::io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> std::io::Result<()> {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escaped = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Render `value` as compact JSON with HTML-sensitive characters escaped.
///
/// # Errors
///
/// Fails if `value` cannot be represented as JSON.
pub(crate) fn to_html_safe_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, HtmlSafeFormatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Draft payloads travel as a JSON document encoded into a JSON string.
pub mod double_encoded {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{to_html_safe_json, DraftData};

    /// # Errors
    ///
    /// Fails if the payload cannot be rendered as JSON.
    pub fn serialize<S: Serializer>(data: &DraftData, serializer: S) -> Result<S::Ok, S::Error> {
        let inner = to_html_safe_json(data).map_err(S::Error::custom)?;
        let inner = String::from_utf8(inner).map_err(S::Error::custom)?;
        serializer.serialize_str(&inner)
    }

    /// # Errors
    ///
    /// Fails if the value is not a string holding a JSON draft payload.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DraftData, D::Error> {
        let inner = String::deserialize(deserializer)?;
        serde_json::from_str(&inner).map_err(D::Error::custom)
    }

    /// Like [`deserialize`], but a `null` value means there is no draft.
    ///
    /// # Errors
    ///
    /// Fails if a present value is not a string holding a JSON draft payload.
    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DraftData>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(inner) => serde_json::from_str(&inner)
                .map(Some)
                .map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
