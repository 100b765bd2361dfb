use regex::Regex;
use thiserror::Error;

/// `[base URL][/t][/slug]/<topic id>[/<post number>]`
static TOPIC_URL: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"^(https?://[^/]+)?(?:/t)?(?:/([a-z0-9-]+))?/([0-9]+)(?:/[0-9]+)?$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported topic URL: {0:?}")]
pub struct UnsupportedTopicUrl(pub String);

/// A topic reference resolved from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTarget {
    /// Forum base URL without trailing slash; empty when only an id was given.
    pub base_url: String,
    pub topic_id: u64,
}

/// Split a topic URL, path, or bare id into forum base URL and topic id.
///
/// # Errors
///
/// Returns an error if the input does not look like a Discourse topic reference.
pub fn parse_topic_url(input: &str) -> Result<TopicTarget, UnsupportedTopicUrl> {
    let unsupported = || UnsupportedTopicUrl(input.to_string());

    // A bare id carries no leading slash but is still accepted.
    let candidate = if input.bytes().all(|b| b.is_ascii_digit()) && !input.is_empty() {
        format!("/{input}")
    } else {
        input.to_string()
    };

    let captures = TOPIC_URL.captures(&candidate).ok_or_else(unsupported)?;
    let topic_id = captures[3].parse::<u64>().map_err(|_| unsupported())?;
    let base_url = captures
        .get(1)
        .map_or_else(String::new, |m| m.as_str().to_string());

    Ok(TopicTarget { base_url, topic_id })
}
