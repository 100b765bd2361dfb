//! One editing session for a topic's first post.
//!
//! [`prepare`] loads the topic and its draft and refuses stale drafts;
//! [`edit`] runs the editor with a [`Watcher`] alongside and reconciles the
//! final file with the forum once the editor exits.

mod watcher;

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::constants::POLL_INTERVAL;
use crate::editor::{Editor, EditorError};
use crate::forum::{DraftConflict, Forum, ForumError, Topic};
use crate::fs_utils::{self, Change, Workspace};
use crate::logging;
pub use watcher::{SaveKind, WatchHandle, WatchReport, Watcher};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Forum(#[from] ForumError),
    #[error(transparent)]
    DraftConflict(#[from] DraftConflict),
    #[error("cannot write temporary file")]
    TempFile(#[source] std::io::Error),
    #[error("cannot stat temporary file")]
    Stat(#[source] std::io::Error),
    #[error("cannot edit file {}", path.display())]
    Editor {
        path: PathBuf,
        #[source]
        source: EditorError,
    },
    #[error("cannot tell whether {} changed", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no content provided, aborting")]
    Aborted,
    #[error("file watcher stopped unexpectedly")]
    Watcher(#[source] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Start from the post even if a draft exists.
    pub ignore_draft: bool,
    /// Use an existing draft even if the post changed after it was started.
    pub force_draft: bool,
    /// Publish changes to the post while editing instead of only saving drafts.
    pub live_edit: bool,
    pub poll_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ignore_draft: false,
            force_draft: false,
            live_edit: false,
            poll_interval: POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The final content was saved to the post.
    Saved,
    /// Live edits already published the final content.
    AlreadySaved,
    NoChanges,
}

#[derive(Debug)]
pub struct SessionReport {
    pub outcome: Outcome,
    /// Topic state after the session, including whatever the watcher saved.
    pub topic: Topic,
    pub post_saves: usize,
    pub draft_saves: usize,
}

/// Load the topic and editing baseline, then edit it.
///
/// # Errors
///
/// See [`prepare`] and [`edit`].
pub async fn run(
    forum: &Forum,
    topic_id: u64,
    options: &SessionOptions,
    workspace: &Workspace,
    editor: &dyn Editor,
) -> Result<SessionReport, SessionError> {
    let topic = prepare(forum, topic_id, options).await?;
    edit(forum, topic, options, workspace, editor).await
}

/// Load a topic and, unless drafts are ignored, its pending draft.
///
/// # Errors
///
/// Returns an error if the topic cannot be loaded, the draft request fails
/// for any reason other than a missing draft, or the draft is stale and
/// `force_draft` is not set.
pub async fn prepare(
    forum: &Forum,
    topic_id: u64,
    options: &SessionOptions,
) -> Result<Topic, SessionError> {
    let mut topic = forum.load_topic(topic_id).await?;

    if options.ignore_draft {
        return Ok(topic);
    }

    match forum.load_draft(&mut topic).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    if let Err(conflict) = topic.check_draft() {
        if !options.force_draft {
            return Err(conflict.into());
        }
        warn!("Previous draft has problems: {conflict}");
        warn!("Using draft anyway due to --force-draft");
    }

    Ok(topic)
}

/// Let the operator edit the topic and save the result.
///
/// # Errors
///
/// Returns an error if the edit file cannot be prepared or read, the editor
/// fails, the operator empties the file, or the final save fails. In the
/// last case the edit file is first moved to the workspace's backup path.
pub async fn edit(
    forum: &Forum,
    topic: Topic,
    options: &SessionOptions,
    workspace: &Workspace,
    editor: &dyn Editor,
) -> Result<SessionReport, SessionError> {
    let path = workspace.temp_file();
    let initial = topic.original_text().to_string();

    fs_utils::write_temp_file(path, topic.edit_text())
        .await
        .map_err(SessionError::TempFile)?;

    let watcher = Watcher::new(forum.clone(), topic, path.to_path_buf(), options.live_edit)
        .await
        .map_err(SessionError::Stat)?
        .poll_interval(options.poll_interval);

    info!("Opening your preferred editor...");

    let handle = watcher.spawn();
    let edited = {
        let _quiet = logging::quiet();
        editor.edit(path).await
    };
    let report = handle.finish().await.map_err(SessionError::Watcher)?;
    edited.map_err(|source| SessionError::Editor {
        path: path.to_path_buf(),
        source,
    })?;

    let mut topic = report.topic;

    // Compare against the current original text: live edits may have moved it.
    let change = fs_utils::file_changed(path, topic.original_text())
        .await
        .map_err(|source| SessionError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let outcome = match change {
        Change::Empty => {
            fs_utils::discard(path).await;
            return Err(SessionError::Aborted);
        }
        Change::Unchanged => {
            fs_utils::discard(path).await;
            if options.live_edit && initial != topic.original_text() {
                info!("Changes already saved.");
                Outcome::AlreadySaved
            } else {
                info!("No changes to save.");
                Outcome::NoChanges
            }
        }
        Change::Modified(text) => {
            if let Err(e) = forum.save_topic(&mut topic, &text).await {
                fs_utils::keep_backup(workspace).await;
                return Err(e.into());
            }
            fs_utils::discard(path).await;
            Outcome::Saved
        }
    };

    Ok(SessionReport {
        outcome,
        topic,
        post_saves: report.post_saves,
        draft_saves: report.draft_saves,
    })
}
