//! Background task that pushes edits to the forum while the editor is open.
//!
//! The watcher owns the [`Topic`] for as long as it runs and hands it back
//! through its [`WatchReport`] once it has been told to stop and has finished
//! its last iteration.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

use crate::constants::POLL_INTERVAL;
use crate::forum::{Forum, ForumError, Topic};
use crate::fs_utils::{file_changed, modified_time, Change};

/// Where a detected change was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    /// Published directly to the post (live edit).
    Post,
    /// Kept as the topic's server-side draft.
    Draft,
}

/// What one polling iteration did.
#[derive(Debug)]
enum Tick {
    /// The file has not been touched since the last observation, or could not be inspected.
    Idle,
    /// The file was touched but its content matches the baseline.
    Unchanged { modified: SystemTime },
    Saved { kind: SaveKind, modified: SystemTime },
    /// The change could not be stored; it is retried on the next tick.
    Failed(ForumError),
}

/// State handed back by a stopped watcher.
#[derive(Debug)]
pub struct WatchReport {
    pub topic: Topic,
    pub post_saves: usize,
    pub draft_saves: usize,
}

pub struct Watcher {
    forum: Forum,
    topic: Topic,
    path: PathBuf,
    live_edit: bool,
    interval: Duration,
    last_modified: SystemTime,
    baseline: String,
}

impl Watcher {
    /// Prepare a watcher for the edit file at `path`, which must already hold
    /// the topic's edit text.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be inspected.
    pub async fn new(
        forum: Forum,
        topic: Topic,
        path: PathBuf,
        live_edit: bool,
    ) -> std::io::Result<Self> {
        let last_modified = modified_time(&path).await?;
        let baseline = topic.edit_text().to_string();
        Ok(Self {
            forum,
            topic,
            path,
            live_edit,
            interval: POLL_INTERVAL,
            last_modified,
            baseline,
        })
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start polling on a background task.
    #[must_use]
    pub fn spawn(self) -> WatchHandle {
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(self.run(stopped));
        WatchHandle { stop, task }
    }

    async fn run(mut self, mut stop: oneshot::Receiver<()>) -> WatchReport {
        let mut post_saves = 0;
        let mut draft_saves = 0;
        let mut last = false;

        while !last {
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                _ = &mut stop => last = true,
            }

            match self.tick().await {
                Tick::Idle => {}
                Tick::Unchanged { modified } => self.last_modified = modified,
                Tick::Saved { kind, modified } => {
                    match kind {
                        SaveKind::Post => post_saves += 1,
                        SaveKind::Draft => draft_saves += 1,
                    }
                    self.last_modified = modified;
                    self.baseline = self.topic.edit_text().to_string();
                }
                Tick::Failed(e) => {
                    debug!("Error saving draft: {:#}", anyhow::Error::from(e));
                }
            }
        }

        WatchReport {
            topic: self.topic,
            post_saves,
            draft_saves,
        }
    }

    async fn tick(&mut self) -> Tick {
        let modified = match modified_time(&self.path).await {
            Ok(modified) => modified,
            Err(e) => {
                debug!("Error stating file for draft: {e}");
                return Tick::Idle;
            }
        };
        if modified == self.last_modified {
            return Tick::Idle;
        }

        let text = match file_changed(&self.path, &self.baseline).await {
            Ok(Change::Modified(text)) => text,
            Ok(Change::Unchanged) => return Tick::Unchanged { modified },
            // Possibly caught mid-write; look again next time.
            Ok(Change::Empty) => return Tick::Idle,
            Err(e) => {
                debug!("Error reading file for draft: {e}");
                return Tick::Idle;
            }
        };

        if self.live_edit {
            match self.forum.save_topic(&mut self.topic, &text).await {
                Ok(()) => {
                    return Tick::Saved {
                        kind: SaveKind::Post,
                        modified,
                    }
                }
                // Keep the edit as a draft at least.
                Err(e) => debug!("Error saving live edit: {:#}", anyhow::Error::from(e)),
            }
        }

        match self.forum.save_draft(&mut self.topic, &text).await {
            Ok(()) => Tick::Saved {
                kind: SaveKind::Draft,
                modified,
            },
            Err(e) => Tick::Failed(e),
        }
    }
}

/// A running watcher.
pub struct WatchHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<WatchReport>,
}

impl WatchHandle {
    /// Tell the watcher to stop and wait until its final iteration, including
    /// any save already in flight, has completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher task panicked.
    pub async fn finish(self) -> Result<WatchReport, JoinError> {
        // The task may already be gone; the join below reports why.
        let _ = self.stop.send(());
        self.task.await
    }
}
