use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{info, warn};

/// Local files used by one editing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    temp_file: PathBuf,
    backup_file: PathBuf,
}

impl Workspace {
    #[must_use]
    pub fn new(temp_file: PathBuf, backup_file: PathBuf) -> Self {
        Self {
            temp_file,
            backup_file,
        }
    }

    /// Place the session files next to the configuration file:
    /// `<config>.<pid>.md` while editing and `<config>.last.md` as backup.
    #[must_use]
    pub fn beside(config_path: &Path) -> Self {
        let base = config_path.as_os_str().to_string_lossy();
        Self {
            temp_file: PathBuf::from(format!("{base}.{}.md", std::process::id())),
            backup_file: PathBuf::from(format!("{base}.last.md")),
        }
    }

    #[must_use]
    pub fn temp_file(&self) -> &Path {
        &self.temp_file
    }

    #[must_use]
    pub fn backup_file(&self) -> &Path {
        &self.backup_file
    }
}

/// How the edited file compares to a baseline text, ignoring surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Nothing but whitespace is left.
    Empty,
    Unchanged,
    /// The trimmed new content.
    Modified(String),
}

impl Change {
    #[must_use]
    pub fn between(content: &str, baseline: &str) -> Self {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else if trimmed == baseline.trim() {
            Self::Unchanged
        } else {
            Self::Modified(trimmed.to_string())
        }
    }
}

/// Write the initial content of a new temporary edit file.
///
/// A partially written file is removed before the error is returned.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub async fn write_temp_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Err(e) = tokio::fs::write(path, content).await {
        let _ = tokio::fs::remove_file(path).await;
        return Err(e);
    }
    Ok(())
}

/// Compare the file at `path` with `baseline`.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub async fn file_changed(path: &Path, baseline: &str) -> std::io::Result<Change> {
    let data = tokio::fs::read(path).await?;
    Ok(Change::between(&String::from_utf8_lossy(&data), baseline))
}

/// Last modification time of the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be inspected.
pub async fn modified_time(path: &Path) -> std::io::Result<SystemTime> {
    tokio::fs::metadata(path).await?.modified()
}

/// Best-effort removal of a session file that is no longer needed.
pub async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), "Cannot remove temporary file: {e}");
        }
    }
}

/// Move the edit file to the backup location so the edit is not lost.
///
/// Failures are logged and otherwise ignored.
pub async fn keep_backup(workspace: &Workspace) -> bool {
    match tokio::fs::rename(&workspace.temp_file, &workspace.backup_file).await {
        Ok(()) => {
            info!("Saved backup: {}", workspace.backup_file.display());
            true
        }
        Err(e) => {
            warn!("Cannot save backup: {e}");
            false
        }
    }
}
