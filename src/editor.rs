use std::path::Path;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::constants::FALLBACK_EDITOR;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("cannot start {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },
    #[error("no editor configured")]
    Empty,
}

/// Something that lets the operator edit a file and returns once they are done.
#[async_trait]
pub trait Editor: Send + Sync {
    /// Edit the file at `path`, returning when the editing session ends.
    async fn edit(&self, path: &Path) -> Result<(), EditorError>;
}

/// An external editor program attached to the current terminal.
#[derive(Debug, Clone)]
pub struct CommandEditor {
    program: String,
    args: Vec<String>,
}

impl CommandEditor {
    /// Parse an editor command line such as `vim` or `code --wait`.
    #[must_use]
    pub fn new(command: &str) -> Self {
        let mut words = command.split_whitespace().map(ToString::to_string);
        let program = words.next().unwrap_or_default();
        Self {
            program,
            args: words.collect(),
        }
    }

    /// Use `$EDITOR`, or `sensible-editor` when it is unset or blank.
    #[must_use]
    pub fn from_env() -> Self {
        let command = std::env::var("EDITOR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_EDITOR.to_string());
        Self::new(&command)
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Editor for CommandEditor {
    async fn edit(&self, path: &Path) -> Result<(), EditorError> {
        if self.program.is_empty() {
            return Err(EditorError::Empty);
        }

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| EditorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(EditorError::Failed {
                program: self.program.clone(),
                status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_is_split() {
        let editor = CommandEditor::new("code --wait  --new-window");
        assert_eq!(editor.program(), "code");
        assert_eq!(editor.args, vec!["--wait", "--new-window"]);
    }

    #[tokio::test]
    async fn test_blank_command_is_rejected() {
        let editor = CommandEditor::new("   ");
        let err = editor.edit(Path::new("/tmp/x.md")).await.unwrap_err();
        assert!(matches!(err, EditorError::Empty));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_is_checked() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(CommandEditor::new("true").edit(file.path()).await.is_ok());
        assert!(matches!(
            CommandEditor::new("false").edit(file.path()).await,
            Err(EditorError::Failed { .. })
        ));
        assert!(matches!(
            CommandEditor::new("/nonexistent/editor").edit(file.path()).await,
            Err(EditorError::Spawn { .. })
        ));
    }
}
