//! Shared constants used across the application.

use std::time::Duration;

/// How often the watcher checks the edited file for changes.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Timeout applied to every forum API request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// User agent sent with forum API requests.
pub const USER_AGENT: &str = concat!("discedit/", env!("CARGO_PKG_VERSION"));

/// Name of the configuration file inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".discedit";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "DISCEDIT_CONFIG";

/// Editor used when `$EDITOR` is not set.
pub const FALLBACK_EDITOR: &str = "sensible-editor";

/// Composer timing counters reported with every draft.
///
/// Discourse uses these for its anti-spam heuristics and rejects drafts
/// that claim no time was spent composing them.
pub const DRAFT_COMPOSER_TIME: u64 = 4321;
pub const DRAFT_TYPING_TIME: u64 = 1234;
