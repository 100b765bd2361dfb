//! discedit library.
//!
//! Edits the first post of a Discourse topic in a local editor, saving
//! drafts (or live updates) while the editor is open and publishing the
//! final content when it closes.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod editor;
pub mod forum;
pub mod fs_utils;
pub mod logging;
pub mod session;
pub mod topic_url;
