use std::ffi::OsString;

use clap::Parser;

use crate::session::SessionOptions;

/// Edit the first post of a Discourse topic with your preferred editor.
#[derive(Debug, Parser)]
#[command(name = "discedit", version)]
pub struct Cli {
    /// Forum topic URL, or a bare topic id when only one forum is configured
    #[arg(value_name = "TOPIC URL")]
    pub topic: String,

    /// Debug mode
    #[arg(long)]
    pub debug: bool,

    /// Ignore existing draft and start over
    #[arg(long)]
    pub ignore_draft: bool,

    /// Open draft even if it has conflicts
    #[arg(long)]
    pub force_draft: bool,

    /// Update post while content is being edited
    #[arg(long)]
    pub live_edit: bool,
}

/// Long flags that are also accepted with a single dash.
const SINGLE_DASH_FLAGS: &[&str] = &["debug", "ignore-draft", "force-draft", "live-edit"];

impl Cli {
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            ignore_draft: self.ignore_draft,
            force_draft: self.force_draft,
            live_edit: self.live_edit,
            ..SessionOptions::default()
        }
    }
}

/// Rewrite `-live-edit` style flags to `--live-edit` so clap accepts them.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut positional_only = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if positional_only {
                return arg;
            }
            if arg == "--" {
                positional_only = true;
                return arg;
            }
            let rewritten = arg
                .to_str()
                .and_then(|s| s.strip_prefix('-'))
                .filter(|name| SINGLE_DASH_FLAGS.contains(name))
                .map(|name| OsString::from(format!("--{name}")));
            rewritten.unwrap_or(arg)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(normalize_args(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["discedit", "https://forum.example.com/t/x/1"]).unwrap();
        assert_eq!(cli.topic, "https://forum.example.com/t/x/1");
        assert!(!cli.debug && !cli.ignore_draft && !cli.force_draft && !cli.live_edit);
    }

    #[test]
    fn test_single_and_double_dash_flags() {
        let cli = parse(&["discedit", "-live-edit", "--force-draft", "-debug", "12"]).unwrap();
        assert!(cli.live_edit);
        assert!(cli.force_draft);
        assert!(cli.debug);
        assert!(!cli.ignore_draft);

        let options = cli.session_options();
        assert!(options.live_edit && options.force_draft && !options.ignore_draft);
    }

    #[test]
    fn test_positional_after_separator_is_untouched() {
        let args = normalize_args(["discedit", "--", "-debug"]);
        assert_eq!(args[2], OsString::from("-debug"));
    }

    #[test]
    fn test_topic_is_required() {
        assert!(parse(&["discedit"]).is_err());
        assert!(parse(&["discedit", "a", "b"]).is_err());
    }
}
