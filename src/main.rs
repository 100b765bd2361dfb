use anyhow::Result;
use clap::Parser;
use tracing::debug;

use discedit::cli::{normalize_args, Cli};
use discedit::config::Config;
use discedit::editor::CommandEditor;
use discedit::forum::Forum;
use discedit::fs_utils::Workspace;
use discedit::logging::init_tracing;
use discedit::session;
use discedit::topic_url::parse_topic_url;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.debug)?;

    let config_path = Config::default_path()?;
    let config = Config::load(&config_path)?;

    let target = parse_topic_url(&cli.topic)?;
    let (base_url, credentials) = config.forum(&target.base_url)?;

    let forum = Forum::new(base_url, credentials.clone())?;
    let workspace = Workspace::beside(config.path());
    let editor = CommandEditor::from_env();

    debug!(
        forum = %base_url,
        topic_id = target.topic_id,
        editor = editor.program(),
        "Starting edit session"
    );

    session::run(
        &forum,
        target.topic_id,
        &cli.session_options(),
        &workspace,
        &editor,
    )
    .await?;

    Ok(())
}
