use crate::prelude::*;
use clap::Parser;

mod error;
mod export;
mod gitlab;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Export all projects, issues, comments and users from a GitLab instance \
                  to the JSON format understood by JIRA's external system importer. \
                  The import document is printed to stdout; progress goes to stderr."
)]
pub struct App {
    #[clap(flatten)]
    pub export: export::ExportOptions,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Print more status information. Repeat for more detail (-vv).
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress the progress spinner and the summary table
    #[clap(short, long, env = "GL2JIRA_QUIET", global = true)]
    quiet: bool,
}

/// Warn by default, info with -v, debug with -vv. RUST_LOG takes precedence.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let app = App::parse();
    init_logging(app.global.verbose);

    export::run(app.export, app.global).await
}
