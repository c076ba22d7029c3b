use anyhow::Context;
use clap::Parser;
use gastown_town::cli::{commands, Cli, Commands, InspectTarget};
use gastown_town::infrastructure::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app_config =
        config::loader::load(cli.config.as_deref()).context("failed to load configuration")?;

    gastown_town::infrastructure::logging::init(&app_config.log_level, app_config.log_format);

    match cli.command {
        Commands::Serve => commands::handle_serve(app_config).await,
        Commands::Migrate => commands::handle_migrate(app_config).await,
        Commands::Inspect { what } => match what {
            InspectTarget::Bead { id } => commands::handle_inspect_bead(app_config, id, cli.json).await,
            InspectTarget::Agent { id } => commands::handle_inspect_agent(app_config, id, cli.json).await,
        },
    }
}
