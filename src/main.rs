use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use forum_harvest::app::AppContext;
use forum_harvest::cli::{commands, Cli, Commands};
use forum_harvest::config::Config;
use forum_harvest::domain::EntityKind;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config, cli.db)?;

    match cli.command {
        Commands::Board { id, refresh } => {
            commands::resolve(&ctx, EntityKind::Board, id, refresh).await?;
        }
        Commands::Member { id, refresh } => {
            commands::resolve(&ctx, EntityKind::Member, id, refresh).await?;
        }
        Commands::Topic {
            id,
            refresh,
            messages,
        } => {
            commands::resolve(&ctx, EntityKind::Topic, id, refresh).await?;
            if messages {
                commands::list_topic_messages(&ctx, id)?;
            }
        }
        Commands::Messages { topic, page } => {
            commands::scrape_messages(&ctx, topic, page).await?;
        }
        Commands::CrawlTopics { start, end } => {
            commands::crawl_topics(&ctx, start, end).await?;
        }
        Commands::Show { kind, id } => {
            commands::show(&ctx, kind, id)?;
        }
        Commands::Stats => {
            commands::stats(&ctx)?;
        }
    }

    Ok(())
}
