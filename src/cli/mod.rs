pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::EntityKind;

#[derive(Parser)]
#[command(name = "forum-harvest")]
#[command(about = "A polite, resumable forum crawler", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/forum-harvest/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database, overriding the configured path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a board
    Board {
        id: i64,
        /// Scrape again even if already stored
        #[arg(long)]
        refresh: bool,
    },
    /// Resolve a member profile
    Member {
        id: i64,
        #[arg(long)]
        refresh: bool,
    },
    /// Resolve a topic
    Topic {
        id: i64,
        #[arg(long)]
        refresh: bool,
        /// Also print the topic's stored messages
        #[arg(long)]
        messages: bool,
    },
    /// Scrape one page of a topic's messages
    Messages {
        topic: i64,
        /// Page number, starting at 1
        page: u32,
    },
    /// Crawl a range of topic ids with their boards, messages and authors
    CrawlTopics {
        #[arg(long, default_value_t = 1)]
        start: i64,
        #[arg(long)]
        end: i64,
    },
    /// Print a stored record without touching the network
    Show {
        /// board, member or topic
        kind: EntityKind,
        id: i64,
    },
    /// Stored row counts
    Stats,
}
